pub struct MemoryMapped<T> {
    address: *mut T,
}

impl<T> MemoryMapped<T> {
    /// # Safety
    /// `address` must point at a readable and writable location for the
    /// lifetime of the value, suitably aligned for `T`.
    pub const unsafe fn new(address: usize) -> Self {
        MemoryMapped {
            address: address as *mut T,
        }
    }

    pub fn get(&self) -> T {
        unsafe { self.address.read_volatile() }
    }

    pub fn set(&self, val: T) {
        if core::mem::size_of::<T>() != 0 {
            unsafe { self.address.write_volatile(val) }
        }
    }
}

impl MemoryMapped<u32> {
    /// Maps a physical register through the uncached KSEG1 segment.
    ///
    /// # Safety
    /// `physical` must be the address of a 32-bit register that exists on the
    /// running console.
    pub unsafe fn register(physical: u32) -> Self {
        unsafe { MemoryMapped::new(flashcart_reg::uncached(physical) as usize) }
    }
}
