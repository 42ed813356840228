/// Raw access to the console's parallel interface and the cartridge port.
///
/// This is the lowest layer of the crate. Everything above it is written in
/// terms of these primitives so that it can be driven by real hardware
/// ([`N64Bus`](crate::N64Bus)) or by a simulation.
///
/// Implementations must not add fences, waits or retries of their own: the
/// ordering protocol is enforced by [`DmaEngine`](crate::DmaEngine) and
/// [`RegisterPort`](crate::RegisterPort).
pub trait Bus {
    /// Reads one of the PI's own registers, addressed physically.
    fn pi_read(&mut self, register: u32) -> u32;

    /// Writes one of the PI's own registers, addressed physically.
    fn pi_write(&mut self, register: u32, value: u32);

    /// Performs a single 32-bit read of cartridge address space.
    fn io_read(&mut self, address: u32) -> u32;

    /// Performs a single 32-bit write to cartridge address space.
    fn io_write(&mut self, address: u32, value: u32);

    /// Programs a cartridge -> RDRAM transfer into `dram` and starts it.
    ///
    /// The DRAM address and cartridge address must be programmed before the
    /// length register, which is what starts the transfer.
    ///
    /// # Safety
    /// The transfer completes asynchronously. `dram` must not be read, written
    /// or freed until the PI reports that it is idle again. `dram` must be
    /// 8-byte aligned, `cart_address` 2-byte aligned and the length even.
    unsafe fn start_dma_read(&mut self, cart_address: u32, dram: &mut [u8]);

    /// Programs an RDRAM -> cartridge transfer from `dram` and starts it.
    ///
    /// # Safety
    /// As for [`Bus::start_dma_read`], `dram` must outlive the transfer.
    unsafe fn start_dma_write(&mut self, cart_address: u32, dram: &[u8]);

    /// Writes back and invalidates any cache lines covering `dram` so that the
    /// PI and the CPU agree on its contents.
    fn cache_writeback_invalidate(&mut self, dram: &[u8]);

    /// Reads one 8 byte block of cartridge EEPROM over the joybus.
    fn eeprom_read_block(&mut self, block: usize, data: &mut [u8; 8]);

    /// Writes one 8 byte block of cartridge EEPROM over the joybus.
    fn eeprom_write_block(&mut self, block: usize, data: &[u8; 8]);
}

impl<B: Bus + ?Sized> Bus for &mut B {
    fn pi_read(&mut self, register: u32) -> u32 {
        (**self).pi_read(register)
    }

    fn pi_write(&mut self, register: u32, value: u32) {
        (**self).pi_write(register, value)
    }

    fn io_read(&mut self, address: u32) -> u32 {
        (**self).io_read(address)
    }

    fn io_write(&mut self, address: u32, value: u32) {
        (**self).io_write(address, value)
    }

    unsafe fn start_dma_read(&mut self, cart_address: u32, dram: &mut [u8]) {
        unsafe { (**self).start_dma_read(cart_address, dram) }
    }

    unsafe fn start_dma_write(&mut self, cart_address: u32, dram: &[u8]) {
        unsafe { (**self).start_dma_write(cart_address, dram) }
    }

    fn cache_writeback_invalidate(&mut self, dram: &[u8]) {
        (**self).cache_writeback_invalidate(dram)
    }

    fn eeprom_read_block(&mut self, block: usize, data: &mut [u8; 8]) {
        (**self).eeprom_read_block(block, data)
    }

    fn eeprom_write_block(&mut self, block: usize, data: &[u8; 8]) {
        (**self).eeprom_write_block(block, data)
    }
}
