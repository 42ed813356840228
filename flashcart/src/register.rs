use log::trace;

use crate::Bus;

/// Accesses the memory mapped register file of a flashcart.
///
/// Cart registers sit behind the PI, and the PI does not order single word
/// accesses against each other. Every access therefore does a dummy read of
/// the register file's base first, and every write is followed by a dummy
/// read of the cartridge ROM window, which forces the write out before
/// anything else happens on the bus.
///
/// A port does not wait for the PI to go idle. Use
/// [`DmaEngine::wait_idle`](crate::DmaEngine::wait_idle) before borrowing one
/// if a transfer might still be running.
pub struct RegisterPort<'a, B: Bus> {
    bus: &'a mut B,
    base: u32,
    fence: u32,
}

impl<'a, B: Bus> RegisterPort<'a, B> {
    pub(crate) fn new(bus: &'a mut B, base: u32, fence: u32) -> Self {
        RegisterPort { bus, base, fence }
    }

    /// Reads the register at the physical `address`.
    pub fn read(&mut self, address: u32) -> u32 {
        self.bus.io_read(self.base);
        self.bus.io_read(address)
    }

    /// Writes `value` to the register at the physical `address`.
    pub fn write(&mut self, address: u32, value: u32) {
        trace!("register {:#010x} <- {:#010x}", address, value);

        self.bus.io_read(self.base);
        self.bus.io_write(address, value);
        self.bus.io_read(self.fence);
    }
}
