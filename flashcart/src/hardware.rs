use core::ffi::{c_int, c_ulong, c_void};
use core::sync::atomic::{Ordering, compiler_fence};

use flashcart_reg::pi;

use crate::bus::Bus;
use crate::memory_mapped::MemoryMapped;

// Provided by libdragon, which owns the joybus and the cache maintenance
// instructions.
unsafe extern "C" {
    fn data_cache_hit_writeback_invalidate(addr: *const c_void, length: c_ulong);
    fn eeprom_read(block: c_int, dest: *mut u8);
    fn eeprom_write(block: c_int, src: *const u8);
}

/// The parallel interface of a real Nintendo 64.
#[non_exhaustive]
pub struct N64Bus {}

impl N64Bus {
    /// # Safety
    /// Must only be called on a Nintendo 64 with libdragon linked in, and only
    /// once: two instances would race on the same DMA controller.
    #[must_use]
    pub unsafe fn new() -> Self {
        N64Bus {}
    }

    fn dram_address(dram: *const u8) -> u32 {
        flashcart_reg::physical(dram as usize as u32)
    }
}

impl Bus for N64Bus {
    fn pi_read(&mut self, register: u32) -> u32 {
        unsafe { MemoryMapped::register(register) }.get()
    }

    fn pi_write(&mut self, register: u32, value: u32) {
        unsafe { MemoryMapped::register(register) }.set(value);
    }

    fn io_read(&mut self, address: u32) -> u32 {
        unsafe { MemoryMapped::register(address) }.get()
    }

    fn io_write(&mut self, address: u32, value: u32) {
        unsafe { MemoryMapped::register(address) }.set(value);
    }

    unsafe fn start_dma_read(&mut self, cart_address: u32, dram: &mut [u8]) {
        self.pi_write(pi::DRAM_ADDR, Self::dram_address(dram.as_ptr()));
        self.pi_write(pi::CART_ADDR, cart_address);
        compiler_fence(Ordering::SeqCst);
        self.pi_write(pi::WR_LEN, dram.len() as u32 - 1);
        compiler_fence(Ordering::SeqCst);
    }

    unsafe fn start_dma_write(&mut self, cart_address: u32, dram: &[u8]) {
        self.pi_write(pi::DRAM_ADDR, Self::dram_address(dram.as_ptr()));
        self.pi_write(pi::CART_ADDR, cart_address);
        compiler_fence(Ordering::SeqCst);
        self.pi_write(pi::RD_LEN, dram.len() as u32 - 1);
        compiler_fence(Ordering::SeqCst);
    }

    fn cache_writeback_invalidate(&mut self, dram: &[u8]) {
        unsafe {
            data_cache_hit_writeback_invalidate(dram.as_ptr().cast(), dram.len() as c_ulong);
        }
        compiler_fence(Ordering::SeqCst);
    }

    fn eeprom_read_block(&mut self, block: usize, data: &mut [u8; 8]) {
        unsafe { eeprom_read(block as c_int, data.as_mut_ptr()) }
    }

    fn eeprom_write_block(&mut self, block: usize, data: &[u8; 8]) {
        unsafe { eeprom_write(block as c_int, data.as_ptr()) }
    }
}
