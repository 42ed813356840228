use alloc::vec;
use alloc::vec::Vec;
use core::ops::{Deref, DerefMut};

use flashcart_reg::pi;
use log::trace;

use crate::register::RegisterPort;
use crate::{Bus, Error, Timeout};

/// Required alignment of the RDRAM side of a transfer.
const DRAM_ALIGN: usize = 8;
/// Required alignment of the cartridge side of a transfer, and of its length.
const CART_ALIGN: u32 = 2;

/// An 8-byte aligned staging buffer in RDRAM.
///
/// Transfers whose host buffer, device address or length the PI cannot handle
/// directly are bounced through one of these. The memory is freed when the
/// buffer is dropped, so every exit path releases it.
pub struct ScratchBuffer {
    words: Vec<u64>,
    len: usize,
}

impl ScratchBuffer {
    /// Allocates a zeroed buffer of `len` bytes.
    #[must_use]
    pub fn new(len: usize) -> Self {
        ScratchBuffer {
            words: vec![0; len.div_ceil(DRAM_ALIGN)],
            len,
        }
    }
}

impl Deref for ScratchBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &bytemuck::cast_slice(&self.words)[..self.len]
    }
}

impl DerefMut for ScratchBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut(&mut self.words)[..self.len]
    }
}

fn is_direct(dram: *const u8, cart_address: u32, len: usize) -> bool {
    dram as usize % DRAM_ALIGN == 0
        && cart_address % CART_ALIGN == 0
        && len % CART_ALIGN as usize == 0
}

/// Moves data between RDRAM and cartridge space using the PI.
///
/// Every transfer waits for the previous one to finish before touching any
/// register, and waits for itself to finish before returning, so there is
/// never more than one transfer in flight and the bus is always idle between
/// calls.
pub struct DmaEngine<B: Bus> {
    bus: B,
    timeout: Timeout,
}

impl<B: Bus> DmaEngine<B> {
    /// Creates an engine driving `bus`, spinning according to `timeout`.
    pub fn new(bus: B, timeout: Timeout) -> Self {
        DmaEngine { bus, timeout }
    }

    /// The bus this engine drives.
    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// The bus this engine drives.
    ///
    /// Programming the PI through this reference bypasses the ordering the
    /// engine provides.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    /// Gives the bus back.
    pub fn into_bus(self) -> B {
        self.bus
    }

    /// The timeout every wait of this engine uses.
    pub fn timeout(&self) -> Timeout {
        self.timeout
    }

    /// Reads the PI status register.
    pub fn status(&mut self) -> pi::Status {
        pi::Status::from(self.bus.pi_read(pi::STATUS))
    }

    /// Spins until neither a DMA nor an IO access is in progress.
    ///
    /// If a bounded timeout runs out, the PI is reset so that no transfer is
    /// left writing into memory the caller is about to reuse.
    pub fn wait_idle(&mut self) -> Result<(), Error> {
        let timeout = self.timeout;
        let bus = &mut self.bus;

        let result = timeout.spin(|| pi::Status::from(bus.pi_read(pi::STATUS)).is_busy());

        if result.is_err() {
            self.bus.pi_write(
                pi::STATUS,
                pi::STATUS_RESET | pi::STATUS_CLEAR_INTERRUPT,
            );
        }

        Ok(result?)
    }

    /// Resets the DMA controller and acknowledges any pending PI interrupt.
    pub fn reset(&mut self) -> Result<(), Error> {
        self.wait_idle()?;
        self.bus.pi_write(
            pi::STATUS,
            pi::STATUS_RESET | pi::STATUS_CLEAR_INTERRUPT,
        );
        Ok(())
    }

    /// Borrows a register port for a register file starting at `base`.
    ///
    /// `fence` is an address in the cartridge ROM window which is read after
    /// every register write.
    pub fn register_port(&mut self, base: u32, fence: u32) -> RegisterPort<'_, B> {
        RegisterPort::new(&mut self.bus, base, fence)
    }

    fn read_direct(&mut self, cart_address: u32, dram: &mut [u8]) -> Result<(), Error> {
        self.wait_idle()?;
        trace!("dma {:#010x} -> rdram, {} bytes", cart_address, dram.len());

        self.bus.cache_writeback_invalidate(dram);
        // Safety: the wait below keeps `dram` borrowed until the transfer is
        // done, or the PI has been reset.
        unsafe { self.bus.start_dma_read(cart_address, dram) };
        self.wait_idle()
    }

    fn write_direct(&mut self, cart_address: u32, dram: &[u8]) -> Result<(), Error> {
        self.wait_idle()?;
        trace!("dma rdram -> {:#010x}, {} bytes", cart_address, dram.len());

        self.bus.cache_writeback_invalidate(dram);
        // Safety: as for `read_direct`.
        unsafe { self.bus.start_dma_write(cart_address, dram) };
        self.wait_idle()
    }

    /// Copies `dest.len()` bytes starting at `cart_address` into `dest`.
    ///
    /// The PI corrupts transfers into RDRAM that is not 8-byte aligned, from
    /// odd cartridge addresses, or of odd lengths. When any of those apply,
    /// the transfer is widened to cover an aligned region, bounced through a
    /// [`ScratchBuffer`], and only the requested bytes are copied out.
    pub fn read(&mut self, cart_address: u32, dest: &mut [u8]) -> Result<(), Error> {
        if dest.is_empty() {
            return Ok(());
        }

        if is_direct(dest.as_ptr(), cart_address, dest.len()) {
            return self.read_direct(cart_address, dest);
        }

        let misalignment = (cart_address % CART_ALIGN) as usize;
        let widened = dest.len() + misalignment;
        let mut scratch = ScratchBuffer::new(widened + widened % 2);

        self.read_direct(cart_address - misalignment as u32, &mut scratch)?;
        dest.copy_from_slice(&scratch[misalignment..misalignment + dest.len()]);

        Ok(())
    }

    /// Copies `src` to cartridge space starting at `cart_address`.
    ///
    /// Transfers the PI cannot perform directly are staged through a
    /// [`ScratchBuffer`]. When the cartridge side is odd, the neighbouring
    /// bytes are read back first so that they are written back unchanged.
    pub fn write(&mut self, cart_address: u32, src: &[u8]) -> Result<(), Error> {
        if src.is_empty() {
            return Ok(());
        }

        if is_direct(src.as_ptr(), cart_address, src.len()) {
            return self.write_direct(cart_address, src);
        }

        let misalignment = (cart_address % CART_ALIGN) as usize;
        let widened = src.len() + misalignment;
        let start = cart_address - misalignment as u32;
        let mut scratch = ScratchBuffer::new(widened + widened % 2);

        if scratch.len() != src.len() {
            self.read_direct(start, &mut scratch)?;
        }

        scratch[misalignment..misalignment + src.len()].copy_from_slice(src);
        self.write_direct(start, &scratch)
    }
}
