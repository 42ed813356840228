//! SRAM and FlashRAM saves, and anything else that lives in cartridge space.
//!
//! Battery backed memory in domain 2 only works with the slow SRAM timing, so
//! the PI is switched over for the duration of the transfer and reset before
//! it starts. The timing is put back by the scope guard even if the transfer
//! fails.

use crate::timing::{TimingProfile, TimingScope};
use crate::{Bus, DmaEngine, Error};

pub(super) fn read<B: Bus>(
    dma: &mut DmaEngine<B>,
    profile: TimingProfile,
    address: u32,
    buf: &mut [u8],
) -> Result<(), Error> {
    let mut scope = TimingScope::enter(dma, profile)?;

    scope.reset()?;
    scope.read(address, buf)
}

pub(super) fn write<B: Bus>(
    dma: &mut DmaEngine<B>,
    profile: TimingProfile,
    address: u32,
    buf: &[u8],
) -> Result<(), Error> {
    let mut scope = TimingScope::enter(dma, profile)?;

    scope.reset()?;
    scope.write(address, buf)?;

    // the engine flushed before starting, the save memory wants it after too
    scope.bus_mut().cache_writeback_invalidate(buf);
    scope.wait_idle()
}
