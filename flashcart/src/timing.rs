use core::ops::{Deref, DerefMut};

use flashcart_reg::pi::{Domain, TimingRegister, timing_register};

use crate::{Bus, DmaEngine, Error};

/// The electrical timing of one PI domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BusTiming {
    /// Cycles between the address and the first data strobe.
    pub latency: u8,
    /// Width of each read/write strobe.
    pub pulse_width: u8,
    /// Page size, as a power of two minus two.
    pub page_size: u8,
    /// Cycles between strobes.
    pub release: u8,
}

impl BusTiming {
    /// The timing every licensed cartridge ROM is accessed with.
    pub const ROM: BusTiming = BusTiming {
        latency: 0x40,
        pulse_width: 0x12,
        page_size: 0x07,
        release: 0x03,
    };

    /// The timing battery backed SRAM and FlashRAM need.
    pub const SRAM: BusTiming = BusTiming {
        latency: 0x05,
        pulse_width: 0x0C,
        page_size: 0x0D,
        release: 0x02,
    };

    fn registers(self) -> [(TimingRegister, u8); 4] {
        [
            (TimingRegister::Latency, self.latency),
            (TimingRegister::PulseWidth, self.pulse_width),
            (TimingRegister::PageSize, self.page_size),
            (TimingRegister::Release, self.release),
        ]
    }
}

/// Which timing a region of cartridge space must be accessed with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimingProfile {
    /// Leave both domains at [`BusTiming::ROM`].
    Rom,
    /// Switch domain 2 to [`BusTiming::SRAM`] for the duration of the access.
    Sram,
}

impl<B: Bus> DmaEngine<B> {
    /// Programs the timing registers of `domain`.
    pub fn set_timing(&mut self, domain: Domain, timing: BusTiming) {
        for (register, value) in timing.registers() {
            self.bus_mut()
                .pi_write(timing_register(domain, register), value as u32);
        }
    }

    /// Reads back the timing registers of `domain`.
    pub fn timing(&mut self, domain: Domain) -> BusTiming {
        let mut read = |register| self.bus_mut().pi_read(timing_register(domain, register)) as u8;

        BusTiming {
            latency: read(TimingRegister::Latency),
            pulse_width: read(TimingRegister::PulseWidth),
            page_size: read(TimingRegister::PageSize),
            release: read(TimingRegister::Release),
        }
    }

    /// Puts both domains back to [`BusTiming::ROM`].
    pub fn restore_rom_timing(&mut self) {
        self.set_timing(Domain::Dom1, BusTiming::ROM);
        self.set_timing(Domain::Dom2, BusTiming::ROM);
    }
}

/// Holds the PI in a non-default timing profile, and restores ROM timing on
/// both domains when dropped, whether the access succeeded or not.
pub(crate) struct TimingScope<'a, B: Bus> {
    dma: &'a mut DmaEngine<B>,
}

impl<'a, B: Bus> TimingScope<'a, B> {
    /// Waits for the bus to drain, then switches to `profile`.
    pub(crate) fn enter(dma: &'a mut DmaEngine<B>, profile: TimingProfile) -> Result<Self, Error> {
        dma.wait_idle()?;

        if profile == TimingProfile::Sram {
            dma.set_timing(Domain::Dom2, BusTiming::SRAM);
        }

        Ok(TimingScope { dma })
    }
}

impl<B: Bus> Deref for TimingScope<'_, B> {
    type Target = DmaEngine<B>;

    fn deref(&self) -> &Self::Target {
        self.dma
    }
}

impl<B: Bus> DerefMut for TimingScope<'_, B> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.dma
    }
}

impl<B: Bus> Drop for TimingScope<'_, B> {
    fn drop(&mut self) {
        // A wedged bus has already been reset by the engine, so the timing can
        // be rewritten regardless of whether the drain succeeds.
        let _ = self.dma.wait_idle();
        self.dma.restore_rom_timing();
    }
}
