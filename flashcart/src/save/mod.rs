//! Save memory emulation.
//!
//! ## Save memory types
//!
//! Official cartridges shipped with one of a handful of kinds of save memory:
//!
//! * EEPROM: a tiny serial chip of 4 or 16 kilobits, accessed 8 bytes at a
//!   time over the joybus rather than over the cartridge port.
//! * Battery-backed SRAM: 32 KiB of memory in PI domain 2. A few games use
//!   three banks of it, and some homebrew uses 128 KiB.
//! * FlashRAM: 128 KiB of flash in PI domain 2. A handful of Pokémon Stadium 2
//!   releases put it at a different address.
//!
//! A flashcart emulates one of these at a time, and must be told which one by
//! the menu before the game boots. [`AbstractSaveType`] is what the menu asks
//! for; each cart maps it onto the [`SaveType`] it actually emulates.
//!
//! ## Moving save data
//!
//! Depending on the cart, the emulated save memory is reached over the
//! joybus, over domain 2 with the slow SRAM timing, or as ordinary cartridge
//! SDRAM. Whichever it is, the PI is back at ROM timing on both domains once
//! a save transfer returns, even if it failed.

use crate::dma::DmaEngine;
use crate::timing::TimingProfile;
use crate::{Bus, Error};

mod config;
mod eeprom;
mod sram;

pub(crate) use config::configure;

/// The save memory a game expects, as requested by the menu.
///
/// The discriminants are the raw values the menu stores in its database.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AbstractSaveType {
    /// No save memory.
    None = 0,
    /// 4 kilobit EEPROM.
    Eeprom4K = 1,
    /// 16 kilobit EEPROM.
    Eeprom16K = 2,
    /// 32 KiB SRAM.
    Sram = 3,
    /// Three banks of 32 KiB SRAM.
    SramBanked = 4,
    /// 128 KiB SRAM.
    Sram128K = 5,
    /// 128 KiB FlashRAM.
    FlashRam = 6,
    /// 128 KiB FlashRAM at the Pokémon Stadium 2 address.
    FlashRamPkst2 = 7,
}

impl TryFrom<u32> for AbstractSaveType {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => AbstractSaveType::None,
            1 => AbstractSaveType::Eeprom4K,
            2 => AbstractSaveType::Eeprom16K,
            3 => AbstractSaveType::Sram,
            4 => AbstractSaveType::SramBanked,
            5 => AbstractSaveType::Sram128K,
            6 => AbstractSaveType::FlashRam,
            7 => AbstractSaveType::FlashRamPkst2,
            _ => return Err(Error::InvalidSaveType(value)),
        })
    }
}

/// The save memory a cart is currently emulating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SaveType {
    /// No save memory.
    #[default]
    None,
    /// 4 kilobit EEPROM.
    Eeprom4K,
    /// 16 kilobit EEPROM.
    Eeprom16K,
    /// 32 KiB SRAM.
    Sram,
    /// Three banks of 32 KiB SRAM.
    SramBanked,
    /// 128 KiB SRAM.
    Sram128K,
    /// 128 KiB FlashRAM.
    FlashRam,
    /// 128 KiB FlashRAM at the Pokémon Stadium 2 address.
    FlashRamPkst2,
}

impl SaveType {
    /// The number of bytes of save memory this type provides.
    #[must_use]
    pub const fn capacity(self) -> usize {
        match self {
            SaveType::None => 0,
            SaveType::Eeprom4K => 512,
            SaveType::Eeprom16K => 2048,
            SaveType::Sram => 32 * 1024,
            SaveType::SramBanked => 3 * 32 * 1024,
            SaveType::Sram128K | SaveType::FlashRam | SaveType::FlashRamPkst2 => 128 * 1024,
        }
    }

    /// Whether this type is reached over the joybus instead of the PI.
    #[must_use]
    pub const fn is_eeprom(self) -> bool {
        matches!(self, SaveType::Eeprom4K | SaveType::Eeprom16K)
    }
}

/// Where the bytes of an emulated save memory can be reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SaveWindow {
    /// The joybus EEPROM, `len` bytes long.
    Eeprom { len: usize },
    /// `len` bytes of cartridge space starting at `address`.
    Memory {
        address: u32,
        len: usize,
        profile: TimingProfile,
    },
}

impl SaveWindow {
    fn check_bounds(self, offset: usize, len: usize) -> Result<(), Error> {
        let capacity = match self {
            SaveWindow::Eeprom { len } | SaveWindow::Memory { len, .. } => len,
        };

        match offset.checked_add(len) {
            Some(end) if end <= capacity => Ok(()),
            _ => Err(Error::TooLarge {
                size: offset as u64 + len as u64,
                capacity: capacity as u64,
            }),
        }
    }
}

/// Reads `dest.len()` bytes of save memory starting at `offset`.
///
/// Whatever happens, the PI is left with ROM timing on both domains.
pub(crate) fn read_save_block<B: Bus>(
    dma: &mut DmaEngine<B>,
    window: SaveWindow,
    offset: usize,
    dest: &mut [u8],
) -> Result<(), Error> {
    window.check_bounds(offset, dest.len())?;

    match window {
        SaveWindow::Eeprom { .. } => {
            eeprom::read(dma.bus_mut(), offset, dest);
            Ok(())
        }
        SaveWindow::Memory {
            address, profile, ..
        } => sram::read(dma, profile, address + offset as u32, dest),
    }
}

/// Writes `src` to save memory starting at `offset`.
///
/// Whatever happens, the PI is left with ROM timing on both domains.
pub(crate) fn write_save_block<B: Bus>(
    dma: &mut DmaEngine<B>,
    window: SaveWindow,
    offset: usize,
    src: &[u8],
) -> Result<(), Error> {
    window.check_bounds(offset, src.len())?;

    match window {
        SaveWindow::Eeprom { .. } => {
            eeprom::write(dma.bus_mut(), offset, src);
            Ok(())
        }
        SaveWindow::Memory {
            address, profile, ..
        } => sram::write(dma, profile, address + offset as u32, src),
    }
}
