#![no_std]
#![deny(clippy::all)]
#![warn(missing_docs)]

//! # flashcart
//! `flashcart` is a hardware abstraction layer for flashcarts plugged into the
//! cartridge port of a Nintendo 64. Every supported cart is driven through the
//! same [`Flashcart`] contract: initialise it, upload a ROM, upload a save and
//! tell it which kind of save memory to emulate.
//!
//! The crate never touches hardware directly. All register and DMA access
//! goes through an implementation of [`Bus`], and all file access goes through
//! an implementation of [`FileSystem`]. On a console, [`N64Bus`] drives the
//! real parallel interface.
//!
//! ```rust,ignore
//! use flashcart::{Flashcart, FlashcartManager, N64Bus, Timeout};
//!
//! let bus = unsafe { N64Bus::new() };
//! let mut cart = FlashcartManager::detect(bus, Timeout::unbounded())
//!     .expect("no supported flashcart found");
//!
//! cart.init()?;
//!
//! match cart.load_rom(&mut fs, "sd:/roms/game.z64", None) {
//!     Some(result) => result?,
//!     None => panic!("this cart cannot load roms"),
//! }
//! ```

extern crate alloc;

use core::fmt;

pub mod backend;
mod bus;
mod dispatch;
mod dma;
pub mod fs;
#[cfg(target_arch = "mips")]
mod hardware;
#[cfg(target_arch = "mips")]
mod memory_mapped;
mod register;
pub mod save;
mod timeout;
mod timing;

#[cfg(test)]
pub(crate) mod test_bus;
#[cfg(test)]
pub(crate) mod test_fs;

pub use backend::{
    DaisyDrive64, DeviceVariant, EverDrive64, Features, Flashcart, SectorTable, SixtyFourDrive,
};
pub use bus::Bus;
pub use dispatch::{CartKind, FlashcartManager};
pub use dma::{DmaEngine, ScratchBuffer};
pub use fs::{File, FileSystem, FsError, OpenMode};
#[cfg(target_arch = "mips")]
pub use hardware::N64Bus;
pub use register::RegisterPort;
pub use save::{AbstractSaveType, SaveType};
pub use timeout::Timeout;
pub use timing::{BusTiming, TimingProfile};

/// The error type for every fallible flashcart operation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The caller passed a raw save type value that does not name one.
    #[error("{0} is not a valid save type")]
    InvalidSaveType(u32),
    /// The cart cannot emulate the requested save type.
    #[error("save type {0:?} is not supported by this flashcart")]
    UnsupportedSaveType(AbstractSaveType),
    /// The filesystem reported an error.
    #[error("filesystem error: {0}")]
    Fs(#[from] FsError),
    /// The image does not fit in the memory it is being loaded into.
    #[error("an image of {size} bytes does not fit in {capacity} bytes")]
    TooLarge {
        /// The size of the image after any sector alignment.
        size: u64,
        /// The number of bytes available.
        capacity: u64,
    },
    /// The requested file offset lies beyond the end of the file.
    #[error("offset {offset} is past the end of a {size} byte file")]
    OffsetOutOfBounds {
        /// The requested offset.
        offset: u64,
        /// The size of the file.
        size: u64,
    },
    /// Fewer bytes were read from a file than its size promised.
    #[error("expected to transfer {expected} bytes but only {transferred} arrived")]
    ShortTransfer {
        /// The number of bytes the file claimed to contain.
        expected: u64,
        /// The number of bytes actually read.
        transferred: u64,
    },
    /// The parallel interface did not go idle in time.
    #[error("timed out waiting for the parallel interface to go idle")]
    BusTimeout,
    /// A flashcart command did not complete.
    #[error("flashcart command {0:#04x} did not complete")]
    CommandFailed(u8),
    /// The firmware on the cart is too old to be driven by this crate.
    #[error("firmware revision {found} is older than the minimum supported {minimum}")]
    Outdated {
        /// The revision reported by the hardware.
        found: u32,
        /// The oldest revision known to work.
        minimum: u32,
    },
}

impl Error {
    /// Collapses this error into the coarse [`Status`] reported to the menu.
    #[must_use]
    pub fn status(&self) -> Status {
        match self {
            Error::InvalidSaveType(_) | Error::UnsupportedSaveType(_) => Status::ArgumentError,
            Error::Fs(_)
            | Error::TooLarge { .. }
            | Error::OffsetOutOfBounds { .. }
            | Error::ShortTransfer { .. } => Status::LoadError,
            Error::BusTimeout | Error::CommandFailed(_) => Status::InternalError,
            Error::Outdated { .. } => Status::OutdatedHardware,
        }
    }
}

/// The outcome of a flashcart operation as seen by the menu.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Status {
    /// The operation succeeded.
    Ok,
    /// The caller passed something the cart does not understand.
    ArgumentError,
    /// A file could not be loaded.
    LoadError,
    /// The hardware did not respond as expected.
    InternalError,
    /// The cart's firmware needs to be updated.
    OutdatedHardware,
}

impl<T> From<&Result<T, Error>> for Status {
    fn from(result: &Result<T, Error>) -> Self {
        match result {
            Ok(_) => Status::Ok,
            Err(e) => e.status(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Status::Ok => "ok",
            Status::ArgumentError => "invalid argument",
            Status::LoadError => "could not load file",
            Status::InternalError => "internal flashcart error",
            Status::OutdatedHardware => "flashcart firmware is outdated",
        };

        f.write_str(message)
    }
}
