//! The flashcart contract, and the carts that implement it.
//!
//! Every cart implements [`Flashcart`]. Only [`Flashcart::init`],
//! [`Flashcart::deinit`] and [`Flashcart::has_feature`] are mandatory; the
//! remaining operations return `None` when a cart does not support them. A
//! `None` is an answer to "can this cart do that?", and is never an error.

use bitflags::bitflags;
use log::{debug, warn};

use crate::dma::{DmaEngine, ScratchBuffer};
use crate::fs::{self, FileSystem, OpenFile, OpenMode};
use crate::save::{self, AbstractSaveType, SaveWindow};
use crate::{Bus, Error};

mod daisydrive;
mod ed64;
mod sixtyfourdrive;

pub use daisydrive::DaisyDrive64;
pub use ed64::EverDrive64;
pub use sixtyfourdrive::SixtyFourDrive;

/// Streamed loads move this many bytes per DMA transfer.
pub const CHUNK_SIZE: usize = 128 * 1024;

/// The save write-back sector table: the SD card sectors a cart flushes save
/// memory to while a game is running.
pub type SectorTable = [u8; 1024];

/// A callback told how far through a load the cart is, from 0 to 1.
pub type Progress<'a> = Option<&'a mut dyn FnMut(f32)>;

bitflags! {
    /// Optional hardware a cart may provide.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Features: u32 {
        /// 64DD disk drive emulation.
        const DD64 = 1 << 0;
        /// A battery-backed real time clock.
        const RTC = 1 << 1;
        /// A USB port the console can talk to.
        const USB = 1 << 2;
    }
}

/// Which hardware revision of a cart is plugged in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceVariant {
    /// Revision A.
    A,
    /// Revision B.
    B,
    /// A revision this crate does not know, or a cart without revisions.
    #[default]
    Unknown,
}

/// The operations the menu can ask of a flashcart.
pub trait Flashcart {
    /// Probes the hardware and puts it into a known state: no save write-back,
    /// no save memory and a write protected ROM.
    fn init(&mut self) -> Result<(), Error>;

    /// Prepares the cart for the game to boot.
    fn deinit(&mut self) -> Result<(), Error>;

    /// Whether the cart has `feature`. Asking does not touch the hardware.
    fn has_feature(&self, feature: Features) -> bool;

    /// Uploads the ROM image at `path`.
    ///
    /// Nothing is transferred if the image does not fit.
    fn load_rom(
        &mut self,
        _fs: &mut dyn FileSystem,
        _path: &str,
        _progress: Progress<'_>,
    ) -> Option<Result<(), Error>> {
        None
    }

    /// Uploads the file at `path`, starting `file_offset` bytes in, to
    /// `rom_offset` bytes into the ROM.
    fn load_file(
        &mut self,
        _fs: &mut dyn FileSystem,
        _path: &str,
        _rom_offset: u32,
        _file_offset: u64,
    ) -> Option<Result<(), Error>> {
        None
    }

    /// Uploads the save image at `path` into the emulated save memory.
    fn load_save(&mut self, _fs: &mut dyn FileSystem, _path: &str) -> Option<Result<(), Error>> {
        None
    }

    /// Writes the emulated save memory out to `path`.
    fn store_save(&mut self, _fs: &mut dyn FileSystem, _path: &str) -> Option<Result<(), Error>> {
        None
    }

    /// Uploads a 64DD IPL image.
    fn load_64dd_ipl(
        &mut self,
        _fs: &mut dyn FileSystem,
        _path: &str,
        _progress: Progress<'_>,
    ) -> Option<Result<(), Error>> {
        None
    }

    /// Inserts a 64DD disk image.
    fn load_64dd_disk(&mut self, _fs: &mut dyn FileSystem, _path: &str) -> Option<Result<(), Error>> {
        None
    }

    /// Selects the save memory to emulate.
    ///
    /// If the cart cannot emulate `save_type`, the current save memory is left
    /// as it was.
    fn set_save_type(&mut self, _save_type: AbstractSaveType) -> Option<Result<(), Error>> {
        None
    }

    /// Arms the cart to flush save memory to `sectors` on its own.
    fn set_save_writeback(&mut self, _sectors: &SectorTable) -> Option<Result<(), Error>> {
        None
    }
}

/// Copies `len` bytes of `file` to cartridge space at `address`, a chunk at a
/// time, zero filling anything past the end of the file.
///
/// Returns how many bytes actually came from the file.
pub(crate) fn stream_to_cart<B: Bus>(
    dma: &mut DmaEngine<B>,
    file: &mut OpenFile<'_>,
    address: u32,
    len: u64,
    mut progress: Progress<'_>,
) -> Result<u64, Error> {
    let mut chunk = ScratchBuffer::new(len.min(CHUNK_SIZE as u64) as usize);
    let mut done = 0;
    let mut read = 0;

    while done < len {
        let chunk_len = (len - done).min(CHUNK_SIZE as u64) as usize;
        let buf = &mut chunk[..chunk_len];

        let filled = file.read_fill(buf)?;
        buf[filled..].fill(0);
        dma.write(address + done as u32, buf)?;

        done += chunk_len as u64;
        read += filled as u64;

        if let Some(progress) = progress.as_deref_mut() {
            progress(done as f32 / len as f32);
        }
    }

    if len == 0 {
        if let Some(progress) = progress.as_deref_mut() {
            progress(1.0);
        }
    }

    Ok(read)
}

/// Uploads a whole ROM image to `address`, returning its sector aligned size.
pub(crate) fn load_rom_image<B: Bus>(
    dma: &mut DmaEngine<B>,
    fs: &mut dyn FileSystem,
    path: &str,
    address: u32,
    capacity: u64,
    progress: Progress<'_>,
) -> Result<u64, Error> {
    let mut file = OpenFile::open(fs, path, OpenMode::Read)?;
    let size = file.size();
    let aligned = fs::aligned_size(size);

    if aligned > capacity {
        warn!("{path} is {aligned} bytes but only {capacity} fit");
        return Err(Error::TooLarge {
            size: aligned,
            capacity,
        });
    }

    debug!("loading {size} byte rom {path}");
    let read = stream_to_cart(dma, &mut file, address, aligned, progress)?;

    if read != size {
        return Err(Error::ShortTransfer {
            expected: size,
            transferred: read,
        });
    }

    file.close()?;
    Ok(aligned)
}

/// Uploads the tail of a file, from `file_offset` on, to `address`.
pub(crate) fn load_file_region<B: Bus>(
    dma: &mut DmaEngine<B>,
    fs: &mut dyn FileSystem,
    path: &str,
    address: u32,
    rom_offset: u32,
    file_offset: u64,
    capacity: u64,
) -> Result<(), Error> {
    let mut file = OpenFile::open(fs, path, OpenMode::Read)?;
    let size = file.size();

    if file_offset > size {
        return Err(Error::OffsetOutOfBounds {
            offset: file_offset,
            size,
        });
    }

    let len = size - file_offset;
    let end = len + u64::from(rom_offset);
    if end > capacity {
        warn!("{path} would end {end} bytes into a {capacity} byte rom");
        return Err(Error::TooLarge {
            size: end,
            capacity,
        });
    }

    file.seek(file_offset)?;
    let read = stream_to_cart(dma, &mut file, address + rom_offset, len, None)?;

    if read != len {
        return Err(Error::ShortTransfer {
            expected: len,
            transferred: read,
        });
    }

    file.close()
}

fn window_len(window: SaveWindow) -> usize {
    match window {
        SaveWindow::Eeprom { len } | SaveWindow::Memory { len, .. } => len,
    }
}

/// Uploads a save image into `window`.
pub(crate) fn load_save_image<B: Bus>(
    dma: &mut DmaEngine<B>,
    fs: &mut dyn FileSystem,
    path: &str,
    window: SaveWindow,
) -> Result<(), Error> {
    let mut file = OpenFile::open(fs, path, OpenMode::Read)?;
    let size = file.size();
    let capacity = window_len(window) as u64;

    if size > capacity {
        warn!("save {path} is {size} bytes but only {capacity} fit");
        return Err(Error::TooLarge { size, capacity });
    }

    let mut buffer = ScratchBuffer::new(size as usize);
    let read = file.read_fill(&mut buffer)?;

    if read as u64 != size {
        return Err(Error::ShortTransfer {
            expected: size,
            transferred: read as u64,
        });
    }

    save::write_save_block(dma, window, 0, &buffer)?;
    file.close()
}

/// Reads the whole of `window` and writes it to a new file at `path`.
pub(crate) fn store_save_image<B: Bus>(
    dma: &mut DmaEngine<B>,
    fs: &mut dyn FileSystem,
    path: &str,
    window: SaveWindow,
) -> Result<(), Error> {
    let mut buffer = ScratchBuffer::new(window_len(window));
    save::read_save_block(dma, window, 0, &mut buffer)?;

    let mut file = OpenFile::open(fs, path, OpenMode::Write)?;
    let written = file.write_all(&buffer)?;

    if written != buffer.len() {
        return Err(Error::ShortTransfer {
            expected: buffer.len() as u64,
            transferred: written as u64,
        });
    }

    file.close()
}
