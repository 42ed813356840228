//! The filesystem the cart loads images from.
//!
//! The crate does not implement a filesystem. The host provides one through
//! [`FileSystem`], typically FAT on the cart's SD card.

use alloc::boxed::Box;

use log::warn;

use crate::Error;

/// Size of a filesystem sector. File sizes are rounded up to a whole number
/// of these before being compared against a cart's capacity.
pub const SECTOR_SIZE: u64 = 512;

/// How a file should be opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenMode {
    /// Open an existing file for reading.
    Read,
    /// Create the file, or truncate it if it exists, and open it for writing.
    Write,
}

/// The ways a filesystem operation can fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum FsError {
    /// No file exists at the given path.
    #[error("file not found")]
    NotFound,
    /// The storage device reported an error.
    #[error("i/o error")]
    Io,
}

/// An open file.
pub trait File {
    /// Reads up to `buf.len()` bytes, returning how many were read. Zero means
    /// the end of the file has been reached.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError>;

    /// Writes up to `buf.len()` bytes, returning how many were written.
    fn write(&mut self, buf: &[u8]) -> Result<usize, FsError>;

    /// Moves the cursor to `offset` bytes from the start of the file.
    fn seek(&mut self, offset: u64) -> Result<(), FsError>;

    /// The size of the file in bytes.
    fn size(&self) -> u64;

    /// Flushes and closes the file.
    fn close(self: Box<Self>) -> Result<(), FsError>;
}

/// Something files can be opened from.
pub trait FileSystem {
    /// Opens the file at `path`.
    fn open(&mut self, path: &str, mode: OpenMode) -> Result<Box<dyn File + '_>, FsError>;
}

/// Removes the `sd:/` storage prefix the menu puts in front of paths, keeping
/// the leading slash.
///
/// ```
/// # use flashcart::fs::strip_sd_prefix;
/// assert_eq!(strip_sd_prefix("sd:/roms/game.z64"), "/roms/game.z64");
/// assert_eq!(strip_sd_prefix("/roms/game.z64"), "/roms/game.z64");
/// ```
#[must_use]
pub fn strip_sd_prefix(path: &str) -> &str {
    const PREFIX: &str = "sd:/";

    match path.find(PREFIX) {
        Some(index) => &path[index + PREFIX.len() - 1..],
        None => path,
    }
}

/// Rounds a file size up to a whole number of sectors.
#[must_use]
pub const fn aligned_size(size: u64) -> u64 {
    size.div_ceil(SECTOR_SIZE) * SECTOR_SIZE
}

/// A file which is closed when it goes out of scope.
///
/// Call [`OpenFile::close`] to find out whether closing succeeded. Dropping
/// the file closes it and discards any error, which is what every early return
/// wants.
pub(crate) struct OpenFile<'a> {
    file: Option<Box<dyn File + 'a>>,
}

impl<'a> OpenFile<'a> {
    pub(crate) fn open(
        fs: &'a mut dyn FileSystem,
        path: &str,
        mode: OpenMode,
    ) -> Result<Self, Error> {
        let path = strip_sd_prefix(path);

        match fs.open(path, mode) {
            Ok(file) => Ok(OpenFile { file: Some(file) }),
            Err(e) => {
                warn!("could not open {path}: {e}");
                Err(e.into())
            }
        }
    }

    fn file(&mut self) -> &mut (dyn File + 'a) {
        match &mut self.file {
            Some(file) => file.as_mut(),
            None => unreachable!("file used after being closed"),
        }
    }

    pub(crate) fn size(&mut self) -> u64 {
        self.file().size()
    }

    pub(crate) fn seek(&mut self, offset: u64) -> Result<(), Error> {
        Ok(self.file().seek(offset)?)
    }

    /// Reads until `buf` is full or the file ends, returning the number of
    /// bytes read.
    pub(crate) fn read_fill(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut filled = 0;

        while filled < buf.len() {
            match self.file().read(&mut buf[filled..])? {
                0 => break,
                n => filled += n,
            }
        }

        Ok(filled)
    }

    /// Writes the whole of `buf`, returning the number of bytes the file
    /// accepted. A file that stops accepting bytes ends the write early.
    pub(crate) fn write_all(&mut self, buf: &[u8]) -> Result<usize, Error> {
        let mut written = 0;

        while written < buf.len() {
            match self.file().write(&buf[written..])? {
                0 => break,
                n => written += n,
            }
        }

        Ok(written)
    }

    pub(crate) fn close(mut self) -> Result<(), Error> {
        match self.file.take() {
            Some(file) => Ok(file.close()?),
            None => Ok(()),
        }
    }
}

impl Drop for OpenFile<'_> {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.close();
        }
    }
}
