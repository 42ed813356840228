extern crate std;

use std::boxed::Box;
use std::collections::{BTreeMap, BTreeSet};
use std::string::{String, ToString};
use std::vec::Vec;

use crate::fs::{File, FileSystem, FsError, OpenMode};

/// The byte at `offset` of every pattern-backed file.
pub fn pattern_byte(offset: u64) -> u8 {
    (offset ^ (offset >> 8) ^ (offset >> 16)) as u8
}

enum Contents {
    Bytes(Vec<u8>),
    /// A file of the given size whose contents are [`pattern_byte`].
    Pattern(u64),
}

impl Contents {
    fn len(&self) -> u64 {
        match self {
            Contents::Bytes(bytes) => bytes.len() as u64,
            Contents::Pattern(size) => *size,
        }
    }
}

struct Entry {
    contents: Contents,
    claimed_size: Option<u64>,
}

/// A test implementation of [`FileSystem`] which keeps its files in memory.
///
/// Large files can be backed by a pattern instead of real bytes, and every
/// operation can be made to fail.
pub struct TestFs {
    files: BTreeMap<String, Entry>,
    fail_open: BTreeSet<String>,
    read_failure_offset: Option<u64>,
    fail_close: bool,
    max_read: usize,
    open_files: usize,
    closes: usize,
}

impl TestFs {
    pub fn new() -> Self {
        Self {
            files: BTreeMap::new(),
            fail_open: BTreeSet::new(),
            read_failure_offset: None,
            fail_close: false,
            max_read: usize::MAX,
            open_files: 0,
            closes: 0,
        }
    }

    pub fn insert(&mut self, path: &str, data: Vec<u8>) {
        self.files.insert(
            path.to_string(),
            Entry {
                contents: Contents::Bytes(data),
                claimed_size: None,
            },
        );
    }

    pub fn insert_pattern(&mut self, path: &str, size: u64) {
        self.files.insert(
            path.to_string(),
            Entry {
                contents: Contents::Pattern(size),
                claimed_size: None,
            },
        );
    }

    pub fn contents(&self, path: &str) -> Option<&[u8]> {
        match &self.files.get(path)?.contents {
            Contents::Bytes(bytes) => Some(bytes),
            Contents::Pattern(_) => None,
        }
    }

    /// Makes the file report `size` from [`File::size`] without changing how
    /// many bytes can actually be read from it.
    pub fn claim_size(&mut self, path: &str, size: u64) {
        self.files
            .get_mut(path)
            .expect("no such file")
            .claimed_size = Some(size);
    }

    pub fn fail_open(&mut self, path: &str) {
        self.fail_open.insert(path.to_string());
    }

    pub fn fail_reads(&mut self) {
        self.read_failure_offset = Some(0);
    }

    /// Makes every read that starts at or past `offset` fail.
    pub fn fail_reads_from(&mut self, offset: u64) {
        self.read_failure_offset = Some(offset);
    }

    pub fn fail_closes(&mut self) {
        self.fail_close = true;
    }

    /// Limits how many bytes a single read returns.
    pub fn set_max_read(&mut self, max_read: usize) {
        self.max_read = max_read;
    }

    pub fn open_files(&self) -> usize {
        self.open_files
    }

    pub fn closes(&self) -> usize {
        self.closes
    }
}

impl Default for TestFs {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for TestFs {
    fn open(&mut self, path: &str, mode: OpenMode) -> Result<Box<dyn File + '_>, FsError> {
        if self.fail_open.contains(path) {
            return Err(FsError::Io);
        }

        match mode {
            OpenMode::Read if !self.files.contains_key(path) => return Err(FsError::NotFound),
            OpenMode::Read => {}
            OpenMode::Write => self.insert(path, Vec::new()),
        }

        self.open_files += 1;

        Ok(Box::new(TestFile {
            fs: self,
            path: path.to_string(),
            position: 0,
        }))
    }
}

struct TestFile<'a> {
    fs: &'a mut TestFs,
    path: String,
    position: u64,
}

impl TestFile<'_> {
    fn entry(&mut self) -> &mut Entry {
        self.fs
            .files
            .get_mut(&self.path)
            .expect("open file was removed")
    }
}

impl File for TestFile<'_> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        if self.fs.read_failure_offset.is_some_and(|offset| self.position >= offset) {
            return Err(FsError::Io);
        }

        let max_read = self.fs.max_read;
        let position = self.position;
        let contents = &self.entry().contents;

        let remaining = contents.len().saturating_sub(position);
        let len = buf.len().min(max_read).min(remaining as usize);
        if len == 0 {
            return Ok(0);
        }

        match contents {
            Contents::Bytes(bytes) => {
                let start = position as usize;
                buf[..len].copy_from_slice(&bytes[start..start + len]);
            }
            Contents::Pattern(_) => {
                for (i, byte) in buf[..len].iter_mut().enumerate() {
                    *byte = pattern_byte(position + i as u64);
                }
            }
        }

        self.position += len as u64;
        Ok(len)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, FsError> {
        let position = self.position as usize;

        match &mut self.entry().contents {
            Contents::Bytes(bytes) => {
                if bytes.len() < position + buf.len() {
                    bytes.resize(position + buf.len(), 0);
                }
                bytes[position..position + buf.len()].copy_from_slice(buf);
            }
            Contents::Pattern(_) => return Err(FsError::Io),
        }

        self.position += buf.len() as u64;
        Ok(buf.len())
    }

    fn seek(&mut self, offset: u64) -> Result<(), FsError> {
        self.position = offset;
        Ok(())
    }

    fn size(&self) -> u64 {
        let entry = &self.fs.files[&self.path];
        entry.claimed_size.unwrap_or(entry.contents.len())
    }

    fn close(mut self: Box<Self>) -> Result<(), FsError> {
        self.fs.open_files -= 1;
        self.fs.closes += 1;

        if self.fs.fail_close {
            Err(FsError::Io)
        } else {
            Ok(())
        }
    }
}
