mod log_reader;
mod log_writer;
mod readable;
mod writeable;

use std::io::Error;
use std::path::{Path, PathBuf};

pub use log_reader::*;
pub use log_writer::*;
pub use readable::*;
pub use writeable::*;

/// Size of a log record header: payload length (4) + payload crc32 (4) +
/// header crc32 (4).
pub const RECORD_HEADER_SIZE: usize = 12;

// A file abstraction for reading sequentially through a file
pub trait SequentialAccess: Send {
    /// Reads until `buf` is full or the end of file is reached.
    /// Returns the number of bytes read.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error>;

    /// Number of bytes between the read position and the end of file.
    fn remaining(&self) -> Result<u64, Error>;
}

pub trait Writable: Sync + Send + 'static {
    // apend data to file
    fn append(&mut self, data: &[u8]) -> Result<(), Error>;
    fn flush(&mut self) -> Result<(), Error>;

    /// Attempts to sync all OS-internal metadata to disk.
    /// This function will attempt to ensure that all in-memory data reaches the
    /// filesystem before returning.
    fn sync(&mut self) -> Result<(), Error>;
}

pub enum Ext {
    Log,
}

pub fn path_of_file(work_dir: &Path, ext: Ext) -> PathBuf {
    match ext {
        Ext::Log => work_dir.join("LOG"),
    }
}
