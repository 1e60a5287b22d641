//! An embedded, single-writer multi-reader key-value store with
//! snapshot-isolated reads.
//!
//! Every write is stamped with a sequence number and kept as a new version in
//! an ordered memtable. Reads resolve the newest version at or below a read
//! sequence: the latest published one, or the one captured by a [`Snapshot`].

pub mod db;
pub mod error;
pub mod file;
pub mod mem_table;
pub mod sequence;
pub mod snapshot;
pub mod utils;

#[cfg(test)]
mod tests;

use std::path::PathBuf;

pub use db::Db;
pub use error::{Error, Result};
pub use snapshot::Snapshot;

#[derive(Clone, Debug)]
pub struct Options {
    /// Directory holding the write-ahead log.
    pub work_dir: PathBuf,
    pub create_if_missing: bool,
    pub error_if_exists: bool,
    /// fsync the log after every write.
    pub sync: bool,
}

impl Options {
    pub fn default_opt() -> Options {
        Options {
            work_dir: PathBuf::from("work_dir"),
            create_if_missing: true,
            error_if_exists: false,
            sync: false,
        }
    }

    pub fn work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn create_if_missing(mut self, create_if_missing: bool) -> Self {
        self.create_if_missing = create_if_missing;
        self
    }

    pub fn error_if_exists(mut self, error_if_exists: bool) -> Self {
        self.error_if_exists = error_if_exists;
        self
    }

    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::default_opt()
    }
}
