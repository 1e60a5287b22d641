use std::fs::File;
use std::io::{Error, ErrorKind, Read};
use std::path::Path;

use super::SequentialAccess;

pub struct SequentialFileImpl {
    file: File,
    offset: u64,
}

impl SequentialFileImpl {
    // Open a file in read-only mode
    pub fn open(path: &Path) -> Result<Self, Error> {
        let file = File::open(path)?;
        Ok(Self { file, offset: 0 })
    }
}

impl SequentialAccess for SequentialFileImpl {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
        self.offset += filled as u64;
        Ok(filled)
    }

    fn remaining(&self) -> Result<u64, Error> {
        let size = self.file.metadata()?.len();
        Ok(size.saturating_sub(self.offset))
    }
}
