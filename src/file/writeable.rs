use std::fs::File;
use std::io::{Error, Write};
use std::path::Path;

use super::Writable;

pub struct WritableFileImpl {
    file: File,
}

impl Writable for WritableFileImpl {
    fn append(&mut self, data: &[u8]) -> Result<(), Error> {
        self.file.write_all(data)
    }

    fn flush(&mut self) -> Result<(), Error> {
        self.file.flush()
    }

    fn sync(&mut self) -> Result<(), Error> {
        self.file.sync_data()
    }
}

impl WritableFileImpl {
    /// Opens `path` for appending, creating it if needed.
    pub fn open(path: &Path) -> Result<Self, Error> {
        let file = File::options().append(true).create(true).open(path)?;
        Ok(Self { file })
    }
}

#[cfg(test)]
mod file_test {

    use super::*;

    #[test]
    fn write_file_test() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.txt");
        let mut f = WritableFileImpl::open(&path).unwrap();
        f.append(b"hello ").unwrap();
        f.append(b"world!\n").unwrap();
        f.append(b"hello rust").unwrap();
        f.flush().unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 23);

        // reopening appends rather than truncates
        let mut f = WritableFileImpl::open(&path).unwrap();
        f.append(b"!").unwrap();
        f.sync().unwrap();

        let data = std::fs::read(&path).unwrap();
        assert_eq!(&data[..3], b"hel");
        assert_eq!(data.len(), 24);
    }
}
