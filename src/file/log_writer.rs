use std::io::{Error, ErrorKind};

use bytes::BufMut;

use crate::utils::codec::calculate_checksum;

use super::{Writable, RECORD_HEADER_SIZE};

// +-------------+---------------------+--------------------+---------+
// | length (4B) | payload crc32 (4B)  | header crc32 (4B)  | payload |
// +-------------+---------------------+--------------------+---------+
// the header crc covers the length and the payload crc
pub struct Writer {
    file: Box<dyn Writable>,
    offset: u64,
}

impl Writer {
    pub fn new(file: Box<dyn Writable>) -> Self {
        Self { file, offset: 0 }
    }

    /// Resumes writing a log that already holds `offset` bytes.
    pub fn with_offset(file: Box<dyn Writable>, offset: u64) -> Self {
        Self { file, offset }
    }

    pub fn add_record(&mut self, data: &[u8]) -> Result<(), Error> {
        let len = u32::try_from(data.len())
            .map_err(|_| Error::new(ErrorKind::InvalidInput, "log record too large"))?;
        let mut buf = Vec::with_capacity(RECORD_HEADER_SIZE + data.len());
        buf.put_u32(len);
        buf.put_u32(calculate_checksum(data));
        let header_checksum = calculate_checksum(&buf);
        buf.put_u32(header_checksum);
        buf.put_slice(data);
        // header and payload go out in one write so a crash tears at most the tail
        self.file.append(&buf)?;
        self.offset += buf.len() as u64;
        Ok(())
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn sync(&mut self) -> Result<(), Error> {
        self.file.flush()?;
        self.file.sync()
    }
}
