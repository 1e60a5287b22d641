use std::io::{Error, ErrorKind};

use bytes::Buf;

use crate::utils::codec::verify_checksum;

use super::{SequentialAccess, RECORD_HEADER_SIZE};

pub struct Reader {
    file: Box<dyn SequentialAccess>,
    offset: u64,
    torn: bool,
}

impl Reader {
    pub fn new(file: Box<dyn SequentialAccess>) -> Self {
        Self {
            file,
            offset: 0,
            torn: false,
        }
    }

    /// Reads the next record.
    ///
    /// Returns `Ok(None)` at the end of the log, including when the last
    /// record was only partially written: a short header, or an intact header
    /// whose payload runs past the end of file. A damaged header or payload
    /// fails with `ErrorKind::InvalidData`.
    pub fn read_record(&mut self) -> Result<Option<Vec<u8>>, Error> {
        let mut header = [0_u8; RECORD_HEADER_SIZE];
        let n = self.file.read(&mut header)?;
        if n == 0 {
            return Ok(None);
        }
        if n < RECORD_HEADER_SIZE {
            self.torn = true;
            return Ok(None);
        }
        let (fields, mut header_checksum) = header.split_at(RECORD_HEADER_SIZE - 4);
        verify_checksum(fields, header_checksum.get_u32())
            .map_err(|err| self.corruption("header", err))?;
        let mut fields = fields;
        let len = fields.get_u32() as usize;
        let checksum = fields.get_u32();

        if len as u64 > self.file.remaining()? {
            self.torn = true;
            return Ok(None);
        }
        let mut data = vec![0_u8; len];
        if self.file.read(&mut data)? < len {
            self.torn = true;
            return Ok(None);
        }
        verify_checksum(&data, checksum).map_err(|err| self.corruption("payload", err))?;
        self.offset += (RECORD_HEADER_SIZE + len) as u64;
        Ok(Some(data))
    }

    fn corruption(&self, part: &str, err: impl std::fmt::Display) -> Error {
        Error::new(
            ErrorKind::InvalidData,
            format!("log record {} at offset {}: {}", part, self.offset, err),
        )
    }

    /// Byte offset just past the last complete record.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Whether reading stopped at a partially written record.
    pub fn is_torn(&self) -> bool {
        self.torn
    }
}
