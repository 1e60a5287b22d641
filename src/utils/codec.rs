use bytes::BufMut;

/// The error type of codec operations.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid varint: {0:?}")]
    InvalidVarint(Vec<u8>),
    #[error("truncated input: need {need} bytes, have {have}")]
    Truncated { need: usize, have: usize },
    #[error("invalid value type: {0}")]
    InvalidType(u8),
    #[error("checksum mismatch: expected {expected:#010x}, actual {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },
}

pub fn varintu32_length(v: u32) -> u32 {
    let mut v = v;
    let b: u32 = 128;
    let mut len = 0;
    while v >= b {
        v >>= 7;
        len += 1;
    }
    len + 1
}

pub fn encode_varintu32(buf: &mut Vec<u8>, v: u32) -> u32 {
    let mut v = v;
    let b: u32 = 128;
    let mut len = 0;
    while v >= b {
        buf.put_u8((v | b) as u8);
        v >>= 7;
        len += 1;
    }
    buf.put_u8(v as u8);
    len + 1
}

pub fn decode_varintu32(buf: &[u8]) -> Result<u32, CodecError> {
    let b: u8 = 128;
    let mut v = 0;
    let mut i = 0;
    loop {
        // a u32 never needs more than 5 bytes
        let Some(byte) = buf.get(i).filter(|_| i < 5) else {
            return Err(CodecError::InvalidVarint(buf.iter().take(5).copied().collect()));
        };
        v |= ((byte & 0x7F) as u32) << (i * 7);
        i += 1;
        if (byte & b) == 0 {
            break;
        }
    }
    Ok(v)
}

/// Decodes a varint length prefix followed by that many bytes.
/// Returns the slice and the total number of bytes consumed.
pub fn decode_length_prefixed(buf: &[u8]) -> Result<(&[u8], usize), CodecError> {
    let sz = decode_varintu32(buf)? as usize;
    let var_sz = varintu32_length(sz as u32) as usize;
    match buf.get(var_sz..var_sz + sz) {
        Some(data) => Ok((data, var_sz + sz)),
        None => Err(CodecError::Truncated {
            need: var_sz + sz,
            have: buf.len(),
        }),
    }
}

pub fn calculate_checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

pub fn verify_checksum(data: &[u8], expected: u32) -> Result<(), CodecError> {
    let actual = calculate_checksum(data);
    if actual != expected {
        return Err(CodecError::ChecksumMismatch { expected, actual });
    }
    Ok(())
}
