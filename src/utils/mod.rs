use bytes::Bytes;

pub mod codec;

pub const OP_TYPE_DELETE: u8 = 0;
pub const OP_TYPE_PUT: u8 = 1;

/// Largest sequence number that fits in an internal key tag.
pub const MAX_SEQUENCE: u64 = (1 << 56) - 1;

/// Packs a sequence number and an op type into the trailing tag of an
/// internal key.
pub fn pack_tag(seq: u64, typ: u8) -> u64 {
    debug_assert!(seq <= MAX_SEQUENCE);
    (seq << 8) | typ as u64
}

pub fn unpack_tag(tag: u64) -> (u64, u8) {
    (tag >> 8, tag as u8)
}

/// A single version of a key. `value` is `None` for a tombstone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub key: Bytes,
    pub value: Option<Bytes>,
    pub seq: u64,
}

impl Entry {
    pub fn new(key: Bytes, value: Bytes, seq: u64) -> Self {
        Self {
            key,
            value: Some(value),
            seq,
        }
    }

    pub fn tombstone(key: Bytes, seq: u64) -> Self {
        Self {
            key,
            value: None,
            seq,
        }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn is_tombstone(&self) -> bool {
        self.value.is_none()
    }

    pub fn op_type(&self) -> u8 {
        if self.is_tombstone() {
            OP_TYPE_DELETE
        } else {
            OP_TYPE_PUT
        }
    }
}
