use std::{
    cmp::Ordering as CmpOrdering,
    ops::Bound,
    sync::atomic::{AtomicU64, Ordering},
};

use bytes::{Buf, BufMut, Bytes};
use crossbeam_skiplist::SkipMap;

use crate::utils::{pack_tag, unpack_tag, Entry, OP_TYPE_DELETE, OP_TYPE_PUT};

type Table = SkipMap<Key, Bytes>;
type TableIterator<'a> = crossbeam_skiplist::map::Iter<'a, Key, Bytes>;

const TAG_SIZE: usize = 8;

/// An internal key: the user key followed by its 8-byte tag.
///
/// Keys order by user key ascending, then by sequence descending, so the
/// newest version of a key is the first one a forward scan meets.
#[derive(Debug, Clone)]
pub struct Key {
    key: Bytes,
}

// +----------+----------------------+
// | user key | seq << 8 | type (8B) |
// +----------+----------------------+
impl Key {
    pub fn new(user_key: &[u8], seq: u64, typ: u8) -> Self {
        let mut key = Vec::with_capacity(user_key.len() + TAG_SIZE);
        key.put_slice(user_key);
        key.put_u64(pack_tag(seq, typ));
        Self {
            key: Bytes::from(key),
        }
    }

    pub fn user_key(&self) -> &[u8] {
        &self.key[..self.key.len() - TAG_SIZE]
    }

    fn tag(&self) -> u64 {
        (&self.key[self.key.len() - TAG_SIZE..]).get_u64()
    }

    pub fn seq(&self) -> u64 {
        unpack_tag(self.tag()).0
    }

    pub fn op_type(&self) -> u8 {
        unpack_tag(self.tag()).1
    }

    pub(crate) fn len(&self) -> u64 {
        self.key.len() as u64
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        match self.user_key().cmp(other.user_key()) {
            CmpOrdering::Equal => other.seq().cmp(&self.seq()),
            ord => ord,
        }
    }
}

/// A multi-version mem-table based on crossbeam-skiplist.
///
/// Entries are only ever added. Readers never block and never observe a
/// partially inserted entry.
pub struct MemTable {
    table: Table,
    size: AtomicU64,
}

impl MemTable {
    pub fn new() -> Self {
        Self {
            table: Table::new(),
            size: AtomicU64::new(0),
        }
    }

    /// Adds a version of `key`. `None` records a tombstone.
    ///
    /// Returns false, leaving the table untouched, if a version with the same
    /// key and sequence already exists.
    pub fn insert(&self, key: &[u8], value: Option<&[u8]>, seq: u64) -> bool {
        let typ = if value.is_some() {
            OP_TYPE_PUT
        } else {
            OP_TYPE_DELETE
        };
        let internal_key = Key::new(key, seq, typ);
        if self.table.contains_key(&internal_key) {
            return false;
        }
        let value = value.map(Bytes::copy_from_slice).unwrap_or_default();
        self.size
            .fetch_add(internal_key.len() + value.len() as u64, Ordering::Relaxed);
        self.table.get_or_insert(internal_key, value);
        true
    }

    pub fn put(&self, key: &[u8], value: &[u8], seq: u64) -> bool {
        self.insert(key, Some(value), seq)
    }

    pub fn delete(&self, key: &[u8], seq: u64) -> bool {
        self.insert(key, None, seq)
    }

    /// Returns the newest version of `key` with a sequence no greater than
    /// `max_seq`, tombstones included.
    pub fn find_entry(&self, key: &[u8], max_seq: u64) -> Option<Entry> {
        let left = Key::new(key, max_seq, OP_TYPE_PUT);
        let right = Key::new(key, 0, OP_TYPE_PUT);
        self.table
            .range((Bound::Included(left), Bound::Included(right)))
            .next()
            .map(|e| to_entry(e.key(), e.value()))
    }

    /// Returns the value of `key` visible at `max_seq`, or `None` if the key
    /// did not exist yet or its newest visible version is a tombstone.
    pub fn find(&self, key: &[u8], max_seq: u64) -> Option<Bytes> {
        self.find_entry(key, max_seq).and_then(|e| e.value)
    }

    pub fn iter(&self) -> MemTableIterator<'_> {
        MemTableIterator::new(self)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn approximate_memory_usage(&self) -> u64 {
        self.size.load(Ordering::Relaxed)
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new()
    }
}

fn to_entry(key: &Key, value: &Bytes) -> Entry {
    let user_key = Bytes::copy_from_slice(key.user_key());
    if key.op_type() == OP_TYPE_DELETE {
        Entry::tombstone(user_key, key.seq())
    } else {
        Entry::new(user_key, value.clone(), key.seq())
    }
}

/// Walks every version in (key ascending, sequence descending) order.
pub struct MemTableIterator<'a> {
    table_iter: TableIterator<'a>,
}

impl<'a> MemTableIterator<'a> {
    pub fn new(mem: &'a MemTable) -> Self {
        Self {
            table_iter: mem.table.iter(),
        }
    }
}

impl<'a> Iterator for MemTableIterator<'a> {
    type Item = Entry;

    fn next(&mut self) -> Option<Self::Item> {
        self.table_iter
            .next()
            .map(|item| to_entry(item.key(), item.value()))
    }
}
