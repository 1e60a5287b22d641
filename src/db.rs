use std::{
    fmt,
    fs::OpenOptions,
    path::Path,
    sync::atomic::{AtomicBool, Ordering},
};

use bytes::{Buf, BufMut, Bytes};
use parking_lot::Mutex;
use tracing::{info, warn};

use crate::{
    error::{Error, Result},
    file::{path_of_file, Ext, Reader, SequentialFileImpl, WritableFileImpl, Writer},
    mem_table::MemTable,
    sequence::SequenceAllocator,
    snapshot::{Snapshot, SnapshotRegistry},
    utils::{
        codec::{decode_length_prefixed, encode_varintu32, CodecError},
        Entry, OP_TYPE_DELETE, OP_TYPE_PUT,
    },
    Options,
};

const CLOSED: &str = "store is closed";

/// State owned by the single writer.
struct WriteState {
    wal: Option<Writer>,
    // set once a log append fails; every later write is refused
    bg_error: Option<String>,
    closed: bool,
}

/// An open store.
///
/// Writes are serialized by one lock covering sequence allocation, the log
/// append and the memtable insert. Reads take no lock: they load the last
/// published sequence and search the memtable at it, so a reader never sees a
/// write whose sequence is allocated but not yet applied.
///
/// `Db` is `Send + Sync`; share it across threads behind an `Arc`.
pub struct Db {
    opt: Options,
    mem: MemTable,
    seq: SequenceAllocator,
    snapshots: SnapshotRegistry,
    write_state: Mutex<WriteState>,
    closed: AtomicBool,
}

impl Db {
    /// Opens the store under `opt.work_dir`, replaying its log.
    pub fn open(opt: Options) -> Result<Self> {
        let work_dir = opt.work_dir.clone();
        let log_path = path_of_file(&work_dir, Ext::Log);

        if log_path.exists() {
            if opt.error_if_exists {
                return Err(Error::InvalidArgument(format!(
                    "{}: store already exists",
                    work_dir.display()
                )));
            }
        } else if opt.create_if_missing {
            std::fs::create_dir_all(&work_dir)?;
        } else {
            return Err(Error::NotFound(format!(
                "{}: store does not exist",
                work_dir.display()
            )));
        }

        let db = Self::new(opt);
        let (records, last_seq) = db.recover(&log_path)?;
        db.seq.recover(last_seq);

        let file = WritableFileImpl::open(&log_path)?;
        let offset = std::fs::metadata(&log_path)?.len();
        db.write_state.lock().wal = Some(Writer::with_offset(Box::new(file), offset));

        info!(
            "Open {:?}: recovered {} records, last sequence {}",
            work_dir, records, last_seq
        );
        Ok(db)
    }

    /// Opens a store that lives only in memory.
    pub fn open_in_memory(opt: Options) -> Self {
        Self::new(opt)
    }

    fn new(opt: Options) -> Self {
        Self {
            opt,
            mem: MemTable::new(),
            seq: SequenceAllocator::new(),
            snapshots: SnapshotRegistry::new(),
            write_state: Mutex::new(WriteState {
                wal: None,
                bg_error: None,
                closed: false,
            }),
            closed: AtomicBool::new(false),
        }
    }

    // Replays the log into the memtable. Returns the number of records applied
    // and the highest sequence seen.
    fn recover(&self, log_path: &Path) -> Result<(u64, u64)> {
        if !log_path.exists() {
            return Ok((0, 0));
        }
        let mut reader = Reader::new(Box::new(SequentialFileImpl::open(log_path)?));
        let mut last_seq = 0;
        let mut records = 0;
        loop {
            let record = match reader.read_record() {
                Ok(Some(record)) => record,
                Ok(None) => break,
                Err(err) if err.kind() == std::io::ErrorKind::InvalidData => {
                    return Err(Error::Corruption(err.to_string()))
                }
                Err(err) => return Err(err.into()),
            };
            let entry = decode_record(&record).map_err(|err| {
                Error::Corruption(format!("log record at offset {}: {}", reader.offset(), err))
            })?;
            self.mem
                .insert(&entry.key, entry.value.as_deref(), entry.seq);
            last_seq = last_seq.max(entry.seq);
            records += 1;
        }

        if reader.is_torn() {
            warn!(
                "Drop torn record at the tail of {:?}, offset {}",
                log_path,
                reader.offset()
            );
            let f = OpenOptions::new().write(true).open(log_path)?;
            f.set_len(reader.offset())?;
            f.sync_all()?;
        }
        Ok((records, last_seq))
    }

    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.write(key, Some(value)).map(|_| ())
    }

    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.write(key, None).map(|_| ())
    }

    /// Applies one write and returns the sequence it was stamped with.
    pub(crate) fn write(&self, key: &[u8], value: Option<&[u8]>) -> Result<u64> {
        let mut guard = self.write_state.lock();
        let state = &mut *guard;
        if state.closed {
            return Err(Error::InvalidState(CLOSED));
        }
        if let Some(err) = &state.bg_error {
            return Err(Error::Fatal(format!("log write failed earlier: {}", err)));
        }

        let seq = self.seq.next();
        if let Some(wal) = state.wal.as_mut() {
            let record = encode_record(key, value, seq);
            let appended = wal.add_record(&record).and_then(|_| {
                if self.opt.sync {
                    wal.sync()
                } else {
                    Ok(())
                }
            });
            if let Err(err) = appended {
                state.bg_error = Some(err.to_string());
                return Err(err.into());
            }
        }

        self.mem.insert(key, value, seq);
        self.seq.publish(seq);
        Ok(seq)
    }

    /// Reads `key` at the latest state, or as of `snapshot` if given.
    /// Returns `None` if the key is absent or deleted at that point.
    pub fn get(&self, key: &[u8], snapshot: Option<&Snapshot>) -> Result<Option<Bytes>> {
        self.check_open()?;
        let max_seq = match snapshot {
            Some(snapshot) => {
                if !self.snapshots.is_live(snapshot) {
                    return Err(Error::InvalidArgument(format!(
                        "snapshot at {} is released or belongs to another store",
                        snapshot.sequence()
                    )));
                }
                snapshot.sequence()
            }
            None => self.seq.last_sequence(),
        };
        Ok(self.mem.find(key, max_seq))
    }

    /// Captures the current state: the snapshot sees every write published so
    /// far and none that follow.
    pub fn get_snapshot(&self) -> Result<Snapshot> {
        self.check_open()?;
        self.snapshots
            .acquire(self.seq.last_sequence())
            .ok_or(Error::InvalidState(CLOSED))
    }

    /// Releases `snapshot`. Releasing it again is a no-op.
    pub fn release_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        self.check_open()?;
        self.snapshots.release(snapshot);
        Ok(())
    }

    /// Syncs and closes the log and invalidates all live snapshots. Every
    /// later call fails with `InvalidState`; closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let mut state = self.write_state.lock();
        if state.closed {
            return Ok(());
        }
        state.closed = true;
        self.closed.store(true, Ordering::Release);

        let live = self.snapshots.len();
        self.snapshots.close();
        let synced = match state.wal.take() {
            Some(mut wal) => wal.sync(),
            None => Ok(()),
        };
        info!(
            "Close {:?}: last sequence {}, {} live snapshots invalidated",
            self.opt.work_dir,
            self.seq.last_sequence(),
            live
        );
        synced.map_err(Error::from)
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::InvalidState(CLOSED));
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Sequence of the last published write, 0 for an empty store.
    pub fn latest_sequence(&self) -> u64 {
        self.seq.last_sequence()
    }

    /// The oldest sequence a live snapshot still reads at.
    pub fn oldest_snapshot(&self) -> Option<u64> {
        self.snapshots.oldest_live()
    }

    pub fn live_snapshots(&self) -> usize {
        self.snapshots.len()
    }

    pub fn approximate_memory_usage(&self) -> u64 {
        self.mem.approximate_memory_usage()
    }

    #[cfg(test)]
    pub(crate) fn mem_table(&self) -> &MemTable {
        &self.mem
    }

    pub fn options(&self) -> &Options {
        &self.opt
    }
}

impl fmt::Debug for Db {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Db")
            .field("work_dir", &self.opt.work_dir)
            .field("latest_sequence", &self.latest_sequence())
            .field("live_snapshots", &self.live_snapshots())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Drop for Db {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!("Close on drop failed: {}", err);
        }
    }
}

// +----------+-----------+---------------------+------------------------+
// | seq (8B) | type (1B) | key_size | key      | value_size | value     |
// +----------+-----------+---------------------+------------------------+
// the value part is absent for deletions
fn encode_record(key: &[u8], value: Option<&[u8]>, seq: u64) -> Vec<u8> {
    let mut record = Vec::with_capacity(9 + 5 + key.len() + value.map_or(0, |v| 5 + v.len()));
    record.put_u64(seq);
    match value {
        Some(value) => {
            record.put_u8(OP_TYPE_PUT);
            encode_varintu32(&mut record, key.len() as u32);
            record.put_slice(key);
            encode_varintu32(&mut record, value.len() as u32);
            record.put_slice(value);
        }
        None => {
            record.put_u8(OP_TYPE_DELETE);
            encode_varintu32(&mut record, key.len() as u32);
            record.put_slice(key);
        }
    }
    record
}

fn decode_record(mut record: &[u8]) -> std::result::Result<Entry, CodecError> {
    if record.len() < 9 {
        return Err(CodecError::Truncated {
            need: 9,
            have: record.len(),
        });
    }
    let seq = record.get_u64();
    let typ = record.get_u8();
    let (key, consumed) = decode_length_prefixed(record)?;
    let key = Bytes::copy_from_slice(key);
    match typ {
        OP_TYPE_PUT => {
            let (value, _) = decode_length_prefixed(&record[consumed..])?;
            Ok(Entry::new(key, Bytes::copy_from_slice(value), seq))
        }
        OP_TYPE_DELETE => Ok(Entry::tombstone(key, seq)),
        typ => Err(CodecError::InvalidType(typ)),
    }
}
