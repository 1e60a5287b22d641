use std::{
    collections::BTreeMap,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
};

use parking_lot::Mutex;
use tracing::{debug, warn};

#[derive(Default)]
struct RegistryInner {
    // sequence -> number of live snapshots pinned at it
    live: BTreeMap<u64, usize>,
    // bumped by `clear`, so handles from before can no longer release
    generation: u64,
    closed: bool,
}

impl RegistryInner {
    fn remove(&mut self, seq: u64) -> bool {
        match self.live.get_mut(&seq) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                self.live.remove(&seq);
                true
            }
            None => false,
        }
    }
}

/// Tracks the sequence numbers pinned by live snapshots.
///
/// Duplicates are allowed; each release drops exactly one registration.
#[derive(Default)]
pub struct SnapshotRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl SnapshotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a snapshot at `seq`. Returns `None` once the registry is
    /// closed.
    pub fn acquire(&self, seq: u64) -> Option<Snapshot> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return None;
        }
        *inner.live.entry(seq).or_insert(0) += 1;
        debug!(seq, "acquire snapshot");
        Some(Snapshot {
            inner: Arc::new(SnapshotInner {
                seq,
                generation: inner.generation,
                released: AtomicBool::new(false),
                registry: Arc::downgrade(&self.inner),
            }),
        })
    }

    /// Releases the registration behind `snapshot`. Releasing the same handle
    /// (or any clone of it) again is a no-op.
    pub fn release(&self, snapshot: &Snapshot) {
        if !self.owns(snapshot) {
            warn!(seq = snapshot.sequence(), "release of a foreign snapshot ignored");
            return;
        }
        if !snapshot.inner.release() {
            warn!(seq = snapshot.sequence(), "snapshot already released");
        }
    }

    pub fn oldest_live(&self) -> Option<u64> {
        self.inner.lock().live.keys().next().copied()
    }

    /// Number of live registrations, counting duplicates.
    pub fn len(&self) -> usize {
        self.inner.lock().live.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().live.is_empty()
    }

    /// Invalidates every outstanding snapshot.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.live.clear();
        inner.generation += 1;
    }

    /// Invalidates every outstanding snapshot and refuses new ones.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.live.clear();
        inner.generation += 1;
        inner.closed = true;
    }

    /// Whether `snapshot` was handed out by this registry.
    pub fn owns(&self, snapshot: &Snapshot) -> bool {
        std::ptr::eq(snapshot.inner.registry.as_ptr(), Arc::as_ptr(&self.inner))
    }

    /// Whether `snapshot` belongs to this registry and is still registered.
    pub fn is_live(&self, snapshot: &Snapshot) -> bool {
        self.owns(snapshot)
            && !snapshot.inner.released.load(Ordering::Acquire)
            && snapshot.inner.generation == self.inner.lock().generation
    }
}

struct SnapshotInner {
    seq: u64,
    generation: u64,
    released: AtomicBool,
    registry: Weak<Mutex<RegistryInner>>,
}

impl SnapshotInner {
    /// Returns false if this registration was already released.
    fn release(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = registry.lock();
            if registry.generation == self.generation && registry.remove(self.seq) {
                debug!(seq = self.seq, "release snapshot");
            }
        }
        true
    }
}

impl Drop for SnapshotInner {
    fn drop(&mut self) {
        self.release();
    }
}

/// A read-only, point-in-time view of a store.
///
/// Clones share one registration. The registration is dropped by an explicit
/// release or, failing that, when the last clone goes out of scope. A snapshot
/// holds no reference to the data it reads.
#[derive(Clone)]
pub struct Snapshot {
    inner: Arc<SnapshotInner>,
}

impl Snapshot {
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.inner.seq
    }

    pub fn is_released(&self) -> bool {
        self.inner.released.load(Ordering::Acquire)
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("seq", &self.inner.seq)
            .field("released", &self.is_released())
            .finish()
    }
}
