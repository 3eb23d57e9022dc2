//! Single-value publication slot.
//!
//! Writers replace the whole value behind an `Arc`; readers clone the `Arc`
//! under a short read lock. A reader therefore always sees one complete
//! publication, never a half-written buffer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// The version only changes under the write lock, so a reader holding the
/// read lock sees a value and a version that belong together.
#[derive(Debug)]
pub struct SnapshotSlot<T> {
    value: RwLock<Option<Arc<T>>>,
    version: AtomicU64,
}

impl<T> Default for SnapshotSlot<T> {
    fn default() -> Self {
        Self {
            value: RwLock::new(None),
            version: AtomicU64::new(0),
        }
    }
}

impl<T> SnapshotSlot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the slot content
    pub fn publish(&self, value: T) {
        let value = Arc::new(value);
        let mut guard = self.value.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(value);
        self.version.fetch_add(1, Ordering::Release);
    }

    /// Latest published value
    pub fn latest(&self) -> Option<Arc<T>> {
        self.value
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Latest value if it was published after version `seen`.
    ///
    /// Each reader keeps its own cursor, so one reader never hides a
    /// publication from another.
    pub fn read_since(&self, seen: &mut u64) -> Option<Arc<T>> {
        let guard = self.value.read().unwrap_or_else(|e| e.into_inner());
        let version = self.version.load(Ordering::Acquire);
        if version == *seen {
            return None;
        }
        *seen = version;
        guard.clone()
    }

    /// Number of publications so far
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    pub fn is_ready(&self) -> bool {
        self.version() > 0
    }
}
