//! Acknowledgement Set (spec §4.5): concurrent first-seen tracking of
//! cookies, created empty at Run start, drained by the Report Writer at
//! shutdown.

use std::collections::HashSet;
use std::sync::RwLock;

use xcover_common::Cookie;

/// A concurrent set of cookies that have been observed at least once.
///
/// Insertion is insert-mostly and the Status Reporter samples `len()`
/// concurrently; a `RwLock`-guarded `HashSet` is sufficient here since the
/// contract is "concurrent insert-if-absent + snapshot iterate", not
/// lock-freedom (spec §9).
#[derive(Default)]
pub struct AcknowledgementSet {
    inner: RwLock<HashSet<Cookie>>,
}

impl AcknowledgementSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` iff this call performed the first insertion of
    /// `cookie`.
    pub fn insert_if_absent(&self, cookie: Cookie) -> bool {
        // Fast path: most calls are duplicates once warm-up settles.
        if self.inner.read().unwrap().contains(&cookie) {
            return false;
        }
        self.inner.write().unwrap().insert(cookie)
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all acknowledged cookies. Intended for the single-threaded
    /// shutdown drain.
    pub fn snapshot(&self) -> Vec<Cookie> {
        self.inner.read().unwrap().iter().copied().collect()
    }
}
