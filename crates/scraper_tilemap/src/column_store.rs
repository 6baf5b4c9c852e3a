//! # Append-Only Column Store
//!
//! **Lock-free reads, single writer**
//!
//! The world grid grows forever to the right while the simulation thread
//! reads it every tick. Columns live in segments that double in size:
//!
//! ```text
//!   segment 0: [ 64 slots ]
//!   segment 1: [ 128 slots ]
//!   segment 2: [ 256 slots ]  ...
//! ```
//!
//! Segments are never moved or freed while the store lives, so a reference
//! handed out for index `i` stays valid. Each slot is written once. The
//! writer fills the slot, then publishes the new length with `Release`;
//! readers load the length with `Acquire` and only touch slots below it.
//!
//! A single [`parking_lot::Mutex`] permit serializes appends. Readers never
//! take it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use parking_lot::{Mutex, MutexGuard};

use crate::error::{TileMapError, TileMapResult};
use crate::template::Column;

/// Slots in the first segment.
const FIRST_SEGMENT: usize = 64;

/// Number of segments. Capacity is `FIRST_SEGMENT * (2^SEGMENTS - 1)`.
const SEGMENTS: usize = 32;

type Segment = Box<[OnceLock<Column>]>;

/// Append-only sequence of columns.
pub struct ColumnStore {
    segments: [OnceLock<Segment>; SEGMENTS],
    /// Published length.
    len: AtomicUsize,
    /// Append permit.
    permit: Mutex<()>,
}

impl std::fmt::Debug for ColumnStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnStore")
            .field("len", &self.len())
            .field("locked", &self.is_locked())
            .finish()
    }
}

impl Default for ColumnStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps a flat index to `(segment, offset)`.
#[inline]
const fn locate(index: usize) -> (usize, usize) {
    let n = index / FIRST_SEGMENT + 1;
    let segment = (usize::BITS - 1 - n.leading_zeros()) as usize;
    let start = FIRST_SEGMENT * ((1 << segment) - 1);
    (segment, index - start)
}

impl ColumnStore {
    /// Creates an empty store. Segments are allocated on first append.
    #[must_use]
    pub fn new() -> Self {
        Self {
            segments: std::array::from_fn(|_| OnceLock::new()),
            len: AtomicUsize::new(0),
            permit: Mutex::new(()),
        }
    }

    /// Returns the number of published columns.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Returns true if nothing has been appended yet.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns column `index` if it has been published.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Column> {
        if index >= self.len() {
            return None;
        }
        let (segment, offset) = locate(index);
        self.segments.get(segment)?.get()?.get(offset)?.get()
    }

    /// Returns true while a writer holds the append permit.
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.permit.is_locked()
    }

    /// Takes the append permit, blocking until it is free.
    pub fn lock(&self) -> ColumnAppender<'_> {
        ColumnAppender {
            store: self,
            _permit: self.permit.lock(),
        }
    }

    /// Takes the append permit if it is free.
    #[must_use]
    pub fn try_lock(&self) -> Option<ColumnAppender<'_>> {
        self.permit.try_lock().map(|permit| ColumnAppender {
            store: self,
            _permit: permit,
        })
    }
}

/// Proof that the append permit is held. Dropping it releases the permit.
pub struct ColumnAppender<'a> {
    store: &'a ColumnStore,
    _permit: MutexGuard<'a, ()>,
}

impl ColumnAppender<'_> {
    /// Appends one column and publishes the new length.
    ///
    /// # Errors
    ///
    /// Returns [`TileMapError::InvalidArgument`] if the store is full.
    pub fn push(&mut self, column: Column) -> TileMapResult<()> {
        // Only the permit holder writes `len`.
        let index = self.store.len.load(Ordering::Relaxed);
        let (segment, offset) = locate(index);

        let slots = self
            .store
            .segments
            .get(segment)
            .ok_or_else(|| TileMapError::InvalidArgument("column store is full".to_string()))?
            .get_or_init(|| {
                (0..FIRST_SEGMENT << segment)
                    .map(|_| OnceLock::new())
                    .collect()
            });

        if slots[offset].set(column).is_err() {
            return Err(TileMapError::InvalidArgument(format!(
                "column slot {index} written twice"
            )));
        }

        self.store.len.store(index + 1, Ordering::Release);
        Ok(())
    }

    /// Returns the published length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns true if the store is still empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn column(tag: u16) -> Column {
        Column::from(vec![tag, 0, 0, 0, 0, 0, 0, 21])
    }

    #[test]
    fn test_locate_segment_boundaries() {
        assert_eq!(locate(0), (0, 0));
        assert_eq!(locate(63), (0, 63));
        assert_eq!(locate(64), (1, 0));
        assert_eq!(locate(191), (1, 127));
        assert_eq!(locate(192), (2, 0));
        assert_eq!(locate(447), (2, 255));
        assert_eq!(locate(448), (3, 0));
    }

    #[test]
    fn test_append_and_read() {
        let store = ColumnStore::new();
        assert!(store.is_empty());
        assert!(store.get(0).is_none());

        {
            let mut appender = store.lock();
            for i in 0..1000u16 {
                appender.push(column(i)).unwrap();
            }
        }

        assert_eq!(store.len(), 1000);
        for i in 0..1000u16 {
            assert_eq!(store.get(usize::from(i)).unwrap()[0], i);
        }
        assert!(store.get(1000).is_none());
    }

    #[test]
    fn test_single_append_permit() {
        let store = ColumnStore::new();
        assert!(!store.is_locked());

        let appender = store.lock();
        assert!(store.is_locked());
        assert!(store.try_lock().is_none());
        drop(appender);

        assert!(!store.is_locked());
        assert!(store.try_lock().is_some());
    }

    #[test]
    fn test_reads_during_append_never_tear() {
        let store = Arc::new(ColumnStore::new());
        let done = Arc::new(AtomicBool::new(false));
        let observations = Arc::new(AtomicUsize::new(0));
        let start = Arc::new(Barrier::new(2));

        let reader = {
            let store = Arc::clone(&store);
            let done = Arc::clone(&done);
            let observations = Arc::clone(&observations);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                let mut last_len = 0;
                loop {
                    // Read `done` first so the final pass sees every append.
                    let finished = done.load(Ordering::Acquire);
                    let len = store.len();
                    assert!(len >= last_len, "length went backwards");
                    for i in last_len.saturating_sub(8)..len {
                        let col = store.get(i).expect("published column missing");
                        assert_eq!(usize::from(col[0]), i % 1000);
                        assert_eq!(col.len(), 8);
                    }
                    last_len = len;
                    observations.fetch_add(1, Ordering::AcqRel);
                    if finished {
                        return last_len;
                    }
                }
            })
        };

        start.wait();
        for batch in 0..50 {
            let mut appender = store.lock();
            for i in 0..100 {
                let index = batch * 100 + i;
                appender.push(column((index % 1000) as u16)).unwrap();

                // Halfway through, wait for a read while the permit is held.
                if i == 50 {
                    let seen = observations.load(Ordering::Acquire);
                    while observations.load(Ordering::Acquire) == seen {
                        thread::yield_now();
                    }
                }
            }
        }
        done.store(true, Ordering::Release);

        assert_eq!(reader.join().unwrap(), 5000);
        assert!(observations.load(Ordering::Acquire) > 50);
        assert_eq!(store.len(), 5000);
    }
}
