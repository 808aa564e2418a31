//! Per-stream record buffer keyed by logical timestamp.
//!
//! Uses index-based separation:
//! - BTreeMap stores the ordered index (TimestampKey -> slab key)
//! - Slab stores the actual records
//!
//! Pruning walks only the index, so large payloads are never moved.

use std::collections::BTreeMap;
use std::fmt;

use contracts::{StreamId, TimestampKey};
use parking_lot::Mutex;
use slab::Slab;

use crate::SyncError;

/// Buffer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferStats {
    pub pushed: u64,
    pub popped: u64,
    pub pruned: u64,
    /// Pushes whose key was older than the newest buffered key
    pub out_of_order: u64,
}

struct Inner<T> {
    index: BTreeMap<TimestampKey, usize>,
    storage: Slab<T>,
    stats: BufferStats,
}

/// Thread-safe timestamp-ordered buffer for one logical stream
///
/// Each key holds at most one record. Records are owned by the buffer until
/// popped or pruned.
pub struct PerStreamBuffer<T> {
    name: StreamId,
    inner: Mutex<Inner<T>>,
}

impl<T> fmt::Debug for PerStreamBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("PerStreamBuffer")
            .field("name", &self.name)
            .field("len", &inner.index.len())
            .field("stats", &inner.stats)
            .finish()
    }
}

impl<T> PerStreamBuffer<T> {
    /// Create an empty buffer
    pub fn new(name: impl Into<StreamId>) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(Inner {
                index: BTreeMap::new(),
                storage: Slab::new(),
                stats: BufferStats::default(),
            }),
        }
    }

    pub fn name(&self) -> &StreamId {
        &self.name
    }

    /// Insert a record under `key`
    ///
    /// # Errors
    /// `DuplicateKey` if the key already holds a record; the existing record
    /// is left untouched.
    pub fn push(&self, key: TimestampKey, record: T) -> Result<(), SyncError> {
        let depth = {
            let mut inner = self.inner.lock();
            if inner.index.contains_key(&key) {
                return Err(SyncError::duplicate_key(self.name.to_string(), &key));
            }

            if inner
                .index
                .last_key_value()
                .is_some_and(|(newest, _)| key < *newest)
            {
                inner.stats.out_of_order += 1;
            }

            let slab_key = inner.storage.insert(record);
            inner.index.insert(key, slab_key);
            inner.stats.pushed += 1;
            inner.index.len()
        };

        observability::record_buffer_depth(self.name.as_str(), depth);
        Ok(())
    }

    /// Remove and return the record stored under `key`
    ///
    /// # Errors
    /// `NotFound` if no record is buffered under the key.
    pub fn pop(&self, key: &TimestampKey) -> Result<T, SyncError> {
        let mut inner = self.inner.lock();
        let slab_key = inner
            .index
            .remove(key)
            .ok_or_else(|| SyncError::not_found(self.name.to_string(), key))?;
        inner.stats.popped += 1;
        Ok(inner.storage.remove(slab_key))
    }

    /// Delete every record whose key is strictly older than `bound`
    ///
    /// Returns the number of records removed.
    pub fn prune_older_than(&self, bound: &TimestampKey) -> usize {
        let pruned = {
            let mut inner = self.inner.lock();
            let keep = inner.index.split_off(bound);
            let expired = std::mem::replace(&mut inner.index, keep);
            for slab_key in expired.values() {
                inner.storage.remove(*slab_key);
            }
            inner.stats.pruned += expired.len() as u64;
            expired.len()
        };

        observability::record_buffer_pruned(self.name.as_str(), pruned);
        pruned
    }

    pub fn contains(&self, key: &TimestampKey) -> bool {
        self.inner.lock().index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().index.is_empty()
    }

    pub fn oldest_key(&self) -> Option<TimestampKey> {
        self.inner
            .lock()
            .index
            .first_key_value()
            .map(|(k, _)| k.clone())
    }

    pub fn newest_key(&self) -> Option<TimestampKey> {
        self.inner
            .lock()
            .index
            .last_key_value()
            .map(|(k, _)| k.clone())
    }

    /// Buffered keys, oldest first
    pub fn keys(&self) -> Vec<TimestampKey> {
        self.inner.lock().index.keys().cloned().collect()
    }

    pub fn stats(&self) -> BufferStats {
        self.inner.lock().stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn key(ms: u64) -> TimestampKey {
        TimestampKey::from_millis(ms)
    }

    #[test]
    fn test_push_pop_each_key_once() {
        let buffer = PerStreamBuffer::new("cam");
        for ms in [30, 10, 20] {
            buffer.push(key(ms), format!("frame-{ms}")).unwrap();
        }

        assert_eq!(buffer.pop(&key(20)).unwrap(), "frame-20");
        assert_eq!(buffer.pop(&key(10)).unwrap(), "frame-10");
        assert_eq!(buffer.pop(&key(30)).unwrap(), "frame-30");
        assert!(buffer.is_empty());
        assert!(matches!(
            buffer.pop(&key(10)),
            Err(SyncError::NotFound { .. })
        ));
    }

    #[test]
    fn test_duplicate_push_keeps_original() {
        let buffer = PerStreamBuffer::new("cam");
        buffer.push(key(5), 1).unwrap();

        let err = buffer.push(key(5), 2).unwrap_err();
        assert!(matches!(err, SyncError::DuplicateKey { .. }));
        assert_eq!(buffer.pop(&key(5)).unwrap(), 1);
    }

    #[test]
    fn test_prune_is_strict() {
        let buffer = PerStreamBuffer::new("lidar");
        for ms in [0, 50, 100, 150] {
            buffer.push(key(ms), ms).unwrap();
        }

        assert_eq!(buffer.prune_older_than(&key(100)), 2);
        assert_eq!(buffer.keys(), vec![key(100), key(150)]);
        assert_eq!(buffer.oldest_key(), Some(key(100)));
        assert_eq!(buffer.stats().pruned, 2);

        // nothing precedes the top key
        assert_eq!(buffer.prune_older_than(&TimestampKey::Top), 0);
    }

    #[test]
    fn test_out_of_order_detection() {
        let buffer = PerStreamBuffer::new("cam");
        buffer.push(key(1), ()).unwrap();
        buffer.push(key(3), ()).unwrap();
        buffer.push(key(2), ()).unwrap();

        let stats = buffer.stats();
        assert_eq!(stats.pushed, 3);
        assert_eq!(stats.out_of_order, 1);
        assert_eq!(buffer.newest_key(), Some(key(3)));
    }

    #[test]
    fn test_concurrent_producers() {
        let buffer = Arc::new(PerStreamBuffer::new("shared"));
        let handles: Vec<_> = (0..4u64)
            .map(|t| {
                let buffer = Arc::clone(&buffer);
                thread::spawn(move || {
                    for i in 0..250u64 {
                        buffer.push(key(i * 4 + t), i).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(buffer.len(), 1000);
        for ms in 0..1000 {
            assert!(buffer.pop(&key(ms)).is_ok());
        }
        assert_eq!(buffer.stats().popped, 1000);
    }
}
