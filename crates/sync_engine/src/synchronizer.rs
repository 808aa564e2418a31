//! StreamSynchronizer - N-way alignment of buffered streams
//!
//! Each stream pushes records into its own buffer and later signals that it
//! is ready for a key, typically on receiving a watermark. When every stream
//! has signalled a key, the records are popped together and handed to the
//! consumer as one [`AlignedTuple`].
//!
//! There is no reordering and no timeout: a key that one stream never
//! signals stays pending until [`StreamSynchronizer::discard`] or
//! [`StreamSynchronizer::prune_older_than`] removes it.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use contracts::{StreamId, TimestampKey};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, instrument, warn};

use crate::{PerStreamBuffer, SyncError};

/// Records of all streams for one key, ordered by stream id
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedTuple<T> {
    pub key: TimestampKey,
    pub records: Vec<(StreamId, T)>,
}

impl<T> AlignedTuple<T> {
    /// Take the record of one stream out of the tuple
    pub fn take(&mut self, stream: &str) -> Option<T> {
        let pos = self.records.iter().position(|(id, _)| id == stream)?;
        Some(self.records.remove(pos).1)
    }
}

/// Consumer invoked once per aligned key
pub type TupleConsumer<T> = Arc<dyn Fn(AlignedTuple<T>) + Send + Sync>;

/// Result of a readiness signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyOutcome {
    /// Still waiting on other streams
    Pending { ready: usize, required: usize },
    /// Tuple handed to the consumer
    Emitted,
    /// Top key; nothing tracked
    Ignored,
}

impl ReadyOutcome {
    pub fn is_emitted(&self) -> bool {
        matches!(self, Self::Emitted)
    }
}

/// Readiness signal result that carries the completed tuple
#[derive(Debug, Clone, PartialEq)]
pub enum ReadySignal<T> {
    Pending { ready: usize, required: usize },
    Complete(AlignedTuple<T>),
    Ignored,
}

impl<T> ReadySignal<T> {
    pub fn outcome(&self) -> ReadyOutcome {
        match self {
            Self::Pending { ready, required } => ReadyOutcome::Pending {
                ready: *ready,
                required: *required,
            },
            Self::Complete(_) => ReadyOutcome::Emitted,
            Self::Ignored => ReadyOutcome::Ignored,
        }
    }
}

/// Readiness bookkeeping, guarded by one lock
#[derive(Debug, Default)]
struct ReadyState {
    /// Streams (by index) that reported ready, per key
    marks: HashMap<TimestampKey, HashSet<usize>>,
    /// Latest key each stream signalled, by stream index
    last_signalled: Vec<Option<TimestampKey>>,
}

/// Watermark-driven N-stream synchronizer
pub struct StreamSynchronizer<T> {
    /// Sorted, distinct
    streams: Vec<StreamId>,
    buffers: Vec<PerStreamBuffer<T>>,
    ready: Mutex<ReadyState>,
    consumer: RwLock<Option<TupleConsumer<T>>>,
}

impl<T> fmt::Debug for StreamSynchronizer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSynchronizer")
            .field("streams", &self.streams)
            .field("pending_keys", &self.ready.lock().marks.len())
            .finish()
    }
}

impl<T: Send + 'static> StreamSynchronizer<T> {
    /// Create a synchronizer over distinct stream ids
    ///
    /// # Errors
    /// `InvalidStreams` if the set is empty or has duplicates.
    pub fn new<I, S>(stream_ids: I) -> Result<Self, SyncError>
    where
        I: IntoIterator<Item = S>,
        S: Into<StreamId>,
    {
        let mut streams: Vec<StreamId> = stream_ids.into_iter().map(Into::into).collect();
        if streams.is_empty() {
            return Err(SyncError::InvalidStreams {
                reason: "at least one stream is required".to_string(),
            });
        }

        streams.sort();
        if let Some(dup) = streams.windows(2).find(|w| w[0] == w[1]) {
            return Err(SyncError::InvalidStreams {
                reason: format!("duplicate stream id '{}'", dup[0]),
            });
        }

        let buffers = streams.iter().map(PerStreamBuffer::new).collect();
        let ready = ReadyState {
            marks: HashMap::new(),
            last_signalled: vec![None; streams.len()],
        };
        Ok(Self {
            streams,
            buffers,
            ready: Mutex::new(ready),
            consumer: RwLock::new(None),
        })
    }

    /// Register the consumer at construction
    pub fn with_consumer(self, consumer: TupleConsumer<T>) -> Self {
        self.set_consumer(consumer);
        self
    }

    /// Replace the consumer of aligned tuples
    pub fn set_consumer(&self, consumer: TupleConsumer<T>) {
        *self.consumer.write() = Some(consumer);
    }

    /// Stream ids in tuple order
    pub fn stream_ids(&self) -> &[StreamId] {
        &self.streams
    }

    /// Number of streams that must report ready
    pub fn required(&self) -> usize {
        self.streams.len()
    }

    /// Buffer of one stream
    pub fn buffer(&self, stream: &str) -> Option<&PerStreamBuffer<T>> {
        self.index_of(stream).ok().map(|idx| &self.buffers[idx])
    }

    /// Buffer a record for `stream`
    ///
    /// # Errors
    /// `UnknownStream`, or `DuplicateKey` from the stream's buffer.
    pub fn push(&self, stream: &str, key: TimestampKey, record: T) -> Result<(), SyncError> {
        let idx = self.index_of(stream)?;
        self.buffers[idx].push(key, record)
    }

    /// Mark `stream` ready for `key` and hand a completed tuple to the consumer
    ///
    /// On the N-th distinct signal for a key the records of every stream are
    /// popped atomically and the consumer is called outside the lock.
    ///
    /// # Errors
    /// See [`StreamSynchronizer::signal_ready`].
    pub fn on_stream_ready(
        &self,
        stream: &str,
        key: TimestampKey,
    ) -> Result<ReadyOutcome, SyncError> {
        let signal = self.signal_ready(stream, key)?;
        let outcome = signal.outcome();
        if let ReadySignal::Complete(tuple) = signal {
            let consumer = self.consumer.read().clone();
            match consumer {
                Some(consumer) => consumer(tuple),
                None => warn!(key = %tuple.key, "no consumer registered; aligned tuple dropped"),
            }
        }
        Ok(outcome)
    }

    /// Mark `stream` ready for `key` and return a completed tuple to the caller
    ///
    /// The consumer is not called. Only the signal that completes a key gets
    /// its tuple.
    ///
    /// # Errors
    /// - `UnknownStream`
    /// - `DuplicateReady` if the stream already signalled this key or a
    ///   later one, emitted or not
    /// - `NotFound` if readiness is complete but a stream has no record;
    ///   nothing is popped and the signalling stream's mark is withdrawn
    #[instrument(
        level = "trace",
        name = "stream_synchronizer_ready",
        skip(self),
        fields(stream = %stream, key = %key)
    )]
    pub fn signal_ready(
        &self,
        stream: &str,
        key: TimestampKey,
    ) -> Result<ReadySignal<T>, SyncError> {
        let idx = self.index_of(stream)?;
        if key.is_top() {
            return Ok(ReadySignal::Ignored);
        }

        let required = self.required();
        let mut state = self.ready.lock();
        let ReadyState {
            marks,
            last_signalled,
        } = &mut *state;

        if last_signalled[idx].as_ref().is_some_and(|last| key <= *last) {
            return Err(SyncError::DuplicateReady {
                stream: stream.to_string(),
                key,
            });
        }

        let marked = marks.entry(key.clone()).or_default();
        marked.insert(idx);
        let ready = marked.len();

        if ready < required {
            last_signalled[idx] = Some(key);
            observability::record_sync_outcome(false);
            observability::record_sync_pending(marks.len());
            return Ok(ReadySignal::Pending { ready, required });
        }

        if let Some(missing) = self.buffers.iter().find(|b| !b.contains(&key)) {
            // 撤回本次标记，记录到达后可重新发信号
            marked.remove(&idx);
            if marked.is_empty() {
                marks.remove(&key);
            }
            return Err(SyncError::not_found(missing.name().to_string(), &key));
        }

        marks.remove(&key);
        last_signalled[idx] = Some(key.clone());
        let mut records = Vec::with_capacity(required);
        for buffer in &self.buffers {
            records.push((buffer.name().clone(), buffer.pop(&key)?));
        }
        let pending_keys = marks.len();
        drop(state);

        observability::record_sync_outcome(true);
        observability::record_sync_pending(pending_keys);
        Ok(ReadySignal::Complete(AlignedTuple { key, records }))
    }

    /// Forget `key`: readiness state and any buffered records
    ///
    /// Returns the number of records dropped.
    pub fn discard(&self, key: &TimestampKey) -> usize {
        let mut state = self.ready.lock();
        state.marks.remove(key);
        let dropped = self
            .buffers
            .iter()
            .filter(|b| b.pop(key).is_ok())
            .count();
        drop(state);

        debug!(key = %key, dropped, "synchronizer key discarded");
        dropped
    }

    /// Drop state and records for every key older than `bound`
    ///
    /// Returns the number of records pruned.
    pub fn prune_older_than(&self, bound: &TimestampKey) -> usize {
        let mut state = self.ready.lock();
        state.marks.retain(|key, _| key >= bound);
        let pruned = self
            .buffers
            .iter()
            .map(|b| b.prune_older_than(bound))
            .sum();
        observability::record_sync_pending(state.marks.len());
        pruned
    }

    /// Keys with partial readiness, oldest first
    pub fn pending_keys(&self) -> Vec<TimestampKey> {
        let mut keys: Vec<_> = self.ready.lock().marks.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn index_of(&self, stream: &str) -> Result<usize, SyncError> {
        self.streams
            .binary_search_by(|id| id.as_str().cmp(stream))
            .map_err(|_| SyncError::UnknownStream {
                stream: stream.to_string(),
            })
    }
}
