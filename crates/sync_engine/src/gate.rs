//! ReleaseGate - emit-now vs hold-until-release policy
//!
//! While gated, every offered record is held under its key and only a
//! watermark is announced on the secondary stream. An external release
//! signal later moves the held record to the primary stream. Releasing the
//! top key switches the gate to immediate mode for good.

use std::collections::BTreeMap;
use std::sync::Arc;

use contracts::{StreamId, StreamWriter, TimestampKey};
use parking_lot::Mutex;
use tracing::{debug, instrument};

use crate::SyncError;

/// Result of [`ReleaseGate::offer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    /// Sent straight to the primary stream
    Forwarded,
    /// Held until released or discarded
    Held,
}

/// Result of [`ReleaseGate::release`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Pending record sent on the primary stream
    Emitted,
    /// Top key released: gate is now immediate
    SwitchedToImmediate,
}

/// Gate counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateStats {
    pub forwarded: u64,
    pub held: u64,
    pub released: u64,
    pub discarded: u64,
}

struct GateState<T> {
    immediate: bool,
    pending: BTreeMap<TimestampKey, T>,
    stats: GateStats,
}

/// Release gate over a primary data stream and a secondary watermark stream
pub struct ReleaseGate<T> {
    name: StreamId,
    primary: Arc<dyn StreamWriter<T>>,
    secondary: Arc<dyn StreamWriter<T>>,
    state: Mutex<GateState<T>>,
}

impl<T: Send + 'static> ReleaseGate<T> {
    /// Create a gate; `start_released` selects the initial mode
    pub fn new(
        name: impl Into<StreamId>,
        primary: Arc<dyn StreamWriter<T>>,
        secondary: Arc<dyn StreamWriter<T>>,
        start_released: bool,
    ) -> Self {
        Self {
            name: name.into(),
            primary,
            secondary,
            state: Mutex::new(GateState {
                immediate: start_released,
                pending: BTreeMap::new(),
                stats: GateStats::default(),
            }),
        }
    }

    pub fn name(&self) -> &StreamId {
        &self.name
    }

    /// Hand one record to the gate
    ///
    /// # Errors
    /// - `DuplicateKey` if a record is already held under `key`
    /// - `Downstream` if a stream rejects the message; a record whose
    ///   watermark could not be announced is not kept
    #[instrument(
        level = "trace",
        name = "release_gate_offer",
        skip(self, record),
        fields(gate = %self.name, key = %key)
    )]
    pub fn offer(&self, key: TimestampKey, record: T) -> Result<OfferOutcome, SyncError> {
        let mut state = self.state.lock();

        if state.immediate {
            state.stats.forwarded += 1;
            let pending = state.pending.len();
            drop(state);

            self.primary.send_data(key.clone(), record)?;
            self.primary.send_watermark(key)?;
            observability::record_gate_offer(self.name.as_str(), false, pending);
            return Ok(OfferOutcome::Forwarded);
        }

        if state.pending.contains_key(&key) {
            return Err(SyncError::duplicate_key(self.name.to_string(), &key));
        }
        state.pending.insert(key.clone(), record);
        state.stats.held += 1;
        let pending = state.pending.len();
        drop(state);

        if let Err(e) = self.secondary.send_watermark(key.clone()) {
            // 未公告的 key 永远不会被释放
            let mut state = self.state.lock();
            if state.pending.remove(&key).is_some() {
                state.stats.held -= 1;
            }
            return Err(e.into());
        }
        observability::record_gate_offer(self.name.as_str(), true, pending);
        Ok(OfferOutcome::Held)
    }

    /// Forward the external release signal for `key`
    ///
    /// # Errors
    /// - `MissingSnapshot` if nothing is held under `key`
    /// - `Downstream` if the primary stream rejects the message
    #[instrument(name = "release_gate_release", skip(self), fields(gate = %self.name, key = %key))]
    pub fn release(&self, key: TimestampKey) -> Result<ReleaseOutcome, SyncError> {
        let mut state = self.state.lock();

        if key.is_top() {
            if !state.immediate {
                state.immediate = true;
                debug!(gate = %self.name, "gate switched to immediate mode");
            }
            return Ok(ReleaseOutcome::SwitchedToImmediate);
        }

        let record = state
            .pending
            .remove(&key)
            .ok_or_else(|| SyncError::missing_snapshot(self.name.to_string(), &key))?;
        state.stats.released += 1;
        let pending = state.pending.len();
        drop(state);

        self.primary.send_data(key.clone(), record)?;
        self.primary.send_watermark(key)?;
        observability::record_gate_release(self.name.as_str(), pending);
        Ok(ReleaseOutcome::Emitted)
    }

    /// Drop the record held under `key` without emitting it
    ///
    /// # Errors
    /// `MissingSnapshot` if nothing is held under `key`.
    pub fn discard(&self, key: &TimestampKey) -> Result<T, SyncError> {
        let mut state = self.state.lock();
        let record = state
            .pending
            .remove(key)
            .ok_or_else(|| SyncError::missing_snapshot(self.name.to_string(), key))?;
        state.stats.discarded += 1;
        let pending = state.pending.len();
        drop(state);

        debug!(gate = %self.name, key = %key, "pending record discarded");
        observability::record_gate_discard(self.name.as_str(), pending);
        Ok(record)
    }

    pub fn is_immediate(&self) -> bool {
        self.state.lock().immediate
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Held keys, oldest first
    pub fn pending_keys(&self) -> Vec<TimestampKey> {
        self.state.lock().pending.keys().cloned().collect()
    }

    pub fn stats(&self) -> GateStats {
        self.state.lock().stats
    }
}
