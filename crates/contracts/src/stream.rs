//! Dataflow streams - timestamped messages between operators
//!
//! A stream carries data messages and watermarks. A watermark for a key
//! promises that no further data for that key follows on the stream.

use async_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};

use crate::{ContractError, StreamId, TimestampKey};

/// Message travelling on a stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage<T> {
    /// Payload for a logical timestamp
    Data { key: TimestampKey, payload: T },
    /// Completion signal for a logical timestamp
    Watermark(TimestampKey),
}

impl<T> StreamMessage<T> {
    /// Key the message refers to
    pub fn key(&self) -> &TimestampKey {
        match self {
            Self::Data { key, .. } => key,
            Self::Watermark(key) => key,
        }
    }

    /// Whether this message is a watermark
    pub fn is_watermark(&self) -> bool {
        matches!(self, Self::Watermark(_))
    }

    /// Consume the message, returning the payload of a data message
    pub fn into_payload(self) -> Option<T> {
        match self {
            Self::Data { payload, .. } => Some(payload),
            Self::Watermark(_) => None,
        }
    }
}

/// Downstream write side of a stream
///
/// Sends never block: a full or closed stream is reported as an error.
pub trait StreamWriter<T>: Send + Sync {
    /// Stream name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Send one message downstream
    ///
    /// # Errors
    /// `StreamFull` or `StreamClosed`
    fn send(&self, message: StreamMessage<T>) -> Result<(), ContractError>;

    /// Send a data message
    fn send_data(&self, key: TimestampKey, payload: T) -> Result<(), ContractError> {
        self.send(StreamMessage::Data { key, payload })
    }

    /// Send a watermark
    fn send_watermark(&self, key: TimestampKey) -> Result<(), ContractError> {
        self.send(StreamMessage::Watermark(key))
    }
}

/// Channel-backed stream writer
#[derive(Debug)]
pub struct WriteStream<T> {
    name: StreamId,
    tx: Sender<StreamMessage<T>>,
}

impl<T> Clone for WriteStream<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            tx: self.tx.clone(),
        }
    }
}

impl<T: Send> StreamWriter<T> for WriteStream<T> {
    fn name(&self) -> &str {
        self.name.as_str()
    }

    fn send(&self, message: StreamMessage<T>) -> Result<(), ContractError> {
        self.tx.try_send(message).map_err(|e| match e {
            TrySendError::Full(_) => {
                ContractError::stream_full(self.name.as_str(), self.tx.capacity().unwrap_or(0))
            }
            TrySendError::Closed(_) => ContractError::stream_closed(self.name.as_str()),
        })
    }
}

/// Channel-backed stream reader
#[derive(Debug)]
pub struct ReadStream<T> {
    name: StreamId,
    rx: Receiver<StreamMessage<T>>,
}

impl<T> ReadStream<T> {
    /// Stream name
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Receive the next message without waiting
    pub fn try_recv(&self) -> Option<StreamMessage<T>> {
        match self.rx.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => None,
        }
    }

    /// Wait for the next message; `None` once every writer is dropped
    pub async fn recv(&self) -> Option<StreamMessage<T>> {
        self.rx.recv().await.ok()
    }

    /// Drain every message currently queued
    pub fn drain(&self) -> Vec<StreamMessage<T>> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Number of queued messages
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether no message is queued
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Create a bounded stream, returning its write and read halves
pub fn stream<T>(name: impl Into<StreamId>, capacity: usize) -> (WriteStream<T>, ReadStream<T>) {
    let name = name.into();
    let (tx, rx) = bounded(capacity.max(1));
    (
        WriteStream {
            name: name.clone(),
            tx,
        },
        ReadStream { name, rx },
    )
}
