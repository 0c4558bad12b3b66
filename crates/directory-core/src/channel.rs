//! The event transport seam.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use directory_schema::events::{InboundEvent, OutboundEvent};
use thiserror::Error;

/// Errors raised by channel implementations.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The transport failed.
    #[error("event channel error: {0}")]
    Transport(String),

    /// An outbound event could not be serialized.
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One inbound message as delivered by the transport, not yet decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Transport-assigned identifier used for acknowledgement.
    pub id: u64,
    /// Raw JSON payload.
    pub payload: Vec<u8>,
}

impl Delivery {
    /// Decodes the payload into an inbound event.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the payload is not a known event.
    pub fn decode(&self) -> Result<InboundEvent, serde_json::Error> {
        serde_json::from_slice(&self.payload)
    }
}

/// Publish/subscribe transport for publication events.
///
/// The pipeline acknowledges a delivery only after it was either applied and
/// confirmed, or dead-lettered. Redelivery of unacknowledged messages is the
/// transport's business.
#[async_trait]
pub trait EventChannel: Send + Sync {
    /// Next batch of inbound messages; an empty batch means the stream ended.
    async fn next_batch(&self) -> Result<Vec<Delivery>, ChannelError>;

    /// Emits a confirmation.
    async fn publish(&self, event: &OutboundEvent) -> Result<(), ChannelError>;

    /// Routes a message that cannot be processed to the error path.
    async fn dead_letter(&self, delivery: &Delivery, reason: &str) -> Result<(), ChannelError>;

    /// Marks a message as handled.
    async fn ack(&self, delivery: &Delivery) -> Result<(), ChannelError>;
}

#[derive(Debug, Default)]
struct MemoryChannelState {
    next_id: u64,
    inbound: VecDeque<Delivery>,
    published: Vec<OutboundEvent>,
    dead_letters: Vec<(Delivery, String)>,
    acked: Vec<u64>,
}

/// An [`EventChannel`] backed by in-process queues.
#[derive(Debug)]
pub struct MemoryChannel {
    batch_size: usize,
    state: Mutex<MemoryChannelState>,
}

impl Default for MemoryChannel {
    fn default() -> Self {
        Self::new(16)
    }
}

impl MemoryChannel {
    /// A channel delivering at most `batch_size` messages per batch.
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            state: Mutex::new(MemoryChannelState::default()),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryChannelState) -> T) -> Result<T, ChannelError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ChannelError::Transport("memory channel lock poisoned".into()))?;
        Ok(f(&mut state))
    }

    /// Enqueues a raw inbound payload and returns its delivery ID.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Transport`] if the channel state is poisoned.
    pub fn push_raw(&self, payload: impl Into<Vec<u8>>) -> Result<u64, ChannelError> {
        let payload = payload.into();
        self.with_state(|state| {
            let id = state.next_id;
            state.next_id += 1;
            state.inbound.push_back(Delivery { id, payload });
            id
        })
    }

    /// Enqueues an inbound event encoded as JSON.
    ///
    /// # Errors
    ///
    /// Returns a [`ChannelError`] if encoding fails or the state is poisoned.
    pub fn push(&self, event: &InboundEvent) -> Result<u64, ChannelError> {
        self.push_raw(serde_json::to_vec(event)?)
    }

    /// Confirmations published so far.
    pub fn published(&self) -> Vec<OutboundEvent> {
        self.with_state(|state| state.published.clone())
            .unwrap_or_default()
    }

    /// Dead-lettered deliveries with their reasons.
    pub fn dead_letters(&self) -> Vec<(Delivery, String)> {
        self.with_state(|state| state.dead_letters.clone())
            .unwrap_or_default()
    }

    /// IDs of acknowledged deliveries, in acknowledgement order.
    pub fn acked(&self) -> Vec<u64> {
        self.with_state(|state| state.acked.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventChannel for MemoryChannel {
    async fn next_batch(&self) -> Result<Vec<Delivery>, ChannelError> {
        let batch_size = self.batch_size;
        self.with_state(|state| {
            let take = state.inbound.len().min(batch_size);
            state.inbound.drain(..take).collect()
        })
    }

    async fn publish(&self, event: &OutboundEvent) -> Result<(), ChannelError> {
        let event = event.clone();
        self.with_state(|state| state.published.push(event))
    }

    async fn dead_letter(&self, delivery: &Delivery, reason: &str) -> Result<(), ChannelError> {
        let entry = (delivery.clone(), reason.to_string());
        self.with_state(|state| state.dead_letters.push(entry))
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), ChannelError> {
        let id = delivery.id;
        self.with_state(|state| state.acked.push(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_batches_respect_size() {
        let channel = MemoryChannel::new(2);
        for i in 0..5 {
            channel.push_raw(format!("{{\"n\":{i}}}")).unwrap();
        }
        assert_eq!(channel.next_batch().await.unwrap().len(), 2);
        assert_eq!(channel.next_batch().await.unwrap().len(), 2);
        let last = channel.next_batch().await.unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].id, 4);
        assert!(channel.next_batch().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload_fails_to_decode() {
        let channel = MemoryChannel::default();
        channel.push_raw("not json").unwrap();
        let batch = channel.next_batch().await.unwrap();
        assert!(batch[0].decode().is_err());
    }
}
