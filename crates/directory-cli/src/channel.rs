//! JSON Lines event channel
//!
//! Reads one inbound event per line and writes confirmations and dead
//! letters as JSON lines. Blank lines are skipped.

use std::fmt;

use async_trait::async_trait;
use directory_core::channel::{ChannelError, Delivery, EventChannel};
use directory_schema::events::OutboundEvent;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::sync::Mutex;

type Reader = Lines<BufReader<Box<dyn AsyncRead + Send + Unpin>>>;
type Writer = Box<dyn AsyncWrite + Send + Unpin>;

struct Inbound {
    lines: Reader,
    next_id: u64,
}

#[derive(Serialize)]
struct DeadLetter<'a> {
    id: u64,
    reason: &'a str,
    payload: &'a str,
}

/// An [`EventChannel`] over line-delimited JSON streams.
pub struct JsonLinesChannel {
    batch_size: usize,
    inbound: Mutex<Inbound>,
    confirmations: Mutex<Writer>,
    dead_letters: Mutex<Writer>,
}

impl fmt::Debug for JsonLinesChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonLinesChannel")
            .field("batch_size", &self.batch_size)
            .finish_non_exhaustive()
    }
}

fn transport(err: std::io::Error) -> ChannelError {
    ChannelError::Transport(err.to_string())
}

impl JsonLinesChannel {
    /// Reads events from `input` in batches of at most `batch_size` lines
    pub fn new(
        input: Box<dyn AsyncRead + Send + Unpin>,
        confirmations: Writer,
        dead_letters: Writer,
        batch_size: usize,
    ) -> Self {
        Self {
            batch_size: batch_size.max(1),
            inbound: Mutex::new(Inbound {
                lines: BufReader::new(input).lines(),
                next_id: 0,
            }),
            confirmations: Mutex::new(confirmations),
            dead_letters: Mutex::new(dead_letters),
        }
    }

    async fn write_line(writer: &Mutex<Writer>, line: &str) -> Result<(), ChannelError> {
        let mut writer = writer.lock().await;
        writer.write_all(line.as_bytes()).await.map_err(transport)?;
        writer.write_all(b"\n").await.map_err(transport)?;
        writer.flush().await.map_err(transport)
    }
}

#[async_trait]
impl EventChannel for JsonLinesChannel {
    async fn next_batch(&self) -> Result<Vec<Delivery>, ChannelError> {
        let mut inbound = self.inbound.lock().await;
        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            let Some(line) = inbound.lines.next_line().await.map_err(transport)? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            let id = inbound.next_id;
            inbound.next_id += 1;
            batch.push(Delivery {
                id,
                payload: line.into_bytes(),
            });
        }
        Ok(batch)
    }

    async fn publish(&self, event: &OutboundEvent) -> Result<(), ChannelError> {
        Self::write_line(&self.confirmations, &serde_json::to_string(event)?).await
    }

    async fn dead_letter(&self, delivery: &Delivery, reason: &str) -> Result<(), ChannelError> {
        let payload = String::from_utf8_lossy(&delivery.payload);
        let line = serde_json::to_string(&DeadLetter {
            id: delivery.id,
            reason,
            payload: &payload,
        })?;
        Self::write_line(&self.dead_letters, &line).await
    }

    async fn ack(&self, delivery: &Delivery) -> Result<(), ChannelError> {
        // Lines are consumed as read; there is nothing to redeliver.
        tracing::trace!(delivery = delivery.id, "acknowledged");
        Ok(())
    }
}
