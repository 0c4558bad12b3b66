//! Ingestion commands

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use directory_schema::events::InboundEvent;
use tokio::io::{AsyncRead, AsyncWrite};

use super::context::Context;
use crate::JsonLinesChannel;

async fn open_input(path: &Path) -> Result<Box<dyn AsyncRead + Send + Unpin>> {
    if path == Path::new("-") {
        return Ok(Box::new(tokio::io::stdin()));
    }
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(Box::new(file))
}

async fn open_output(
    path: Option<&Path>,
    fallback: Box<dyn AsyncWrite + Send + Unpin>,
) -> Result<Box<dyn AsyncWrite + Send + Unpin>> {
    match path {
        Some(path) => {
            let file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Ok(Box::new(file))
        }
        None => Ok(fallback),
    }
}

/// Consume a JSON Lines stream of publication events until it ends
pub async fn consume(
    ctx: &Context,
    input: &Path,
    confirmations: Option<&Path>,
    dead_letters: Option<&Path>,
    batch_size: usize,
) -> Result<()> {
    let channel = JsonLinesChannel::new(
        open_input(input).await?,
        open_output(confirmations, Box::new(tokio::io::stdout())).await?,
        open_output(dead_letters, Box::new(tokio::io::stderr())).await?,
        batch_size,
    );
    let report = ctx
        .pipeline(Arc::new(channel))
        .run()
        .await
        .context("Event consumption stopped")?;

    tracing::info!(
        published = report.published,
        rejected = report.rejected,
        "consumed event stream"
    );
    Ok(())
}

/// Publish one event read from a JSON file
pub async fn publish(ctx: &Context, path: &Path, json: bool) -> Result<()> {
    let source = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let event: InboundEvent = serde_json::from_slice(&source)
        .with_context(|| format!("{} is not a publication event", path.display()))?;

    let confirmations: Box<dyn AsyncWrite + Send + Unpin> = if json {
        Box::new(tokio::io::stdout())
    } else {
        Box::new(tokio::io::sink())
    };
    let channel = JsonLinesChannel::new(
        Box::new(tokio::io::empty()),
        confirmations,
        Box::new(tokio::io::stderr()),
        1,
    );
    let confirmation = ctx
        .pipeline(Arc::new(channel))
        .publish(&event)
        .await
        .context("Failed to publish event")?;

    if !json {
        println!("Published {}", confirmation.app_id());
    }
    Ok(())
}
