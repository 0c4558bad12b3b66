//! directory - App directory CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use directory_cli::cmd;
use directory_cli::cmd::context::Context;
use directory_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries responses and confirmations
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = Context::open(
        cli.config.as_deref(),
        cli.database.as_deref(),
        cli.artifacts_base_url.as_deref(),
    )?;
    let json = cli.json;

    match cli.command {
        Commands::Consume {
            input,
            confirmations,
            dead_letters,
            batch_size,
        } => {
            cmd::ingest::consume(
                &ctx,
                &input,
                confirmations.as_deref(),
                dead_letters.as_deref(),
                batch_size,
            )
            .await
        }
        Commands::Publish { event } => cmd::ingest::publish(&ctx, &event, json).await,
        Commands::Listing { app_id, query } => cmd::query::listing(&ctx, app_id, &query, json).await,
        Commands::List {
            page_size,
            skip,
            page_token,
            full,
            query,
        } => {
            let page = cmd::query::PageArgs {
                page_size,
                skip,
                page_token,
                full,
            };
            cmd::query::list(&ctx, page, &query, json).await
        }
        Commands::DownloadInfo {
            app_id,
            base_version_code,
            query,
        } => cmd::query::download_info(&ctx, app_id, base_version_code, &query, json).await,
        Commands::UpdateInfo {
            app_id,
            base_version_code,
            query,
        } => cmd::query::update_info(&ctx, app_id, base_version_code, &query, json).await,
        Commands::Stats => cmd::stats::stats(&ctx, json).await,
    }
}
