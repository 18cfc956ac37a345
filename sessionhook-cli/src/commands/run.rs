//! Run command: feed captured fragments into the webhook client
//!
//! Fragments arrive as JSON lines, one per line:
//!
//! ```text
//! {"session_id":"s1","data":"QUI=","has_response":false}
//! {"session_id":"s1","data":"Q0Q=","has_response":true}
//! ```
//!
//! `data` is base64. At end of input (or Ctrl-C) queued deliveries are
//! flushed before the process exits.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use sessionhook_core::{Fragment, WebhookClient};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::config::{CliOverrides, ConfigLoader};

/// Arguments for the run command
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Webhook endpoint (overrides config files)
    #[arg(long)]
    pub url: Option<String>,

    /// Read fragments from this file instead of stdin
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Dispatch queue capacity, 0 for unbounded (overrides config files)
    #[arg(long)]
    pub queue_capacity: Option<usize>,
}

/// Counts of input lines by outcome
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub ingested: usize,
    pub skipped: usize,
}

/// Run the run command
pub async fn run(args: RunArgs) -> Result<()> {
    let overrides = CliOverrides {
        url: args.url.clone(),
        queue_capacity: args.queue_capacity,
    };
    let config = ConfigLoader::load_with_overrides(&overrides)?;
    config.validate()?;

    let client = WebhookClient::new(&config)?;

    let stats = match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;
            ingest_until_interrupted(&client, BufReader::new(file)).await?
        }
        None => ingest_until_interrupted(&client, BufReader::new(tokio::io::stdin())).await?,
    };

    info!(
        ingested = stats.ingested,
        skipped = stats.skipped,
        "Input finished, flushing deliveries"
    );
    client.shutdown().await;
    Ok(())
}

async fn ingest_until_interrupted<R>(client: &WebhookClient, reader: R) -> Result<IngestStats>
where
    R: AsyncBufRead + Unpin,
{
    tokio::select! {
        stats = ingest_lines(client, reader) => stats,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, flushing deliveries");
            Ok(IngestStats::default())
        }
    }
}

/// Ingest every JSON-lines fragment from `reader`
///
/// Blank lines are ignored; lines that fail to parse are logged and skipped.
pub async fn ingest_lines<R>(client: &WebhookClient, reader: R) -> Result<IngestStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = IngestStats::default();
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await.context("failed to read input")? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<Fragment>(line) {
            Ok(fragment) => {
                debug!(
                    session_id = %fragment.session_id,
                    bytes = fragment.data.len(),
                    has_response = fragment.has_response,
                    "Fragment read"
                );
                client.ingest(fragment).await;
                stats.ingested += 1;
            }
            Err(e) => {
                warn!("Failed to parse fragment on line {}: {}", line_no, e);
                stats.skipped += 1;
            }
        }
    }

    Ok(stats)
}
