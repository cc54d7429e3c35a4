//! Buckets command - list buckets and their entries

use crate::cli::args::{BucketsAction, BucketsArgs, OutputFormat};
use crate::config::Config;
use crate::error::{SwError, SwResult};
use crate::policy::CacheVersion;
use crate::runtime::{create_runtime, NetworkMode};
use crate::store::{CacheStore, CachedEntry};
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;

/// One row of `buckets list`
#[derive(Debug, Serialize)]
struct BucketSummary {
    name: String,
    entries: usize,
    bytes: usize,
    current: bool,
}

/// One row of `buckets show`
#[derive(Debug, Serialize)]
struct EntrySummary {
    url: String,
    status: u16,
    kind: String,
    content_type: Option<String>,
    bytes: usize,
    stored_at: String,
}

impl From<&CachedEntry> for EntrySummary {
    fn from(entry: &CachedEntry) -> Self {
        Self {
            url: entry.key.url.clone(),
            status: entry.response.status,
            kind: entry.response.kind.to_string(),
            content_type: entry.response.content_type().map(str::to_string),
            bytes: entry.response.body.len(),
            stored_at: entry.stored_at.to_rfc3339(),
        }
    }
}

/// Execute the buckets command
pub async fn execute(args: BucketsArgs, config: &Config) -> SwResult<()> {
    let runtime = create_runtime(config, NetworkMode::Offline)?;
    let store = runtime.store.as_ref();
    let version = runtime.controller.version();

    match args.action {
        BucketsAction::List { format } => list(store, version, format).await,
        BucketsAction::Show { bucket, format } => show(store, &bucket, format).await,
    }
}

async fn list(store: &dyn CacheStore, version: &CacheVersion, format: OutputFormat) -> SwResult<()> {
    let mut rows = Vec::new();
    for name in store.keys().await? {
        let entries = store.entries(&name).await?;
        rows.push(BucketSummary {
            current: version.owns(&name),
            bytes: entries.iter().map(|e| e.response.body.len()).sum(),
            entries: entries.len(),
            name,
        });
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Plain => {
            for row in &rows {
                println!("{}", row.name);
            }
        }
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            if rows.is_empty() {
                ui::step_info(&ctx, "No cache buckets");
                return Ok(());
            }
            println!(
                "{:<32} {:>8} {:>12} {:<8}",
                style("BUCKET").bold(),
                style("ENTRIES").bold(),
                style("BYTES").bold(),
                style("STATE").bold()
            );
            println!("{}", "-".repeat(63));
            for row in &rows {
                let state = if row.current {
                    style("current").green()
                } else {
                    style("stale").yellow()
                };
                println!(
                    "{:<32} {:>8} {:>12} {:<8}",
                    row.name, row.entries, row.bytes, state
                );
            }
        }
    }

    Ok(())
}

async fn show(store: &dyn CacheStore, bucket: &str, format: OutputFormat) -> SwResult<()> {
    if !store.has(bucket).await? {
        return Err(SwError::User(format!("No bucket named {}", bucket)));
    }

    let rows: Vec<EntrySummary> = store
        .entries(bucket)
        .await?
        .iter()
        .map(EntrySummary::from)
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Plain => {
            for row in &rows {
                println!("{}", row.url);
            }
        }
        OutputFormat::Table => {
            let ctx = UiContext::detect();
            ui::intro(&ctx, bucket);
            if rows.is_empty() {
                ui::step_info(&ctx, "Bucket is empty");
                return Ok(());
            }
            println!(
                "{:<6} {:<7} {:>10}  {:<25} {}",
                style("STATUS").bold(),
                style("TYPE").bold(),
                style("BYTES").bold(),
                style("STORED").bold(),
                style("URL").bold()
            );
            for row in &rows {
                println!(
                    "{:<6} {:<7} {:>10}  {:<25} {}",
                    row.status,
                    row.kind,
                    row.bytes,
                    row.stored_at.get(..19).unwrap_or(&row.stored_at),
                    row.url
                );
            }
        }
    }

    Ok(())
}
