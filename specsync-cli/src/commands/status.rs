//! `specsync status`: saved binding and last publish.

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use specsync_core::{persistence, SyncConfig, SyncState};

use super::GlobalArgs;

/// Arguments for `specsync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct StatusJson {
    configured: bool,
    source_url: Option<String>,
    collection_id: Option<String>,
    api_key: Option<String>,
    poll_interval_seconds: Option<u64>,
    fingerprint: Option<String>,
    last_sync_at: Option<String>,
    last_sync_age: String,
}

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "setting")]
    key: &'static str,
    #[tabled(rename = "value")]
    value: String,
}

impl StatusArgs {
    pub fn run(self, global: &GlobalArgs) -> Result<()> {
        let state_dir = global.state_dir()?;
        let config = persistence::load_config_at(&state_dir)
            .with_context(|| format!("failed to read config in {}", state_dir.display()))?;
        let state = persistence::load_state_at(&state_dir)
            .with_context(|| format!("failed to read state in {}", state_dir.display()))?;

        let report = build_report(config.as_ref(), state.as_ref());
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize status JSON")?
            );
            return Ok(());
        }

        print_table(&report);
        Ok(())
    }
}

fn build_report(config: Option<&SyncConfig>, state: Option<&SyncState>) -> StatusJson {
    let captured_at = state.and_then(|s| captured_at(s.captured_at_epoch_millis));
    StatusJson {
        configured: config.is_some(),
        source_url: config.map(|c| c.source_url.clone()),
        collection_id: config.and_then(|c| c.remote_artifact_id.as_ref().map(|id| id.0.clone())),
        api_key: config.map(|c| c.store_credential.masked()),
        poll_interval_seconds: config.map(|c| c.poll_interval_seconds),
        fingerprint: state.map(|s| s.fingerprint.0.clone()),
        last_sync_at: captured_at.map(|t| t.to_rfc3339()),
        last_sync_age: captured_at
            .map(format_datetime_age)
            .unwrap_or_else(|| "never".to_string()),
    }
}

fn print_table(report: &StatusJson) {
    println!("specsync v{}", env!("CARGO_PKG_VERSION"));
    if !report.configured {
        println!(
            "{} not configured. Run 'specsync config' first.",
            "!".yellow()
        );
        return;
    }

    let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());
    let rows = vec![
        StatusRow {
            key: "source",
            value: or_dash(&report.source_url),
        },
        StatusRow {
            key: "collection",
            value: report
                .collection_id
                .clone()
                .unwrap_or_else(|| "(created on first sync)".to_string()),
        },
        StatusRow {
            key: "api key",
            value: or_dash(&report.api_key),
        },
        StatusRow {
            key: "interval",
            value: report
                .poll_interval_seconds
                .map(|s| format!("{s}s"))
                .unwrap_or_else(|| "-".to_string()),
        },
        StatusRow {
            key: "fingerprint",
            value: report
                .fingerprint
                .as_deref()
                .map(|f| f.chars().take(12).collect())
                .unwrap_or_else(|| "-".to_string()),
        },
        StatusRow {
            key: "last sync",
            value: report.last_sync_age.clone(),
        },
    ];
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");

    if report.fingerprint.is_none() {
        println!("Run 'specsync sync' to publish the collection.");
    }
}

fn captured_at(epoch_millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(epoch_millis).single()
}

fn format_datetime_age(timestamp: DateTime<Utc>) -> String {
    let age = Utc::now()
        .signed_duration_since(timestamp)
        .num_seconds()
        .max(0) as u64;
    format_seconds(age)
}

fn format_seconds(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}
