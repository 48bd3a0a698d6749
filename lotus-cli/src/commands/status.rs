//! `daily-lotus status`: tracked records at a glance.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use lotus_core::{store, TrackedRecord};

/// Arguments for `daily-lotus status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let (home, config) = super::load_config()?;
        let path = config.records_path(&home);
        let records = store::load_from(&path)
            .with_context(|| format!("failed to load records from {}", path.display()))?;

        let now = Utc::now();
        if self.json {
            print_json(&records, now)?;
        } else {
            print_table(&records, now);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelationState {
    Present,
    Removed,
    /// Never checked since publication.
    Unchecked,
}

impl RelationState {
    fn of(record: &TrackedRecord) -> Self {
        match record.relation_present_last_checked {
            Some(true) => Self::Present,
            Some(false) => Self::Removed,
            None => Self::Unchecked,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Removed => "removed",
            Self::Unchecked => "unchecked",
        }
    }

    fn indicator(self) -> String {
        match self {
            Self::Present => "■".green().bold().to_string(),
            Self::Removed => "■".red().bold().to_string(),
            Self::Unchecked => "■".bright_black().bold().to_string(),
        }
    }
}

#[derive(Serialize)]
struct StatusJson {
    summary: SummaryJson,
    records: Vec<RecordJson>,
}

#[derive(Serialize)]
struct SummaryJson {
    records: usize,
    tracked: usize,
    removed: usize,
}

#[derive(Serialize)]
struct RecordJson {
    compound_id: String,
    compound: String,
    taxon_id: String,
    taxon: String,
    publication_id: Option<String>,
    relation: &'static str,
    published_at: String,
    last_reply_at: Option<String>,
    last_reply_age: String,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "")]
    indicator: String,
    #[tabled(rename = "compound")]
    compound: String,
    #[tabled(rename = "taxon")]
    taxon: String,
    #[tabled(rename = "posted")]
    posted: String,
    #[tabled(rename = "last reply")]
    last_reply: String,
}

fn removed_count(records: &[TrackedRecord]) -> usize {
    records
        .iter()
        .filter(|r| RelationState::of(r) == RelationState::Removed)
        .count()
}

fn print_json(records: &[TrackedRecord], now: DateTime<Utc>) -> Result<()> {
    let payload = StatusJson {
        summary: SummaryJson {
            records: records.len(),
            tracked: records.iter().filter(|r| r.is_eligible()).count(),
            removed: removed_count(records),
        },
        records: records
            .iter()
            .map(|r| RecordJson {
                compound_id: r.compound_id.to_string(),
                compound: r.compound_label.clone(),
                taxon_id: r.taxon_id.to_string(),
                taxon: r.taxon_label.clone(),
                publication_id: r.publication_id.as_ref().map(|id| id.to_string()),
                relation: RelationState::of(r).key(),
                published_at: r.published_at.to_rfc3339(),
                last_reply_at: r.last_reply_at.map(|t| t.to_rfc3339()),
                last_reply_age: reply_age(r, now),
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(records: &[TrackedRecord], now: DateTime<Utc>) {
    println!(
        "Daily LOTUS v{} | {} records | {} removed",
        env!("CARGO_PKG_VERSION"),
        records.len(),
        removed_count(records),
    );

    if records.is_empty() {
        println!("No tracked records. Run `daily-lotus post` first.");
        return;
    }

    println!(
        "Indicators: {} PRESENT  {} REMOVED  {} UNCHECKED",
        RelationState::Present.indicator(),
        RelationState::Removed.indicator(),
        RelationState::Unchecked.indicator(),
    );
    let rows: Vec<StatusTableRow> = records
        .iter()
        .map(|r| StatusTableRow {
            indicator: RelationState::of(r).indicator(),
            compound: format!("{} ({})", r.compound_label, r.compound_id),
            taxon: format!("{} ({})", r.taxon_label, r.taxon_id),
            posted: if r.is_eligible() {
                format_age(now, r.published_at)
            } else {
                "not published".to_owned()
            },
            last_reply: reply_age(r, now),
        })
        .collect();
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
}

fn reply_age(record: &TrackedRecord, now: DateTime<Utc>) -> String {
    record
        .last_reply_at
        .map(|at| format_age(now, at))
        .unwrap_or_else(|| "never".to_owned())
}

fn format_age(now: DateTime<Utc>, then: DateTime<Utc>) -> String {
    let seconds = now.signed_duration_since(then).num_seconds().max(0);
    if seconds < 60 {
        return format!("{seconds}s ago");
    }
    if seconds < 60 * 60 {
        return format!("{}m ago", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h ago", seconds / (60 * 60));
    }
    format!("{}d ago", seconds / (60 * 60 * 24))
}
