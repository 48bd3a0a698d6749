//! `daily-lotus check-edits`: reconcile published occurrences with Wikidata.

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Args;
use colored::Colorize;

use lotus_core::{store, JsonRecordStore};
use lotus_engine::{check_edits, Publisher, Reconciler, SweepOptions, SweepReport};
use lotus_remote::WikidataClient;

#[derive(Args, Debug)]
pub struct CheckEditsArgs {
    /// Print replies instead of publishing them. Updated records are written
    /// next to the log as `records.dryrun.json`.
    #[arg(long)]
    pub dry_run: bool,
}

impl CheckEditsArgs {
    pub fn run(self) -> Result<()> {
        let (home, config) = super::load_config()?;
        let composer = super::composer(&home, &config)?;
        let records_path = config.records_path(&home);
        let mut log = JsonRecordStore::new(&records_path);
        if self.dry_run {
            log = log.with_save_path(store::dry_run_path(&records_path));
        }
        let mastodon = if self.dry_run {
            None
        } else {
            Some(super::mastodon(&config)?)
        };

        let wikidata = WikidataClient::new(&config.wikidata);
        let reconciler =
            Reconciler::new(&wikidata, &wikidata, &wikidata, config.wikidata.revision_limit);
        let report = check_edits(
            &log,
            &reconciler,
            &composer,
            mastodon.as_ref().map(|client| client as &dyn Publisher),
            SweepOptions {
                dry_run: self.dry_run,
            },
            Utc::now(),
        )
        .with_context(|| format!("edit check failed for {}", records_path.display()))?;

        print_report(&report, self.dry_run);
        if self.dry_run && report.saved {
            println!("[dry-run] updated records written to {}", log.save_path().display());
        }
        if !report.failures.is_empty() {
            bail!("{} record(s) could not be checked", report.failures.len());
        }
        Ok(())
    }
}

fn print_report(report: &SweepReport, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    for reply in &report.replies {
        println!("{prefix}{} {} in {}", "↳".cyan(), reply.compound, reply.taxon);
        if dry_run {
            println!("{}\n", reply.text);
        }
    }
    for failure in &report.failures {
        println!(
            "{} {} in {}: {}",
            "✗".red(),
            failure.compound,
            failure.taxon,
            failure.error
        );
    }
    println!(
        "{prefix}✓ checked {} ({} unchanged, {} restored, {} replied, {} skipped, {} failed)",
        report.checked,
        report.unchanged,
        report.restored,
        report.replies.len(),
        report.skipped,
        report.failures.len(),
    );
}
