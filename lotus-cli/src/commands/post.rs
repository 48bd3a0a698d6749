//! `daily-lotus post`: publish today's occurrence.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;

use lotus_core::JsonRecordStore;
use lotus_engine::{post_daily, DailyOptions, DailyOutcome, Publisher};
use lotus_remote::WikidataClient;

#[derive(Args, Debug)]
pub struct PostArgs {
    /// Compose the post and print it without publishing or recording it.
    #[arg(long)]
    pub dry_run: bool,

    /// Take candidates from the local cache instead of querying Wikidata.
    #[arg(long)]
    pub use_cache: bool,
}

impl PostArgs {
    pub fn run(self) -> Result<()> {
        let (home, config) = super::load_config()?;
        let composer = super::composer(&home, &config)?;
        let store = JsonRecordStore::new(config.records_path(&home));
        let wikidata = WikidataClient::new(&config.wikidata);
        let mastodon = if self.dry_run {
            None
        } else {
            Some(super::mastodon(&config)?)
        };
        let options = DailyOptions {
            dry_run: self.dry_run,
            use_cache: self.use_cache,
            cache_path: config.candidates_path(&home),
        };

        let outcome = post_daily(
            &wikidata,
            &store,
            &composer,
            mastodon.as_ref().map(|client| client as &dyn Publisher),
            &options,
            &mut rand::thread_rng(),
            Utc::now(),
        )
        .context("daily post failed")?;

        match outcome {
            DailyOutcome::Posted { record, text } => {
                println!("{text}\n");
                println!(
                    "✓ posted {} in {} ({})",
                    record.compound_label,
                    record.taxon_label,
                    record
                        .publication_id
                        .as_ref()
                        .map(|id| id.as_str())
                        .unwrap_or("no id"),
                );
            }
            DailyOutcome::DryRun { text, media, .. } => {
                println!("[dry-run] would post:\n\n{text}\n");
                for image in &media {
                    println!("🖼 {}", image.url);
                    println!("  alt: {}", image.alt_text);
                }
            }
            DailyOutcome::Exhausted => {
                println!("No unposted occurrence could be composed.");
            }
        }
        Ok(())
    }
}
