//! `daily-lotus candidates`: refresh the candidate cache.

use anyhow::{Context, Result};
use clap::Args;

use lotus_engine::refresh_candidates;
use lotus_remote::WikidataClient;

#[derive(Args, Debug)]
pub struct CandidatesArgs {}

impl CandidatesArgs {
    pub fn run(self) -> Result<()> {
        let (home, config) = super::load_config()?;
        let path = config.candidates_path(&home);
        let wikidata = WikidataClient::new(&config.wikidata);
        let count = refresh_candidates(&wikidata, &path).context("candidate refresh failed")?;
        println!("✓ cached {count} candidates at {}", path.display());
        Ok(())
    }
}
