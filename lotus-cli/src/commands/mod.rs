pub mod candidates;
pub mod check_edits;
pub mod post;
pub mod status;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use lotus_compose::Composer;
use lotus_core::{config, store, Config};
use lotus_remote::MastodonClient;

/// Home directory and configuration with environment overrides applied.
pub fn load_config() -> Result<(PathBuf, Config)> {
    config::load().context("failed to load configuration")
}

/// Composer honouring template overrides in `<home>/.daily-lotus/templates/`.
pub fn composer(home: &Path, config: &Config) -> Result<Composer> {
    let dir = store::app_dir_at(home).join("templates");
    Composer::with_template_dir(Some(&dir), config.post.max_length)
        .context("failed to load message templates")
}

pub fn mastodon(config: &Config) -> Result<MastodonClient> {
    MastodonClient::from_config(
        &config.mastodon,
        config.mastodon_token(),
        &config.wikidata.user_agent,
    )
    .context("Mastodon is not configured (set MASTODON_API_BASE_URL and MASTODON_ACCESS_TOKEN)")
}
