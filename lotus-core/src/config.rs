//! YAML configuration at `<home>/.daily-lotus/config.yaml`.
//!
//! Every field has a default, so a missing file or a partial file is fine.
//! Secrets never live in the file: the Mastodon access token is read from
//! the environment variable named by `mastodon.access_token_env`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::store;

/// Environment variable overriding `mastodon.api_base_url`.
pub const MASTODON_BASE_URL_ENV: &str = "MASTODON_API_BASE_URL";

const DEFAULT_USER_AGENT: &str =
    "DailyLotusBot/0.1 (https://www.earthmetabolome.org/; contact@earthmetabolome.org)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub wikidata: WikidataConfig,
    pub mastodon: MastodonConfig,
    pub storage: StorageConfig,
    pub post: PostConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WikidataConfig {
    pub sparql_endpoint: String,
    /// MediaWiki action API (`api.php`).
    pub api_endpoint: String,
    /// Base of `Special:EntityData`; `<base>/<id>.json` is appended.
    pub entity_data_url: String,
    /// SPARQL endpoint federated in for reference (scholarly) labels.
    pub scholarly_sparql_endpoint: String,
    pub user_agent: String,
    /// Upper bound on revisions fetched per entity per check.
    pub revision_limit: usize,
    pub timeout_secs: u64,
}

impl Default for WikidataConfig {
    fn default() -> Self {
        Self {
            sparql_endpoint: "https://query.wikidata.org/sparql".to_owned(),
            api_endpoint: "https://www.wikidata.org/w/api.php".to_owned(),
            entity_data_url: "https://www.wikidata.org/wiki/Special:EntityData".to_owned(),
            scholarly_sparql_endpoint: "https://query-scholarly.wikidata.org/sparql".to_owned(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            revision_limit: 50,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MastodonConfig {
    pub api_base_url: Option<String>,
    pub access_token_env: String,
    pub timeout_secs: u64,
}

impl Default for MastodonConfig {
    fn default() -> Self {
        Self {
            api_base_url: None,
            access_token_env: "MASTODON_ACCESS_TOKEN".to_owned(),
            timeout_secs: 30,
        }
    }
}

/// Relative paths are resolved against `<home>/.daily-lotus/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub records_file: Option<PathBuf>,
    pub candidates_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostConfig {
    /// Character limit of the target instance.
    pub max_length: usize,
}

impl Default for PostConfig {
    fn default() -> Self {
        Self { max_length: 500 }
    }
}

impl Config {
    pub fn records_path(&self, home: &Path) -> PathBuf {
        resolve(home, self.storage.records_file.as_deref())
            .unwrap_or_else(|| store::records_path_at(home))
    }

    pub fn candidates_path(&self, home: &Path) -> PathBuf {
        resolve(home, self.storage.candidates_file.as_deref())
            .unwrap_or_else(|| store::candidates_path_at(home))
    }

    /// Apply overrides from `lookup` (the process environment in production).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(MASTODON_BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.mastodon.api_base_url = Some(url);
        }
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Mastodon access token from the configured environment variable.
    pub fn mastodon_token(&self) -> Option<String> {
        std::env::var(&self.mastodon.access_token_env)
            .ok()
            .filter(|v| !v.trim().is_empty())
    }
}

fn resolve(home: &Path, configured: Option<&Path>) -> Option<PathBuf> {
    let path = configured?;
    if path.is_absolute() {
        Some(path.to_path_buf())
    } else {
        Some(store::app_dir_at(home).join(path))
    }
}

/// `<home>/.daily-lotus/config.yaml`. Pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    store::app_dir_at(home).join("config.yaml")
}

/// Load the configuration under `home`; defaults when the file is absent.
///
/// Environment overrides are not applied here.
pub fn load_at(home: &Path) -> Result<Config, ConfigError> {
    let path = config_path_at(home);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Config::default()),
        Err(source) => return Err(ConfigError::Io { path, source }),
    };
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse { path, source })
}

/// The user's home directory.
pub fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

/// `load_at` convenience wrapper, with environment overrides applied.
pub fn load() -> Result<(PathBuf, Config), ConfigError> {
    let home = home()?;
    let mut config = load_at(&home)?;
    config.apply_env_overrides();
    Ok((home, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_when_file_missing() {
        let tmp = TempDir::new().unwrap();
        let config = load_at(tmp.path()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.wikidata.revision_limit, 50);
        assert_eq!(config.post.max_length, 500);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = config_path_at(tmp.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "wikidata:\n  revision_limit: 20\n").unwrap();

        let config = load_at(tmp.path()).unwrap();
        assert_eq!(config.wikidata.revision_limit, 20);
        assert_eq!(config.wikidata.timeout_secs, 10);
        assert_eq!(config.mastodon.access_token_env, "MASTODON_ACCESS_TOKEN");
    }

    #[test]
    fn malformed_file_reports_path() {
        let tmp = TempDir::new().unwrap();
        let path = config_path_at(tmp.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "wikidata: [unclosed").unwrap();

        let err = load_at(tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
        assert!(err.to_string().contains("config.yaml"));
    }

    #[test]
    fn relative_storage_paths_resolve_into_app_dir() {
        let home = Path::new("/home/bot");
        let mut config = Config::default();
        assert_eq!(
            config.records_path(home),
            PathBuf::from("/home/bot/.daily-lotus/records.json")
        );
        config.storage.records_file = Some(PathBuf::from("posted_log_extended.json"));
        config.storage.candidates_file = Some(PathBuf::from("/srv/candidates.json"));
        assert_eq!(
            config.records_path(home),
            PathBuf::from("/home/bot/.daily-lotus/posted_log_extended.json")
        );
        assert_eq!(
            config.candidates_path(home),
            PathBuf::from("/srv/candidates.json")
        );
    }

    #[test]
    fn base_url_override_ignores_blank_values() {
        let mut config = Config::default();
        config.apply_overrides(|_| Some("  ".to_owned()));
        assert_eq!(config.mastodon.api_base_url, None);
        config.apply_overrides(|key| {
            (key == MASTODON_BASE_URL_ENV).then(|| "https://botsin.space".to_owned())
        });
        assert_eq!(
            config.mastodon.api_base_url.as_deref(),
            Some("https://botsin.space")
        );
    }
}
