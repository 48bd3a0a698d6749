//! The daily occurrence post and its candidate cache.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use lotus_compose::{ComposeError, Composer};
use lotus_core::store::{atomic_write, contains_occurrence, RecordStore};
use lotus_core::types::{EntityId, MoleculeDetails, TrackedRecord};

use crate::accessor::{CandidateSource, Media, Post, Publisher};
use crate::error::io_err;
use crate::EngineError;

#[derive(Debug, Clone)]
pub struct DailyOptions {
    pub dry_run: bool,
    /// Read candidate ids from `cache_path` instead of querying.
    pub use_cache: bool,
    pub cache_path: PathBuf,
}

#[derive(Debug, Clone)]
pub enum DailyOutcome {
    Posted { record: TrackedRecord, text: String },
    /// What would have been posted.
    DryRun {
        details: MoleculeDetails,
        text: String,
        media: Vec<Media>,
    },
    /// Every candidate was already posted or could not be composed.
    Exhausted,
}

pub fn load_candidates(path: &Path) -> Result<Vec<EntityId>, EngineError> {
    let raw = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    serde_json::from_str(&raw).map_err(|source| EngineError::CandidateCache {
        path: path.to_path_buf(),
        source,
    })
}

pub fn save_candidates(path: &Path, ids: &[EntityId]) -> Result<(), EngineError> {
    let json = serde_json::to_string_pretty(ids).map_err(|source| EngineError::CandidateCache {
        path: path.to_path_buf(),
        source,
    })?;
    atomic_write(path, &json)?;
    Ok(())
}

/// Images for a daily post: the 2D depiction, then the taxon picture.
/// Empty URLs are left out.
pub fn attachments(details: &MoleculeDetails) -> Vec<Media> {
    let structure = Media {
        url: details.image_url.clone(),
        alt_text: format!("2D structure of {} displaying molecular bonds.", details.compound),
    };
    let taxon = Media {
        url: details.taxon_image_url.clone(),
        alt_text: format!(
            "Image of {}, the taxon in which the compound is found.",
            details.taxon
        ),
    };
    [structure, taxon]
        .into_iter()
        .filter(|media| !media.url.is_empty())
        .collect()
}

/// Query the candidate list and write it to the cache. Returns the count.
pub fn refresh_candidates(source: &dyn CandidateSource, path: &Path) -> Result<usize, EngineError> {
    let ids = source.candidate_ids().map_err(EngineError::Candidates)?;
    save_candidates(path, &ids)?;
    tracing::info!("cached {} candidates at {}", ids.len(), path.display());
    Ok(ids.len())
}

/// Pick a random occurrence that has not been posted yet, compose it and
/// publish it.
///
/// Candidates are tried in random order. A candidate is passed over when its
/// details cannot be fetched, when that occurrence is already in the log, or
/// when no variant of the post fits the length limit. The structure and taxon
/// images go along as attachments. On success the new record is appended to
/// `store`; a dry run touches nothing.
pub fn post_daily<R: Rng + ?Sized>(
    source: &dyn CandidateSource,
    store: &dyn RecordStore,
    composer: &Composer,
    publisher: Option<&dyn Publisher>,
    options: &DailyOptions,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Result<DailyOutcome, EngineError> {
    if publisher.is_none() && !options.dry_run {
        return Err(EngineError::PublisherRequired);
    }

    let mut ids = if options.use_cache {
        load_candidates(&options.cache_path)?
    } else {
        source.candidate_ids().map_err(EngineError::Candidates)?
    };
    ids.shuffle(rng);
    let mut records = store.load_all()?;

    for id in ids {
        let rows = match source.molecule_details(&id) {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(compound = %id, "details lookup failed: {err}");
                continue;
            }
        };
        let Some(details) = rows.choose(rng).cloned() else {
            tracing::debug!(compound = %id, "no occurrence rows");
            continue;
        };
        if contains_occurrence(&records, &details.compound_id, &details.taxon_id) {
            tracing::debug!(compound = %id, taxon = %details.taxon_id, "already posted");
            continue;
        }

        let text = match composer.occurrence_post(&details) {
            Ok(text) => text,
            Err(ComposeError::MessageTooLong { length, limit }) => {
                tracing::info!(compound = %id, length, limit, "post too long; trying another");
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        let media = attachments(&details);
        let Some(publisher) = publisher.filter(|_| !options.dry_run) else {
            tracing::info!(compound = %id, images = media.len(), "[dry-run] would post:\n{text}");
            return Ok(DailyOutcome::DryRun {
                details,
                text,
                media,
            });
        };

        let post = Post {
            text: text.clone(),
            reply_to: None,
            media,
        };
        let publication = publisher.publish(&post).map_err(EngineError::Publish)?;
        tracing::info!(compound = %id, publication = %publication, "posted");

        let record = TrackedRecord::published(&details, Some(publication), now);
        records.push(record.clone());
        store.save_all(&records)?;
        return Ok(DailyOutcome::Posted { record, text });
    }

    tracing::warn!("no unposted candidate could be composed");
    Ok(DailyOutcome::Exhausted)
}
