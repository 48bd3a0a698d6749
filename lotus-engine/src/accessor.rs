//! Capabilities the engine needs from the outside world.
//!
//! The engine never talks to the network itself. Live knowledge-base state,
//! revision history, candidate discovery and publishing are all reached
//! through the traits here, so a sweep can run against an in-memory fake
//! as easily as against the real services.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use lotus_core::types::{EntityId, LiveLabels, MoleculeDetails, PublicationId, RevisionDescriptor};

use crate::AccessorError;

/// Current state of the knowledge base.
pub trait LiveState {
    /// Whether `compound` currently carries a found-in-taxon claim for `taxon`.
    fn relation_holds(&self, compound: &EntityId, taxon: &EntityId) -> Result<bool, AccessorError>;

    /// Current English labels. A missing label is returned as `""`.
    fn labels(
        &self,
        compound: &EntityId,
        taxon: &EntityId,
        reference: &EntityId,
    ) -> Result<LiveLabels, AccessorError>;
}

/// The part of an entity the attribution walk compares between revisions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitySnapshot {
    pub label: Option<String>,
    /// Targets of the entity's found-in-taxon claims.
    pub relation_targets: BTreeSet<EntityId>,
}

impl EntitySnapshot {
    pub fn label_or_empty(&self) -> &str {
        self.label.as_deref().unwrap_or("")
    }
}

/// Revision history of individual entities.
pub trait RevisionSource {
    /// Revisions strictly newer than `since`, oldest first, at most `limit`.
    fn revisions_since(
        &self,
        entity: &EntityId,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<RevisionDescriptor>, AccessorError>;

    /// The latest revision at or before `since`, i.e. the state the tracked
    /// values were captured from.
    fn baseline_revision(
        &self,
        _entity: &EntityId,
        _since: DateTime<Utc>,
    ) -> Result<Option<RevisionDescriptor>, AccessorError> {
        Ok(None)
    }

    fn snapshot_at(&self, entity: &EntityId, revision_id: u64)
        -> Result<EntitySnapshot, AccessorError>;
}

/// Discovery of occurrences worth posting about.
pub trait CandidateSource {
    /// Compound ids that have at least one found-in-taxon claim.
    fn candidate_ids(&self) -> Result<Vec<EntityId>, AccessorError>;

    /// Every (taxon, reference) occurrence known for `compound`.
    fn molecule_details(&self, compound: &EntityId) -> Result<Vec<MoleculeDetails>, AccessorError>;
}

/// An image to attach, fetched by the publisher from `url`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Media {
    pub url: String,
    pub alt_text: String,
}

/// A message to publish, optionally as a reply and with attached images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub text: String,
    pub reply_to: Option<PublicationId>,
    pub media: Vec<Media>,
}

pub trait Publisher {
    fn publish(&self, post: &Post) -> Result<PublicationId, AccessorError>;
}
