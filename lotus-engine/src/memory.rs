//! In-memory implementations of the accessor traits.
//!
//! [`MemoryKnowledgeBase`] holds live state, revision histories and candidate
//! rows; [`MemoryPublisher`] collects posts. Both count the calls made to
//! them so tests can assert on the traffic.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};

use lotus_core::types::{EntityId, LiveLabels, MoleculeDetails, PublicationId, RevisionDescriptor};

use crate::accessor::{CandidateSource, EntitySnapshot, LiveState, Post, Publisher, RevisionSource};
use crate::AccessorError;

const ENDPOINT: &str = "memory";

#[derive(Debug, Default)]
pub struct MemoryKnowledgeBase {
    relations: BTreeSet<(EntityId, EntityId)>,
    labels: HashMap<EntityId, String>,
    history: HashMap<EntityId, Vec<(RevisionDescriptor, EntitySnapshot)>>,
    unavailable: BTreeSet<EntityId>,
    candidates: Vec<EntityId>,
    details: HashMap<EntityId, Vec<MoleculeDetails>>,
    snapshot_fetches: Cell<usize>,
}

impl MemoryKnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_relation(&mut self, compound: &str, taxon: &str, holds: bool) {
        let key = (EntityId::from(compound), EntityId::from(taxon));
        if holds {
            self.relations.insert(key);
        } else {
            self.relations.remove(&key);
        }
    }

    pub fn set_label(&mut self, entity: &str, label: &str) {
        self.labels.insert(EntityId::from(entity), label.to_owned());
    }

    pub fn remove_label(&mut self, entity: &str) {
        self.labels.remove(&EntityId::from(entity));
    }

    /// Append a revision to `entity`'s history.
    pub fn push_revision(
        &mut self,
        entity: &str,
        revision_id: u64,
        timestamp: DateTime<Utc>,
        editor: Option<&str>,
        snapshot: EntitySnapshot,
    ) {
        let descriptor = RevisionDescriptor {
            revision_id,
            timestamp,
            editor: editor.map(str::to_owned),
        };
        let history = self.history.entry(EntityId::from(entity)).or_default();
        history.push((descriptor, snapshot));
        history.sort_by_key(|(revision, _)| (revision.timestamp, revision.revision_id));
    }

    /// Make every call touching `entity` fail with a transport error.
    pub fn make_unavailable(&mut self, entity: &str) {
        self.unavailable.insert(EntityId::from(entity));
    }

    pub fn add_candidate(&mut self, details: MoleculeDetails) {
        let id = details.compound_id.clone();
        if !self.candidates.contains(&id) {
            self.candidates.push(id.clone());
        }
        self.details.entry(id).or_default().push(details);
    }

    pub fn snapshot_fetches(&self) -> usize {
        self.snapshot_fetches.get()
    }

    fn check_available(&self, entity: &EntityId) -> Result<(), AccessorError> {
        if self.unavailable.contains(entity) {
            return Err(AccessorError::Transport {
                endpoint: ENDPOINT.to_owned(),
                message: format!("{entity} unavailable"),
            });
        }
        Ok(())
    }

    fn label(&self, entity: &EntityId) -> String {
        self.labels.get(entity).cloned().unwrap_or_default()
    }
}

impl LiveState for MemoryKnowledgeBase {
    fn relation_holds(&self, compound: &EntityId, taxon: &EntityId) -> Result<bool, AccessorError> {
        self.check_available(compound)?;
        self.check_available(taxon)?;
        Ok(self.relations.contains(&(compound.clone(), taxon.clone())))
    }

    fn labels(
        &self,
        compound: &EntityId,
        taxon: &EntityId,
        reference: &EntityId,
    ) -> Result<LiveLabels, AccessorError> {
        for entity in [compound, taxon, reference] {
            self.check_available(entity)?;
        }
        Ok(LiveLabels {
            compound: self.label(compound),
            taxon: self.label(taxon),
            reference: self.label(reference),
        })
    }
}

impl RevisionSource for MemoryKnowledgeBase {
    fn revisions_since(
        &self,
        entity: &EntityId,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<RevisionDescriptor>, AccessorError> {
        self.check_available(entity)?;
        Ok(self
            .history
            .get(entity)
            .into_iter()
            .flatten()
            .filter(|(revision, _)| revision.timestamp > since)
            .take(limit)
            .map(|(revision, _)| revision.clone())
            .collect())
    }

    fn baseline_revision(
        &self,
        entity: &EntityId,
        since: DateTime<Utc>,
    ) -> Result<Option<RevisionDescriptor>, AccessorError> {
        self.check_available(entity)?;
        Ok(self
            .history
            .get(entity)
            .into_iter()
            .flatten()
            .filter(|(revision, _)| revision.timestamp <= since)
            .last()
            .map(|(revision, _)| revision.clone()))
    }

    fn snapshot_at(&self, entity: &EntityId, revision_id: u64) -> Result<EntitySnapshot, AccessorError> {
        self.check_available(entity)?;
        self.snapshot_fetches.set(self.snapshot_fetches.get() + 1);
        self.history
            .get(entity)
            .into_iter()
            .flatten()
            .find(|(revision, _)| revision.revision_id == revision_id)
            .map(|(_, snapshot)| snapshot.clone())
            .ok_or_else(|| AccessorError::MissingEntity {
                entity: entity.clone(),
            })
    }
}

impl CandidateSource for MemoryKnowledgeBase {
    fn candidate_ids(&self) -> Result<Vec<EntityId>, AccessorError> {
        Ok(self.candidates.clone())
    }

    fn molecule_details(&self, compound: &EntityId) -> Result<Vec<MoleculeDetails>, AccessorError> {
        self.check_available(compound)?;
        Ok(self.details.get(compound).cloned().unwrap_or_default())
    }
}

/// Collects published posts and hands out sequential ids.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    posts: RefCell<Vec<Post>>,
    failing: Cell<bool>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    pub fn posts(&self) -> Vec<Post> {
        self.posts.borrow().clone()
    }
}

impl Publisher for MemoryPublisher {
    fn publish(&self, post: &Post) -> Result<PublicationId, AccessorError> {
        if self.failing.get() {
            return Err(AccessorError::Transport {
                endpoint: ENDPOINT.to_owned(),
                message: "publisher offline".to_owned(),
            });
        }
        let mut posts = self.posts.borrow_mut();
        posts.push(post.clone());
        Ok(PublicationId::from(format!("reply-{}", posts.len())))
    }
}

/// Snapshot helper: a label and the taxa the entity is found in.
pub fn snapshot(label: Option<&str>, taxa: &[&str]) -> EntitySnapshot {
    EntitySnapshot {
        label: label.map(str::to_owned),
        relation_targets: taxa.iter().copied().map(EntityId::from).collect(),
    }
}
