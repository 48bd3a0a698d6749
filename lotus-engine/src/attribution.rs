//! Attribution of a detected change to the editor who made it.
//!
//! The walk looks at the revision window of one entity: the baseline revision
//! (the last one at or before `since`) followed by every newer revision in
//! ascending order. Consecutive pairs are compared and the editor of the
//! newer revision of the first matching pair is returned.
//!
//! Attribution is best-effort. Finding no pair, or a pair whose newer
//! revision is anonymous, yields `None`; only accessor failures are errors.

use chrono::{DateTime, Utc};
use tracing::debug;

use lotus_core::types::{EntityId, RevisionDescriptor};

use crate::accessor::{EntitySnapshot, RevisionSource};
use crate::AccessorError;

pub struct Attributor<'a> {
    source: &'a dyn RevisionSource,
    limit: usize,
}

impl<'a> Attributor<'a> {
    /// `limit` caps the revisions fetched after the baseline; it is at least 1.
    pub fn new(source: &'a dyn RevisionSource, limit: usize) -> Self {
        Self {
            source,
            limit: limit.max(1),
        }
    }

    /// Who changed the label of `entity` away from `known_old`?
    ///
    /// `known_old` must match the older revision's label exactly; an absent
    /// label compares as `""`.
    pub fn label_change(
        &self,
        entity: &EntityId,
        known_old: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<String>, AccessorError> {
        self.first_transition(entity, since, |older, newer| {
            let old = older.label_or_empty();
            old == known_old && newer.label_or_empty() != old
        })
    }

    /// Who removed the found-in-taxon claim `compound -> taxon`?
    pub fn relation_removal(
        &self,
        compound: &EntityId,
        taxon: &EntityId,
        since: DateTime<Utc>,
    ) -> Result<Option<String>, AccessorError> {
        self.first_transition(compound, since, |older, newer| {
            older.relation_targets.contains(taxon) && !newer.relation_targets.contains(taxon)
        })
    }

    fn window(
        &self,
        entity: &EntityId,
        since: DateTime<Utc>,
    ) -> Result<Vec<RevisionDescriptor>, AccessorError> {
        let mut window = Vec::with_capacity(self.limit + 1);
        if let Some(baseline) = self.source.baseline_revision(entity, since)? {
            window.push(baseline);
        }
        for revision in self.source.revisions_since(entity, since, self.limit)? {
            if window.iter().all(|seen| seen.revision_id != revision.revision_id) {
                window.push(revision);
            }
        }
        Ok(window)
    }

    fn first_transition<F>(
        &self,
        entity: &EntityId,
        since: DateTime<Utc>,
        matches: F,
    ) -> Result<Option<String>, AccessorError>
    where
        F: Fn(&EntitySnapshot, &EntitySnapshot) -> bool,
    {
        let window = self.window(entity, since)?;
        let mut revisions = window.iter();
        let Some(first) = revisions.next() else {
            debug!(%entity, "no revisions to attribute");
            return Ok(None);
        };

        // Each snapshot is fetched once and carried over as the next predecessor.
        let mut older = self.source.snapshot_at(entity, first.revision_id)?;
        for revision in revisions {
            let newer = self.source.snapshot_at(entity, revision.revision_id)?;
            if matches(&older, &newer) {
                debug!(
                    %entity,
                    revision = revision.revision_id,
                    editor = revision.editor.as_deref().unwrap_or("<anonymous>"),
                    "change attributed"
                );
                return Ok(revision.editor.clone());
            }
            older = newer;
        }

        debug!(%entity, revisions = window.len(), "no matching revision pair");
        Ok(None)
    }
}
