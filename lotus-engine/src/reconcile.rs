//! Per-record reconciliation against the live knowledge base.
//!
//! [`Reconciler::reconcile`] never mutates the record it is given. It works
//! on a copy and hands the updated copy back inside the [`RecordCheck`], so
//! the caller decides whether the new state is committed (after a reply was
//! published, for example) or dropped.

use tracing::{debug, info, warn};

use lotus_core::types::{ChangeRecord, EntityId, ReconciliationOutcome, TrackedField, TrackedRecord};

use crate::accessor::{LiveState, RevisionSource};
use crate::attribution::Attributor;
use crate::{AccessorError, EngineError};

/// Result of checking one record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordCheck {
    /// The record has no publication to reply to and was not checked.
    NotEligible,
    /// Nothing changed since the last pass.
    Unchanged,
    /// A relation reported as removed is present again. Nothing to announce,
    /// but the record must be updated so a later removal is noticed.
    Restored { record: TrackedRecord },
    /// Something worth a reply. `record` carries the new tracked state.
    Changed {
        outcome: ReconciliationOutcome,
        record: TrackedRecord,
    },
}

pub struct Reconciler<'a> {
    live: &'a dyn LiveState,
    entities: Attributor<'a>,
    references: Attributor<'a>,
}

impl<'a> Reconciler<'a> {
    /// `entities` serves compound and taxon history, `references` serves the
    /// reference's history (which may live on a separate service).
    pub fn new(
        live: &'a dyn LiveState,
        entities: &'a dyn RevisionSource,
        references: &'a dyn RevisionSource,
        revision_limit: usize,
    ) -> Self {
        Self {
            live,
            entities: Attributor::new(entities, revision_limit),
            references: Attributor::new(references, revision_limit),
        }
    }

    fn attributor(&self, field: TrackedField) -> &Attributor<'a> {
        match field {
            TrackedField::Reference => &self.references,
            TrackedField::Compound | TrackedField::Taxon => &self.entities,
        }
    }

    pub fn reconcile(&self, record: &TrackedRecord) -> Result<RecordCheck, EngineError> {
        if !record.is_eligible() {
            debug!(compound = %record.compound_id, "no publication id; skipping");
            return Ok(RecordCheck::NotEligible);
        }

        let compound = record.compound_id.clone();
        let taxon = record.taxon_id.clone();
        let unavailable = |source: AccessorError| EngineError::AccessorUnavailable {
            compound: compound.clone(),
            taxon: taxon.clone(),
            source,
        };

        let mut record = record.clone();
        record.initialize_last_checked();
        let since = record.since();
        let mut outcome = ReconciliationOutcome::default();
        let mut restored = false;

        let holds = self
            .live
            .relation_holds(&compound, &taxon)
            .map_err(&unavailable)?;
        match (holds, record.relation_present()) {
            (false, true) => {
                warn!(%compound, %taxon, "occurrence removed");
                let editor = self
                    .entities
                    .relation_removal(&compound, &taxon, since)
                    .map_err(&unavailable)?;
                outcome.relation_removed = true;
                outcome.record_editor(editor);
                record.set_relation_present(false);
            }
            (true, false) => {
                info!(%compound, %taxon, "occurrence restored");
                record.set_relation_present(true);
                restored = true;
            }
            (false, false) => debug!(%compound, %taxon, "removal already reported"),
            (true, true) => {}
        }

        // Labels are compared even when the relation is gone.
        let labels = self
            .live
            .labels(&compound, &taxon, &record.reference_id)
            .map_err(&unavailable)?;
        for &field in TrackedField::all() {
            let old = record.last_checked(field).to_owned();
            let new = labels.get(field);
            if new == old {
                continue;
            }
            let entity: EntityId = record.entity_id(field).clone();
            info!(%entity, %field, old = %old, new = %new, "label changed");
            let editor = self
                .attributor(field)
                .label_change(&entity, &old, since)
                .map_err(&unavailable)?;
            outcome.record_editor(editor);
            record.set_last_checked(field, new);
            outcome.changes.push(ChangeRecord {
                field,
                old_value: old,
                new_value: new.to_owned(),
            });
        }

        Ok(if !outcome.is_noop() {
            RecordCheck::Changed { outcome, record }
        } else if restored {
            RecordCheck::Restored { record }
        } else {
            RecordCheck::Unchanged
        })
    }
}
