//! The edit-check sweep over every tracked record.

use chrono::{DateTime, Utc};

use lotus_compose::Composer;
use lotus_core::store::RecordStore;
use lotus_core::types::{EntityId, PublicationId};

use crate::accessor::{Post, Publisher};
use crate::reconcile::{RecordCheck, Reconciler};
use crate::EngineError;

#[derive(Debug, Clone, Copy, Default)]
pub struct SweepOptions {
    /// Compose replies but publish nothing. Updated records still go to the
    /// store, which for a dry run should point at a scratch file.
    pub dry_run: bool,
}

/// A reply composed during the sweep.
#[derive(Debug, Clone)]
pub struct Reply {
    pub compound: EntityId,
    pub taxon: EntityId,
    pub text: String,
    /// `None` in a dry run.
    pub published: Option<PublicationId>,
}

/// A record that could not be checked this pass; it was left untouched.
#[derive(Debug, Clone)]
pub struct SweepFailure {
    pub compound: EntityId,
    pub taxon: EntityId,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct SweepReport {
    pub checked: usize,
    pub skipped: usize,
    pub unchanged: usize,
    pub restored: usize,
    pub replies: Vec<Reply>,
    pub failures: Vec<SweepFailure>,
    /// Whether the store was written.
    pub saved: bool,
}

/// Reconcile every record in `store`, reply to the changed ones and persist
/// the new tracked state.
///
/// A failure on one record (accessor, composition or publishing) is logged
/// and reported; that record keeps its previous state and the sweep moves on.
/// Store failures abort the sweep.
pub fn check_edits(
    store: &dyn RecordStore,
    reconciler: &Reconciler<'_>,
    composer: &Composer,
    publisher: Option<&dyn Publisher>,
    options: SweepOptions,
    now: DateTime<Utc>,
) -> Result<SweepReport, EngineError> {
    let publisher = match (publisher, options.dry_run) {
        (None, false) => return Err(EngineError::PublisherRequired),
        (_, true) => None,
        (publisher, false) => publisher,
    };

    let mut records = store.load_all()?;
    let mut report = SweepReport::default();
    let mut dirty = false;

    for index in 0..records.len() {
        let compound = records[index].compound_id.clone();
        let taxon = records[index].taxon_id.clone();
        let fail = |report: &mut SweepReport, error: String| {
            tracing::warn!(%compound, %taxon, "check failed: {error}");
            report.failures.push(SweepFailure {
                compound: compound.clone(),
                taxon: taxon.clone(),
                error,
            });
        };

        let check = match reconciler.reconcile(&records[index]) {
            Ok(check) => check,
            Err(err) => {
                report.checked += 1;
                fail(&mut report, err.to_string());
                continue;
            }
        };

        match check {
            RecordCheck::NotEligible => report.skipped += 1,
            RecordCheck::Unchanged => {
                report.checked += 1;
                report.unchanged += 1;
                tracing::debug!(%compound, %taxon, "unchanged");
            }
            RecordCheck::Restored { record } => {
                report.checked += 1;
                report.restored += 1;
                records[index] = record;
                dirty = true;
            }
            RecordCheck::Changed { outcome, mut record } => {
                report.checked += 1;
                let text = match composer.edit_reply(&record, &outcome) {
                    Ok(text) => text,
                    Err(err) => {
                        fail(&mut report, err.to_string());
                        continue;
                    }
                };

                let published = match publisher {
                    None => {
                        tracing::info!(%compound, %taxon, "[dry-run] would reply:\n{text}");
                        None
                    }
                    Some(publisher) => {
                        let post = Post {
                            text: text.clone(),
                            reply_to: record.publication_id.clone(),
                            media: Vec::new(),
                        };
                        match publisher.publish(&post) {
                            Ok(id) => {
                                tracing::info!(%compound, %taxon, reply = %id, "reply published");
                                record.last_reply_at = Some(now);
                                Some(id)
                            }
                            Err(err) => {
                                fail(&mut report, EngineError::Publish(err).to_string());
                                continue;
                            }
                        }
                    }
                };

                records[index] = record;
                dirty = true;
                report.replies.push(Reply {
                    compound: compound.clone(),
                    taxon: taxon.clone(),
                    text,
                    published,
                });
            }
        }
    }

    if dirty {
        store.save_all(&records)?;
        report.saved = true;
    }

    tracing::info!(
        checked = report.checked,
        replies = report.replies.len(),
        failures = report.failures.len(),
        "edit check complete"
    );
    Ok(report)
}
