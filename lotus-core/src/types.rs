//! Domain types for published occurrences and their edit checks.
//!
//! Identifiers are string newtypes; every timestamp is `DateTime<Utc>`.
//! All persisted types are serializable via serde + serde_json.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timestamp;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A knowledge-base entity identifier (a Wikidata QID such as `Q60235`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Handle of a published post, as returned by the publisher.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicationId(pub String);

impl PublicationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PublicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for PublicationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PublicationId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// The labels watched for every published occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackedField {
    Compound,
    Taxon,
    Reference,
}

impl TrackedField {
    /// All fields in comparison order.
    pub fn all() -> &'static [TrackedField] {
        &[
            TrackedField::Compound,
            TrackedField::Taxon,
            TrackedField::Reference,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackedField::Compound => "compound",
            TrackedField::Taxon => "taxon",
            TrackedField::Reference => "reference",
        }
    }
}

impl fmt::Display for TrackedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// One published occurrence under observation.
///
/// Field names follow the on-disk log; the `alias` attributes accept the
/// names written by earlier versions of the bot (`toot_id`, `timestamp`,
/// `last_reply_timestamp`, `*_qid`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedRecord {
    #[serde(alias = "compound_qid")]
    pub compound_id: EntityId,
    #[serde(alias = "taxon_qid")]
    pub taxon_id: EntityId,
    #[serde(alias = "reference_qid")]
    pub reference_id: EntityId,

    #[serde(default)]
    pub compound_label: String,
    #[serde(default)]
    pub taxon_label: String,
    #[serde(default)]
    pub reference_label: String,

    /// Absent when publishing failed; such records are never checked.
    #[serde(default, alias = "toot_id", skip_serializing_if = "Option::is_none")]
    pub publication_id: Option<PublicationId>,

    #[serde(alias = "timestamp", with = "timestamp")]
    pub published_at: DateTime<Utc>,

    #[serde(
        default,
        alias = "last_reply_timestamp",
        with = "timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_reply_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compound_label_last_checked: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taxon_label_last_checked: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_label_last_checked: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_present_last_checked: Option<bool>,
}

impl TrackedRecord {
    /// Build the record for an occurrence that was just published.
    pub fn published(
        details: &MoleculeDetails,
        publication_id: Option<PublicationId>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            compound_id: details.compound_id.clone(),
            taxon_id: details.taxon_id.clone(),
            reference_id: details.reference_id.clone(),
            compound_label: details.compound.clone(),
            taxon_label: details.taxon.clone(),
            reference_label: details.reference.clone(),
            publication_id,
            published_at,
            last_reply_at: None,
            compound_label_last_checked: None,
            taxon_label_last_checked: None,
            reference_label_last_checked: None,
            relation_present_last_checked: None,
        }
    }

    /// A record can only be followed up when its post exists.
    pub fn is_eligible(&self) -> bool {
        self.publication_id
            .as_ref()
            .is_some_and(|id| !id.0.trim().is_empty())
    }

    /// Lower bound for revision history: the last reply, else the original post.
    pub fn since(&self) -> DateTime<Utc> {
        self.last_reply_at.unwrap_or(self.published_at)
    }

    /// Fill absent "last checked" state from the publish-time values.
    ///
    /// Existing values (including explicit empty strings) are kept.
    pub fn initialize_last_checked(&mut self) {
        for field in TrackedField::all() {
            if self.last_checked_slot(*field).is_none() {
                let original = self.original_label(*field).to_owned();
                *self.last_checked_slot(*field) = Some(original);
            }
        }
        if self.relation_present_last_checked.is_none() {
            self.relation_present_last_checked = Some(true);
        }
    }

    pub fn entity_id(&self, field: TrackedField) -> &EntityId {
        match field {
            TrackedField::Compound => &self.compound_id,
            TrackedField::Taxon => &self.taxon_id,
            TrackedField::Reference => &self.reference_id,
        }
    }

    /// Label captured when the occurrence was published.
    pub fn original_label(&self, field: TrackedField) -> &str {
        match field {
            TrackedField::Compound => &self.compound_label,
            TrackedField::Taxon => &self.taxon_label,
            TrackedField::Reference => &self.reference_label,
        }
    }

    /// Label as of the last check; absent reads as the empty string.
    pub fn last_checked(&self, field: TrackedField) -> &str {
        let slot = match field {
            TrackedField::Compound => &self.compound_label_last_checked,
            TrackedField::Taxon => &self.taxon_label_last_checked,
            TrackedField::Reference => &self.reference_label_last_checked,
        };
        slot.as_deref().unwrap_or("")
    }

    pub fn set_last_checked(&mut self, field: TrackedField, value: impl Into<String>) {
        *self.last_checked_slot(field) = Some(value.into());
    }

    /// Compound–taxon relation state as of the last check (assumed present).
    pub fn relation_present(&self) -> bool {
        self.relation_present_last_checked.unwrap_or(true)
    }

    pub fn set_relation_present(&mut self, present: bool) {
        self.relation_present_last_checked = Some(present);
    }

    /// Whether this record describes the given compound–taxon pair.
    pub fn is_occurrence(&self, compound: &EntityId, taxon: &EntityId) -> bool {
        &self.compound_id == compound && &self.taxon_id == taxon
    }

    fn last_checked_slot(&mut self, field: TrackedField) -> &mut Option<String> {
        match field {
            TrackedField::Compound => &mut self.compound_label_last_checked,
            TrackedField::Taxon => &mut self.taxon_label_last_checked,
            TrackedField::Reference => &mut self.reference_label_last_checked,
        }
    }
}

/// One historical edit of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionDescriptor {
    pub revision_id: u64,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
    /// `None` for suppressed or otherwise unattributable edits.
    #[serde(default)]
    pub editor: Option<String>,
}

/// A single label that moved away from its last checked value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub field: TrackedField,
    pub old_value: String,
    pub new_value: String,
}

/// Everything detected for one record in one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationOutcome {
    pub relation_removed: bool,
    pub changes: Vec<ChangeRecord>,
    pub editors: BTreeSet<String>,
}

impl ReconciliationOutcome {
    /// `true` when there is nothing to tell the audience.
    pub fn is_noop(&self) -> bool {
        !self.relation_removed && self.changes.is_empty()
    }

    pub fn record_editor(&mut self, editor: Option<String>) {
        if let Some(editor) = editor {
            self.editors.insert(editor);
        }
    }
}

/// Current labels of the three tracked entities; empty when unresolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveLabels {
    pub compound: String,
    pub taxon: String,
    pub reference: String,
}

impl LiveLabels {
    pub fn get(&self, field: TrackedField) -> &str {
        match field {
            TrackedField::Compound => &self.compound,
            TrackedField::Taxon => &self.taxon,
            TrackedField::Reference => &self.reference,
        }
    }
}

/// Everything the daily post needs about one compound–taxon occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoleculeDetails {
    pub compound: String,
    pub compound_id: EntityId,
    pub taxon: String,
    pub taxon_id: EntityId,
    pub reference: String,
    pub reference_id: EntityId,
    pub smiles: String,
    pub image_url: String,
    pub taxon_image_url: String,
    pub taxon_emoji: String,
    pub kingdom_label: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record() -> TrackedRecord {
        TrackedRecord {
            compound_id: EntityId::from("Q60235"),
            taxon_id: EntityId::from("Q158767"),
            reference_id: EntityId::from("Q104225190"),
            compound_label: "caffeine".to_owned(),
            taxon_label: "Coffea arabica".to_owned(),
            reference_label: "Alkaloids of coffee".to_owned(),
            publication_id: Some(PublicationId::from("112233")),
            published_at: Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap(),
            last_reply_at: None,
            compound_label_last_checked: None,
            taxon_label_last_checked: None,
            reference_label_last_checked: None,
            relation_present_last_checked: None,
        }
    }

    #[test]
    fn newtype_display() {
        assert_eq!(EntityId::from("Q1").to_string(), "Q1");
        assert_eq!(PublicationId::from("42").to_string(), "42");
        assert_eq!(TrackedField::Reference.to_string(), "reference");
    }

    #[test]
    fn initialize_fills_only_absent_state() {
        let mut r = record();
        r.taxon_label_last_checked = Some(String::new());
        r.initialize_last_checked();
        assert_eq!(r.last_checked(TrackedField::Compound), "caffeine");
        assert_eq!(r.last_checked(TrackedField::Taxon), "");
        assert_eq!(r.last_checked(TrackedField::Reference), "Alkaloids of coffee");
        assert_eq!(r.relation_present_last_checked, Some(true));
    }

    #[test]
    fn absent_last_checked_reads_as_empty() {
        let r = record();
        assert_eq!(r.last_checked(TrackedField::Compound), "");
        assert!(r.relation_present());
    }

    #[test]
    fn since_prefers_last_reply() {
        let mut r = record();
        assert_eq!(r.since(), r.published_at);
        let reply = Utc.with_ymd_and_hms(2025, 5, 3, 9, 0, 0).unwrap();
        r.last_reply_at = Some(reply);
        assert_eq!(r.since(), reply);
    }

    #[test]
    fn eligibility_requires_publication_id() {
        let mut r = record();
        assert!(r.is_eligible());
        r.publication_id = Some(PublicationId::from(""));
        assert!(!r.is_eligible());
        r.publication_id = None;
        assert!(!r.is_eligible());
    }

    #[test]
    fn outcome_noop_and_editors() {
        let mut outcome = ReconciliationOutcome::default();
        assert!(outcome.is_noop());
        outcome.record_editor(None);
        outcome.record_editor(Some("Alice".to_owned()));
        outcome.record_editor(Some("Alice".to_owned()));
        assert_eq!(outcome.editors.len(), 1);
        outcome.relation_removed = true;
        assert!(!outcome.is_noop());
    }
}
