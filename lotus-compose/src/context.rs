//! Template contexts: serializable payloads built from core types.

use serde::Serialize;

use lotus_core::types::{EntityId, MoleculeDetails, ReconciliationOutcome, TrackedRecord};

use crate::error::ComposeError;

const WIKIDATA_WIKI: &str = "https://www.wikidata.org/wiki";

/// `https://www.wikidata.org/wiki/<id>`
pub fn entity_url(id: &EntityId) -> String {
    format!("{WIKIDATA_WIKI}/{id}")
}

/// Curation anchor for the "found in taxon" statements of a compound.
pub fn curation_url(compound: &EntityId) -> String {
    format!("{WIKIDATA_WIKI}/{compound}#P703")
}

/// User page of a Wikidata editor.
pub fn user_url(editor: &str) -> String {
    format!("{WIKIDATA_WIKI}/User:{}", editor.replace(' ', "_"))
}

/// "an" before a vowel, else "a".
pub fn indefinite_article(word: &str) -> &'static str {
    match word.chars().next() {
        Some(c) if "aeiou".contains(c.to_ascii_lowercase()) => "an",
        _ => "a",
    }
}

/// Payload of the daily occurrence post.
#[derive(Debug, Clone, Serialize)]
pub struct OccurrenceContext {
    pub compound: String,
    pub compound_url: String,
    pub taxon: String,
    pub taxon_url: String,
    pub reference: String,
    pub reference_url: String,
    pub curation_url: String,
    pub article: &'static str,
    pub taxon_emoji: String,
    pub kingdom_label: String,
    /// Trailing project hashtags; dropped first when shortening.
    pub hashtags: bool,
    /// Reference as a bare link; the second shortening step.
    pub short_reference: bool,
}

impl OccurrenceContext {
    pub fn from_details(details: &MoleculeDetails) -> Self {
        Self {
            compound: details.compound.clone(),
            compound_url: entity_url(&details.compound_id),
            taxon: details.taxon.clone(),
            taxon_url: entity_url(&details.taxon_id),
            reference: details.reference.clone(),
            reference_url: entity_url(&details.reference_id),
            curation_url: curation_url(&details.compound_id),
            article: indefinite_article(&details.kingdom_label),
            taxon_emoji: details.taxon_emoji.clone(),
            kingdom_label: details.kingdom_label.clone(),
            hashtags: true,
            short_reference: false,
        }
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, ComposeError> {
        Ok(tera::Context::from_serialize(self)?)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeCtx {
    pub field: String,
    pub old_value: String,
    pub new_value: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditorCtx {
    pub name: String,
    pub url: String,
}

/// Payload of the follow-up reply to a published occurrence.
#[derive(Debug, Clone, Serialize)]
pub struct ReplyContext {
    pub relation_removed: bool,
    pub compound_label: String,
    pub taxon_label: String,
    pub changes: Vec<ChangeCtx>,
    /// Sorted, deduplicated.
    pub editors: Vec<EditorCtx>,
    pub curation_url: String,
}

impl ReplyContext {
    /// The banner names the occurrence as it was published, not as edited.
    pub fn from_outcome(record: &TrackedRecord, outcome: &ReconciliationOutcome) -> Self {
        Self {
            relation_removed: outcome.relation_removed,
            compound_label: record.compound_label.clone(),
            taxon_label: record.taxon_label.clone(),
            changes: outcome
                .changes
                .iter()
                .map(|c| ChangeCtx {
                    field: c.field.to_string(),
                    old_value: c.old_value.clone(),
                    new_value: c.new_value.clone(),
                })
                .collect(),
            editors: outcome
                .editors
                .iter()
                .map(|name| EditorCtx {
                    name: name.clone(),
                    url: user_url(name),
                })
                .collect(),
            curation_url: curation_url(&record.compound_id),
        }
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, ComposeError> {
        Ok(tera::Context::from_serialize(self)?)
    }
}
