//! Wikidata behind the engine's accessor traits.
//!
//! Live state comes from the SPARQL endpoint, revision lists from the
//! MediaWiki action API, and per-revision snapshots from
//! `Special:EntityData`. Every method makes a single attempt.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;

use lotus_core::config::WikidataConfig;
use lotus_core::types::{EntityId, LiveLabels, MoleculeDetails, RevisionDescriptor};
use lotus_engine::{AccessorError, CandidateSource, EntitySnapshot, LiveState, RevisionSource};

use crate::http;
use crate::sparql::{self, Binding, SparqlClient};

const FOUND_IN_TAXON: &str = "P703";
const UNKNOWN_REFERENCE: &str = "an unknown reference";
const DEPICT_URL: &str = "https://dev.api.naturalproducts.net/latest/depict/2D";

pub struct WikidataClient {
    sparql: SparqlClient,
    agent: ureq::Agent,
    api_endpoint: String,
    entity_data_url: String,
    scholarly_endpoint: String,
}

impl WikidataClient {
    pub fn new(config: &WikidataConfig) -> Self {
        let agent = http::agent(&config.user_agent, config.timeout_secs);
        Self {
            sparql: SparqlClient::new(&config.sparql_endpoint, agent.clone()),
            agent,
            api_endpoint: config.api_endpoint.clone(),
            entity_data_url: config.entity_data_url.trim_end_matches('/').to_owned(),
            scholarly_endpoint: config.scholarly_sparql_endpoint.clone(),
        }
    }

    fn revisions(
        &self,
        entity: &EntityId,
        since: DateTime<Utc>,
        direction: &str,
        limit: usize,
    ) -> Result<Vec<RevisionDescriptor>, AccessorError> {
        let request = self
            .agent
            .get(&self.api_endpoint)
            .query("action", "query")
            .query("prop", "revisions")
            .query("titles", entity.as_str())
            .query("rvprop", "ids|timestamp|user")
            .query("rvdir", direction)
            .query("rvstart", &since.to_rfc3339_opts(SecondsFormat::Secs, true))
            .query("rvlimit", &limit.to_string())
            .query("formatversion", "2")
            .query("format", "json");
        let response: Option<RevisionsResponse> = http::call_json(&self.api_endpoint, request)?;
        Ok(response.map(RevisionsResponse::into_descriptors).unwrap_or_default())
    }
}

impl LiveState for WikidataClient {
    fn relation_holds(&self, compound: &EntityId, taxon: &EntityId) -> Result<bool, AccessorError> {
        self.sparql.ask(&sparql::relation_query(compound, taxon))
    }

    fn labels(
        &self,
        compound: &EntityId,
        taxon: &EntityId,
        reference: &EntityId,
    ) -> Result<LiveLabels, AccessorError> {
        let query = sparql::labels_query(compound, taxon, reference, &self.scholarly_endpoint);
        let rows = self.sparql.select(&query)?;
        let Some(row) = rows.first() else {
            return Ok(LiveLabels::default());
        };
        Ok(LiveLabels {
            compound: sparql::value(row, "compoundLabel").to_owned(),
            taxon: sparql::value(row, "taxonLabel").to_owned(),
            reference: sparql::value(row, "referenceLabel").to_owned(),
        })
    }
}

impl RevisionSource for WikidataClient {
    fn revisions_since(
        &self,
        entity: &EntityId,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<RevisionDescriptor>, AccessorError> {
        // rvstart is inclusive and second-granular.
        let mut revisions = self.revisions(entity, since, "newer", limit)?;
        revisions.retain(|revision| revision.timestamp > since);
        Ok(revisions)
    }

    fn baseline_revision(
        &self,
        entity: &EntityId,
        since: DateTime<Utc>,
    ) -> Result<Option<RevisionDescriptor>, AccessorError> {
        Ok(self.revisions(entity, since, "older", 1)?.into_iter().next())
    }

    fn snapshot_at(&self, entity: &EntityId, revision_id: u64) -> Result<EntitySnapshot, AccessorError> {
        let url = format!("{}/{entity}.json", self.entity_data_url);
        let request = self
            .agent
            .get(&url)
            .query("revision", &revision_id.to_string());
        let response: Option<EntityDataResponse> = http::call_json(&url, request)?;
        response
            .and_then(|data| data.into_entity(entity))
            .map(|doc| doc.snapshot())
            .ok_or_else(|| AccessorError::MissingEntity {
                entity: entity.clone(),
            })
    }
}

impl CandidateSource for WikidataClient {
    fn candidate_ids(&self) -> Result<Vec<EntityId>, AccessorError> {
        let rows = self.sparql.select(sparql::candidates_query())?;
        Ok(rows.iter().filter_map(|row| sparql::entity(row, "compound")).collect())
    }

    fn molecule_details(&self, compound: &EntityId) -> Result<Vec<MoleculeDetails>, AccessorError> {
        let rows = self
            .sparql
            .select(&sparql::details_query(compound, &self.scholarly_endpoint))?;
        Ok(rows.iter().map(details_from_row).collect())
    }
}

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RevisionsResponse {
    #[serde(default)]
    query: Option<RevisionsQuery>,
}

#[derive(Debug, Deserialize)]
struct RevisionsQuery {
    #[serde(default)]
    pages: Vec<RevisionsPage>,
}

#[derive(Debug, Deserialize)]
struct RevisionsPage {
    #[serde(default)]
    revisions: Vec<ApiRevision>,
}

#[derive(Debug, Deserialize)]
struct ApiRevision {
    revid: u64,
    timestamp: DateTime<Utc>,
    /// Absent when the username is hidden.
    #[serde(default)]
    user: Option<String>,
}

impl RevisionsResponse {
    fn into_descriptors(self) -> Vec<RevisionDescriptor> {
        let mut revisions: Vec<RevisionDescriptor> = self
            .query
            .into_iter()
            .flat_map(|query| query.pages)
            .flat_map(|page| page.revisions)
            .map(|revision| RevisionDescriptor {
                revision_id: revision.revid,
                timestamp: revision.timestamp,
                editor: revision.user,
            })
            .collect();
        revisions.sort_by_key(|revision| (revision.timestamp, revision.revision_id));
        revisions
    }
}

#[derive(Debug, Deserialize)]
struct EntityDataResponse {
    #[serde(default)]
    entities: BTreeMap<String, EntityDocument>,
}

impl EntityDataResponse {
    /// The requested entity, or the redirect target when there is only one.
    fn into_entity(mut self, entity: &EntityId) -> Option<EntityDocument> {
        if let Some(doc) = self.entities.remove(entity.as_str()) {
            return Some(doc);
        }
        if self.entities.len() == 1 {
            return self.entities.into_values().next();
        }
        None
    }
}

#[derive(Debug, Default, Deserialize)]
struct EntityDocument {
    #[serde(default)]
    labels: BTreeMap<String, LanguageValue>,
    #[serde(default)]
    claims: BTreeMap<String, Vec<Claim>>,
}

#[derive(Debug, Deserialize)]
struct LanguageValue {
    value: String,
}

#[derive(Debug, Deserialize)]
struct Claim {
    mainsnak: Snak,
}

#[derive(Debug, Deserialize)]
struct Snak {
    /// Missing for `novalue` / `somevalue` snaks.
    #[serde(default)]
    datavalue: Option<DataValue>,
}

#[derive(Debug, Deserialize)]
struct DataValue {
    value: serde_json::Value,
}

impl EntityDocument {
    fn snapshot(self) -> EntitySnapshot {
        let label = self.labels.get("en").map(|v| v.value.clone());
        let relation_targets: BTreeSet<EntityId> = self
            .claims
            .get(FOUND_IN_TAXON)
            .into_iter()
            .flatten()
            .filter_map(|claim| claim.mainsnak.datavalue.as_ref())
            .filter_map(|data| data.value.get("id").and_then(|id| id.as_str()))
            .map(EntityId::from)
            .collect();
        EntitySnapshot {
            label,
            relation_targets,
        }
    }
}

// ---------------------------------------------------------------------------
// Daily post rows
// ---------------------------------------------------------------------------

fn kingdom_emoji(kingdom: Option<&EntityId>) -> &'static str {
    match kingdom.map(EntityId::as_str) {
        Some("Q756") => "🌿",
        Some("Q764") => "🍄",
        Some("Q729") => "🐛",
        Some("Q10876") => "🦠",
        _ => "🧬",
    }
}

fn entity_or_unknown(row: &Binding, var: &str) -> EntityId {
    sparql::entity(row, var).unwrap_or_else(|| EntityId::from("unknown"))
}

fn depiction_url(smiles: &str) -> String {
    format!(
        "{DEPICT_URL}?smiles={}&width=300&height=200&toolkit=cdk&rotate=0&CIP=false&unicolor=false",
        http::encode_component(smiles)
    )
}

fn details_from_row(row: &Binding) -> MoleculeDetails {
    let smiles = sparql::value(row, "smiles").to_owned();
    let reference = match sparql::value(row, "referenceLabel") {
        "" => UNKNOWN_REFERENCE.to_owned(),
        label => label.to_owned(),
    };
    MoleculeDetails {
        compound: sparql::value(row, "compoundLabel").to_owned(),
        compound_id: entity_or_unknown(row, "compound"),
        taxon: sparql::value(row, "taxonLabel").to_owned(),
        taxon_id: entity_or_unknown(row, "taxon"),
        reference,
        reference_id: entity_or_unknown(row, "reference"),
        image_url: depiction_url(&smiles),
        smiles,
        taxon_image_url: sparql::value(row, "taxon_image").to_owned(),
        taxon_emoji: kingdom_emoji(sparql::entity(row, "kingdom").as_ref()).to_owned(),
        kingdom_label: sparql::value(row, "kingdomLabel").to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn revisions_parse_with_hidden_user() {
        let raw = r#"{"batchcomplete": true, "query": {"pages": [{"pageid": 1, "title": "Q60235",
            "revisions": [
                {"revid": 12, "parentid": 11, "user": "Jane Doe", "timestamp": "2025-05-02T10:00:00Z"},
                {"revid": 13, "parentid": 12, "userhidden": true, "timestamp": "2025-05-03T10:00:00Z"}
            ]}]}}"#;
        let parsed: RevisionsResponse = serde_json::from_str(raw).unwrap();
        let revisions = parsed.into_descriptors();
        assert_eq!(revisions.len(), 2);
        assert_eq!(revisions[0].revision_id, 12);
        assert_eq!(revisions[0].editor.as_deref(), Some("Jane Doe"));
        assert_eq!(revisions[1].editor, None);
    }

    #[test]
    fn missing_page_has_no_revisions() {
        let raw = r#"{"query": {"pages": [{"title": "Q0", "missing": true}]}}"#;
        let parsed: RevisionsResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.into_descriptors().is_empty());
    }

    #[test]
    fn entity_snapshot_reads_label_and_taxa() {
        let raw = r#"{"entities": {"Q60235": {
            "labels": {"en": {"language": "en", "value": "caffeine"}},
            "claims": {"P703": [
                {"mainsnak": {"snaktype": "value", "datavalue": {"type": "wikibase-entityid",
                    "value": {"entity-type": "item", "id": "Q158767"}}}},
                {"mainsnak": {"snaktype": "somevalue"}}
            ]}
        }}}"#;
        let parsed: EntityDataResponse = serde_json::from_str(raw).unwrap();
        let snapshot = parsed
            .into_entity(&EntityId::from("Q60235"))
            .unwrap()
            .snapshot();
        assert_eq!(snapshot.label.as_deref(), Some("caffeine"));
        assert_eq!(
            snapshot.relation_targets,
            BTreeSet::from([EntityId::from("Q158767")])
        );
    }

    #[test]
    fn entity_without_english_label() {
        let raw = r#"{"entities": {"Q1": {"labels": {"fr": {"language": "fr", "value": "x"}}}}}"#;
        let parsed: EntityDataResponse = serde_json::from_str(raw).unwrap();
        let snapshot = parsed.into_entity(&EntityId::from("Q1")).unwrap().snapshot();
        assert_eq!(snapshot.label, None);
        assert!(snapshot.relation_targets.is_empty());
    }

    #[test]
    fn redirected_entity_is_followed() {
        let raw = r#"{"entities": {"Q2": {"labels": {}}}}"#;
        let parsed: EntityDataResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.into_entity(&EntityId::from("Q1")).is_some());
    }

    #[rstest]
    #[case(Some("Q756"), "🌿")]
    #[case(Some("Q764"), "🍄")]
    #[case(Some("Q729"), "🐛")]
    #[case(Some("Q10876"), "🦠")]
    #[case(None, "🧬")]
    fn kingdom_emojis(#[case] kingdom: Option<&str>, #[case] expected: &str) {
        let id = kingdom.map(EntityId::from);
        assert_eq!(kingdom_emoji(id.as_ref()), expected);
    }

    #[test]
    fn details_row_defaults_unknown_reference() {
        let row: Binding = serde_json::from_str(
            r#"{
                "compound": {"type": "uri", "value": "http://www.wikidata.org/entity/Q60235"},
                "compoundLabel": {"type": "literal", "value": "caffeine"},
                "taxon": {"type": "uri", "value": "http://www.wikidata.org/entity/Q158767"},
                "taxonLabel": {"type": "literal", "value": "Coffea arabica"},
                "smiles": {"type": "literal", "value": "C=O"},
                "kingdom": {"type": "uri", "value": "http://www.wikidata.org/entity/Q756"},
                "kingdomLabel": {"type": "literal", "value": "Plantae"}
            }"#,
        )
        .unwrap();
        let details = details_from_row(&row);
        assert_eq!(details.reference, UNKNOWN_REFERENCE);
        assert_eq!(details.reference_id, EntityId::from("unknown"));
        assert_eq!(details.taxon_emoji, "🌿");
        assert!(details.image_url.contains("smiles=C%3DO&width=300"));
    }
}
