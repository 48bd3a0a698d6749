//! SPARQL protocol client and the queries the bot runs.

use std::collections::HashMap;

use serde::Deserialize;

use lotus_core::types::EntityId;
use lotus_engine::AccessorError;

use crate::http;

/// One row of a SELECT result, keyed by variable name.
pub type Binding = HashMap<String, BindingValue>;

#[derive(Debug, Clone, Deserialize)]
pub struct BindingValue {
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct SelectResponse {
    results: SelectResults,
}

#[derive(Debug, Deserialize)]
struct SelectResults {
    #[serde(default)]
    bindings: Vec<Binding>,
}

#[derive(Debug, Deserialize)]
struct AskResponse {
    boolean: bool,
}

pub struct SparqlClient {
    endpoint: String,
    agent: ureq::Agent,
}

impl SparqlClient {
    pub fn new(endpoint: impl Into<String>, agent: ureq::Agent) -> Self {
        Self {
            endpoint: endpoint.into(),
            agent,
        }
    }

    fn request(&self, query: &str) -> ureq::Request {
        self.agent
            .get(&self.endpoint)
            .set("Accept", "application/sparql-results+json")
            .query("query", query)
            .query("format", "json")
    }

    pub fn ask(&self, query: &str) -> Result<bool, AccessorError> {
        let response: Option<AskResponse> = http::call_json(&self.endpoint, self.request(query))?;
        response.map(|r| r.boolean).ok_or_else(|| self.not_found())
    }

    pub fn select(&self, query: &str) -> Result<Vec<Binding>, AccessorError> {
        let response: Option<SelectResponse> =
            http::call_json(&self.endpoint, self.request(query))?;
        response
            .map(|r| r.results.bindings)
            .ok_or_else(|| self.not_found())
    }

    fn not_found(&self) -> AccessorError {
        AccessorError::Transport {
            endpoint: self.endpoint.clone(),
            message: "HTTP 404".to_owned(),
        }
    }
}

/// The text value of `var`, or `""` when unbound.
pub fn value<'a>(row: &'a Binding, var: &str) -> &'a str {
    row.get(var).map(|v| v.value.as_str()).unwrap_or("")
}

/// The entity id at the end of an entity URI bound to `var`.
pub fn entity(row: &Binding, var: &str) -> Option<EntityId> {
    row.get(var)
        .and_then(|v| v.value.rsplit('/').next())
        .filter(|id| !id.is_empty())
        .map(EntityId::from)
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

pub fn relation_query(compound: &EntityId, taxon: &EntityId) -> String {
    format!("ASK {{ wd:{compound} wdt:P703 wd:{taxon} . }}")
}

pub fn labels_query(
    compound: &EntityId,
    taxon: &EntityId,
    reference: &EntityId,
    scholarly_endpoint: &str,
) -> String {
    format!(
        r#"SELECT ?compoundLabel ?taxonLabel ?referenceLabel WHERE {{
  VALUES ?compound {{ wd:{compound} }}
  VALUES ?taxon {{ wd:{taxon} }}
  VALUES ?reference {{ wd:{reference} }}
  OPTIONAL {{ ?compound rdfs:label ?compoundLabel . FILTER(LANG(?compoundLabel) = "en") }}
  OPTIONAL {{ ?taxon rdfs:label ?taxonLabel . FILTER(LANG(?taxonLabel) = "en") }}
  SERVICE <{scholarly_endpoint}> {{
    OPTIONAL {{ ?reference rdfs:label ?referenceLabel . FILTER(LANG(?referenceLabel) = "en") }}
  }}
}}"#
    )
}

pub fn candidates_query() -> &'static str {
    r#"SELECT DISTINCT ?compound WHERE {
  ?compound wdt:P703 ?taxon ;
            wdt:P233 [] .
  ?taxon wdt:P18 ?image .
}
LIMIT 500000"#
}

pub fn details_query(compound: &EntityId, scholarly_endpoint: &str) -> String {
    format!(
        r#"SELECT ?compoundLabel ?compound ?taxon ?taxonLabel ?reference ?referenceLabel ?smiles ?taxon_image ?kingdom ?kingdomLabel WHERE {{
  VALUES ?compound {{ wd:{compound} }}
  ?compound wdt:P233 ?smiles_c .
  OPTIONAL {{ ?compound wdt:P2017 ?smiles_i . }}
  BIND(COALESCE(?smiles_i, ?smiles_c) AS ?smiles)
  FILTER(BOUND(?smiles))
  ?compound p:P703 ?statement .
  ?statement ps:P703 ?taxon ;
             prov:wasDerivedFrom ?refnode .
  ?refnode pr:P248 ?reference .
  ?taxon wdt:P18 ?taxon_image .
  ?taxon wdt:P171* ?kingdom .
  FILTER(?kingdom IN (wd:Q729, wd:Q756, wd:Q764, wd:Q10876))
  ?kingdom rdfs:label ?kingdomLabel . FILTER(LANG(?kingdomLabel) = "en")
  ?compound rdfs:label ?compoundLabel . FILTER(LANG(?compoundLabel) = "en")
  ?taxon rdfs:label ?taxonLabel . FILTER(LANG(?taxonLabel) = "en")
  SERVICE <{scholarly_endpoint}> {{
    ?reference rdfs:label ?referenceLabel . FILTER(LANG(?referenceLabel) = "en")
  }}
}}
LIMIT 10"#
    )
}
