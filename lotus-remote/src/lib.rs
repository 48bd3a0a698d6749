//! # lotus-remote
//!
//! Blocking `ureq` clients for the services the bot talks to: Wikidata
//! (SPARQL, the MediaWiki API and `Special:EntityData`) and Mastodon.

mod http;
pub mod mastodon;
pub mod sparql;
pub mod wikidata;

pub use mastodon::MastodonClient;
pub use wikidata::WikidataClient;
