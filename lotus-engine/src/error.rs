//! Error types for lotus-engine.

use std::path::PathBuf;

use thiserror::Error;

use lotus_compose::ComposeError;
use lotus_core::{types::EntityId, StoreError};

/// Failure of a single call to an external capability.
///
/// Each call is one attempt; retrying is up to the implementation.
#[derive(Debug, Error)]
pub enum AccessorError {
    /// The request did not complete (network, timeout, HTTP status).
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    /// The response arrived but could not be understood.
    #[error("unexpected response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    /// The entity or revision does not exist remotely.
    #[error("entity {entity} not found")]
    MissingEntity { entity: EntityId },

    #[error("missing credentials: {0}")]
    MissingCredentials(String),
}

/// All errors that can arise from engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An accessor failed while checking one record; the record is untouched.
    #[error("accessor unavailable while checking {compound} in {taxon}: {source}")]
    AccessorUnavailable {
        compound: EntityId,
        taxon: EntityId,
        #[source]
        source: AccessorError,
    },

    /// Publishing failed; nothing was recorded.
    #[error("publish failed: {0}")]
    Publish(#[source] AccessorError),

    /// Fetching candidates failed before any candidate was tried.
    #[error("candidate lookup failed: {0}")]
    Candidates(#[source] AccessorError),

    /// A live run was requested without a publisher.
    #[error("no publisher configured for a live run")]
    PublisherRequired,

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("compose error: {0}")]
    Compose(#[from] ComposeError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("candidate cache JSON error at {path}: {source}")]
    CandidateCache {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> EngineError {
    EngineError::Io {
        path: path.into(),
        source,
    }
}
