//! Error types for lotus-compose.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from composing post text.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// Tera template engine error.
    #[error("template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// Filesystem error while loading user templates.
    #[error("template io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Even the shortest variant exceeds the instance character limit.
    #[error("message too long even after all shortening steps ({length} > {limit} characters)")]
    MessageTooLong { length: usize, limit: usize },
}
