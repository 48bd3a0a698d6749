//! # lotus-engine
//!
//! Edit detection and the daily post flow.
//!
//! [`check_edits`] reconciles every tracked record against the live knowledge
//! base, attributes what changed and replies under the original post.
//! [`post_daily`] picks a new occurrence and publishes it. Both reach the
//! outside world only through the traits in [`accessor`].

pub mod accessor;
pub mod attribution;
pub mod daily;
pub mod error;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod reconcile;
pub mod sweep;

pub use accessor::{
    CandidateSource, EntitySnapshot, LiveState, Media, Post, Publisher, RevisionSource,
};
pub use attribution::Attributor;
pub use daily::{attachments, post_daily, refresh_candidates, DailyOptions, DailyOutcome};
pub use error::{AccessorError, EngineError};
pub use reconcile::{RecordCheck, Reconciler};
pub use sweep::{check_edits, SweepOptions, SweepReport};
