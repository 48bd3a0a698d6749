//! Daily LOTUS core library: domain types, the record log and configuration.
//!
//! - [`types`]: newtypes and domain structs
//! - [`store`]: JSON record log and the [`RecordStore`] seam
//! - [`config`]: YAML configuration
//! - [`error`]: [`StoreError`], [`ConfigError`]

pub mod config;
pub mod error;
pub mod store;
pub mod timestamp;
pub mod types;

pub use config::Config;
pub use error::{ConfigError, StoreError};
pub use store::{JsonRecordStore, MemoryRecordStore, RecordStore};
pub use types::{
    ChangeRecord, EntityId, LiveLabels, MoleculeDetails, PublicationId, ReconciliationOutcome,
    RevisionDescriptor, TrackedField, TrackedRecord,
};
