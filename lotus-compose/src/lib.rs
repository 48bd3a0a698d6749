//! # lotus-compose
//!
//! Tera-based composition of the daily occurrence post and of the follow-up
//! reply sent when a published occurrence is edited or removed.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lotus_compose::Composer;
//! use lotus_core::types::MoleculeDetails;
//!
//! fn print_post(details: &MoleculeDetails) {
//!     if let Ok(composer) = Composer::new(500) {
//!         match composer.occurrence_post(details) {
//!             Ok(text) => println!("{text}"),
//!             Err(err) => eprintln!("{err}"),
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::{OccurrenceContext, ReplyContext};
pub use engine::Composer;
pub use error::ComposeError;
