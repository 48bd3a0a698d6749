//! Tera composition engine: [`Composer`].
//!
//! | Template               | Output                                  |
//! |------------------------|-----------------------------------------|
//! | `occurrence.txt.tera`  | daily "occurrence of the day" post      |
//! | `edit_reply.txt.tera`  | reply reporting edits or a removal      |
//!
//! A `.tera` file with the same name in a user template directory replaces
//! the embedded default.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tera::Tera;

use lotus_core::types::{MoleculeDetails, ReconciliationOutcome, TrackedRecord};

use crate::context::{OccurrenceContext, ReplyContext};
use crate::error::ComposeError;

pub const OCCURRENCE_TEMPLATE: &str = "occurrence.txt.tera";
pub const REPLY_TEMPLATE: &str = "edit_reply.txt.tera";

// Embedded templates, baked into the binary via include_str!
const TPLS: &[(&str, &str)] = &[
    (OCCURRENCE_TEMPLATE, include_str!("templates/occurrence.txt.tera")),
    (REPLY_TEMPLATE, include_str!("templates/edit_reply.txt.tera")),
];

fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ComposeError {
    ComposeError::Io {
        path: path.into(),
        source,
    }
}

fn load_user_templates(dir: &Path) -> Result<Vec<(String, String)>, ComposeError> {
    if !dir.exists() {
        return Ok(vec![]);
    }
    let mut templates = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let path = entry.map_err(|e| io_err(dir, e))?.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("tera") {
            continue;
        }
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_lowercase()) else {
            continue;
        };
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        templates.push((name, contents));
    }
    Ok(templates)
}

fn build_tera(user_template_dir: Option<&Path>) -> Result<Tera, ComposeError> {
    let mut templates: HashMap<String, String> = TPLS
        .iter()
        .map(|(name, content)| ((*name).to_owned(), (*content).to_owned()))
        .collect();
    if let Some(dir) = user_template_dir {
        templates.extend(load_user_templates(dir)?);
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(templates.into_iter().collect::<Vec<_>>())?;
    Ok(tera)
}

/// Composes post and reply text. Create once and reuse.
pub struct Composer {
    tera: Tera,
    max_length: usize,
}

impl Composer {
    /// Embedded templates only.
    pub fn new(max_length: usize) -> Result<Self, ComposeError> {
        Self::with_template_dir(None, max_length)
    }

    /// Embedded templates plus any overrides found in `user_template_dir`.
    pub fn with_template_dir(
        user_template_dir: Option<&Path>,
        max_length: usize,
    ) -> Result<Self, ComposeError> {
        Ok(Self {
            tera: build_tera(user_template_dir)?,
            max_length,
        })
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Compose the daily post, shortening it until it fits `max_length`.
    ///
    /// Shortening order: drop the project hashtags, then reduce the
    /// reference to its bare link.
    pub fn occurrence_post(&self, details: &MoleculeDetails) -> Result<String, ComposeError> {
        let mut ctx = OccurrenceContext::from_details(details);
        let mut message = self.render(OCCURRENCE_TEMPLATE, &ctx.to_tera_context()?)?;
        if self.fits(&message) {
            return Ok(message);
        }

        ctx.hashtags = false;
        message = self.render(OCCURRENCE_TEMPLATE, &ctx.to_tera_context()?)?;
        if self.fits(&message) {
            tracing::debug!(length = message.chars().count(), "removed hashtags");
            return Ok(message);
        }

        ctx.short_reference = true;
        message = self.render(OCCURRENCE_TEMPLATE, &ctx.to_tera_context()?)?;
        if self.fits(&message) {
            tracing::debug!(
                length = message.chars().count(),
                "removed hashtags and shortened reference"
            );
            return Ok(message);
        }

        Err(ComposeError::MessageTooLong {
            length: message.chars().count(),
            limit: self.max_length,
        })
    }

    /// Compose the reply for a detected change. Editors are listed sorted.
    pub fn edit_reply(
        &self,
        record: &TrackedRecord,
        outcome: &ReconciliationOutcome,
    ) -> Result<String, ComposeError> {
        let ctx = ReplyContext::from_outcome(record, outcome);
        self.render(REPLY_TEMPLATE, &ctx.to_tera_context()?)
    }

    fn render(&self, name: &str, ctx: &tera::Context) -> Result<String, ComposeError> {
        let rendered = self.tera.render(name, ctx)?;
        Ok(rendered.trim_end().to_owned())
    }

    fn fits(&self, message: &str) -> bool {
        message.chars().count() <= self.max_length
    }
}
