//! Typed catalog document model and entry merging.
//!
//! The document is the single authoritative record of every submission,
//! stored as JSON inside the content repository. Parsing is strict on
//! purpose: a lenient parse would let a rewrite silently drop content the
//! model did not capture.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::entry::{Category, ValidatedEntry};
use crate::error::{SubmitError, SubmitResult};

/// Default relative path of the catalog document inside the repository.
pub const DEFAULT_DOCUMENT_PATH: &str = "urls.json";

/// A published-work record. The historical schema stores the display title
/// under the `sefer` key for this category; the on-disk name is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PublishedWork {
    pub sefer: String,
    pub description: String,
    pub url: String,
}

/// A media-appearance record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MediaAppearance {
    pub title: String,
    pub url: String,
}

impl PublishedWork {
    /// Display title of the record (serialized under the `sefer` key).
    pub fn title(&self) -> &str {
        &self.sefer
    }
}

/// The category-keyed catalog document.
///
/// Both top-level keys must be present and no others are allowed; records
/// are kept in append order and never reordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentDocument {
    pub published_works: Vec<PublishedWork>,
    pub media_appearances: Vec<MediaAppearance>,
}

impl ContentDocument {
    /// A document with no records.
    pub fn empty() -> Self {
        Self {
            published_works: Vec::new(),
            media_appearances: Vec::new(),
        }
    }

    /// Parse a serialized document, strictly.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Append one validated entry's record to its category list.
    pub fn append(&mut self, entry: &ValidatedEntry) {
        match entry.category {
            Category::PublishedWork => self.published_works.push(PublishedWork {
                sefer: entry.title.clone(),
                description: entry.description.clone(),
                url: entry.url.clone(),
            }),
            Category::MediaAppearance => self.media_appearances.push(MediaAppearance {
                title: entry.title.clone(),
                url: entry.url.clone(),
            }),
        }
    }

    /// Total number of records across all categories.
    pub fn len(&self) -> usize {
        self.published_works.len() + self.media_appearances.len()
    }

    /// True when no category holds any record.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialize with stable, human-diffable formatting: pretty-printed with
    /// two-space indent and a trailing newline.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        let mut out = serde_json::to_string_pretty(self)?;
        out.push('\n');
        Ok(out)
    }
}

/// Read the document at `path`, append every entry in order, and write the
/// result back to the same path. Exactly one read and one write; no network
/// access. Returns the merged document.
pub fn merge_entries(path: &Path, entries: &[ValidatedEntry]) -> SubmitResult<ContentDocument> {
    let shown = path.display().to_string();

    let raw = fs::read_to_string(path)
        .map_err(|e| SubmitError::document_corrupt(&shown, format!("cannot read: {e}")))?;
    let mut document = ContentDocument::parse(&raw)
        .map_err(|e| SubmitError::document_corrupt(&shown, e.to_string()))?;

    for entry in entries {
        document.append(entry);
    }

    let serialized = document
        .to_pretty_json()
        .map_err(|e| SubmitError::document_corrupt(&shown, format!("cannot serialize: {e}")))?;
    fs::write(path, serialized)
        .map_err(|e| SubmitError::document_corrupt(&shown, format!("cannot write back: {e}")))?;

    Ok(document)
}
