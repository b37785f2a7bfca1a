//! Wire-level submission entries and batch validation.
//!
//! Entries arrive from the transport with the category as a raw token;
//! validation resolves it to [`Category`] and enforces the per-field rules
//! before any repository work starts.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SubmitError, SubmitResult};

/// One contributed item as received from the transport.
///
/// `description` may be absent on the wire and defaults to empty; categories
/// that need one reject the entry during validation instead. The category is
/// the lower-cased snake_case token the client produces (`published_works`,
/// `media_appearances`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionEntry {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
}

/// Closed set of catalog categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "published_works")]
    PublishedWork,
    #[serde(rename = "media_appearances")]
    MediaAppearance,
}

impl Category {
    /// Resolve a wire token to a category.
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "published_works" => Some(Self::PublishedWork),
            "media_appearances" => Some(Self::MediaAppearance),
            _ => None,
        }
    }

    /// The wire token for this category.
    pub fn token(&self) -> &'static str {
        match self {
            Self::PublishedWork => "published_works",
            Self::MediaAppearance => "media_appearances",
        }
    }

    /// Whether entries in this category must carry a description.
    pub fn requires_description(&self) -> bool {
        matches!(self, Self::PublishedWork)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// A submission entry that passed validation, with its category resolved.
/// Field content is unchanged from the wire.
#[derive(Debug, Clone)]
pub struct ValidatedEntry {
    pub url: String,
    pub title: String,
    pub description: String,
    pub category: Category,
}

/// Validate a submitted batch, all or nothing.
///
/// Every entry must carry a non-empty `url` and `title` and a known category
/// token; published-work entries must also carry a non-empty `description`.
/// Whitespace-only fields count as empty. The first failing entry rejects
/// the whole batch, and an empty batch is rejected outright. No filesystem
/// or repository access happens here.
pub fn validate_batch(entries: &[SubmissionEntry]) -> SubmitResult<Vec<ValidatedEntry>> {
    if entries.is_empty() {
        return Err(SubmitError::validation("empty submission batch"));
    }

    let mut validated = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        if entry.url.trim().is_empty() {
            return Err(SubmitError::validation(format!("entry {index}: url is empty")));
        }
        if entry.title.trim().is_empty() {
            return Err(SubmitError::validation(format!(
                "entry {index}: title is empty"
            )));
        }
        let category = Category::parse(&entry.category).ok_or_else(|| {
            SubmitError::validation(format!(
                "entry {index}: unknown category \"{}\"",
                entry.category
            ))
        })?;
        if category.requires_description() && entry.description.trim().is_empty() {
            return Err(SubmitError::validation(format!(
                "entry {index}: description is required for {category}"
            )));
        }

        validated.push(ValidatedEntry {
            url: entry.url.clone(),
            title: entry.title.clone(),
            description: entry.description.clone(),
            category,
        });
    }

    Ok(validated)
}
