//! Common types and utilities shared across harvest crates.
//!
//! This crate defines the collected data model, the shared error type, text
//! normalization helpers, and observability setup used throughout the
//! workspace. It stays dependency-light so every crate can depend on it.
//!
//! # Overview
//!
//! - [`ParentItem`] and [`Comment`]: what the query and expansion stages produce
//! - [`FailurePolicy`]: how a run reacts to one parent failing
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`HarvestError`] and [`Result`]: Shared error handling
//! - [`single_line`]: Line-break folding for one-row-per-record output
//!
//! # Examples
//!
//! ```rust
//! use harvest_common::single_line;
//!
//! assert_eq!(single_line("first\r\nsecond\nthird"), "first second third");
//! ```
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

pub mod observability;

/// A post or video returned by a keyword search.
///
/// Produced by the query stage and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParentItem {
    /// Platform identifier (Reddit post id, YouTube video id).
    pub id: String,
    /// Display title, when the platform provides one.
    pub title: Option<String>,
    /// Submitter or channel name.
    pub author: Option<String>,
    pub created: Option<DateTime<Utc>>,
}

/// A concrete comment owned by a [`ParentItem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    /// Identifier of the owning parent item (not the replied-to comment).
    pub parent_id: String,
    /// `None` when the account was deleted or anonymized.
    pub author: Option<String>,
    pub body: String,
    /// Upvote score or like count.
    pub score: i64,
    pub created: Option<DateTime<Utc>>,
}

/// What to do when fetching one parent's comments fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the failure, treat the parent as having no comments, keep going.
    #[default]
    Skip,
    /// Fail the whole run.
    Abort,
}

/// Error types used across the harvest workspace.
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    /// A remote call failed: network, HTTP status, or exhausted quota.
    #[error("transport error: {0}")]
    Transport(String),

    /// A remote call succeeded but its payload could not be understood.
    #[error("decode error: {0}")]
    Decode(String),

    /// Configuration was incomplete or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Rows could not be serialized or persisted.
    #[error("output error: {0}")]
    Output(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    /// Whether the failure came from talking to a remote endpoint.
    ///
    /// Decode failures count as remote failures: a single malformed response
    /// says nothing about the health of the rest of the run.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Decode(_))
    }
}

/// Convenient alias for results that use [`HarvestError`].
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Characters that some CSV readers treat as the end of a record.
const LINE_BREAKS: [char; 5] = ['\n', '\r', '\u{85}', '\u{2028}', '\u{2029}'];

/// Fold every line break into a single space.
///
/// `\r\n` counts as one break. NEL, LINE SEPARATOR and PARAGRAPH SEPARATOR
/// are folded as well. Borrows the input when it holds no line breaks.
pub fn single_line(text: &str) -> Cow<'_, str> {
    if !text.contains(LINE_BREAKS) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push(' ');
            }
            c if LINE_BREAKS.contains(&c) => out.push(' '),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}
