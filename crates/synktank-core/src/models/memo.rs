//! Memo model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Placeholder shown in previews for memos without visible text
pub const EMPTY_PREVIEW: &str = "Empty memo";

/// Character budget for list previews
pub const PREVIEW_CHARS: usize = 100;

/// A unique identifier for a memo, using UUID v7 (time-sortable)
///
/// Ordering matches the ordering of the lowercase hyphenated string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemoId(Uuid);

impl MemoId {
    /// Create a new unique memo ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for MemoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MemoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MemoId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The store partition a memo belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Temporary,
    Permanent,
}

impl Collection {
    /// Table name used by the SQL and REST stores
    #[must_use]
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::Temporary => "temporary_memos",
            Self::Permanent => "permanent_memos",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Temporary => f.write_str("temporary"),
            Self::Permanent => f.write_str("permanent"),
        }
    }
}

/// A memo in one of the two collections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memo {
    /// Unique identifier, assigned at creation
    pub id: MemoId,
    /// Which partition holds this memo
    pub collection: Collection,
    /// Opaque text content
    pub content: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last persisted write (Unix ms)
    pub updated_at: i64,
}

impl Memo {
    /// Create a new memo with the given content
    #[must_use]
    pub fn new(collection: Collection, content: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: MemoId::new(),
            collection,
            content: content.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if memo content is empty (whitespace-only counts as empty)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// List preview: placeholder for empty memos, otherwise the first
    /// `max_chars` characters followed by `...` when cut.
    #[must_use]
    pub fn preview(&self, max_chars: usize) -> String {
        if self.is_empty() {
            return EMPTY_PREVIEW.to_string();
        }
        if self.content.chars().count() <= max_chars {
            return self.content.clone();
        }
        let mut truncated = self.content.chars().take(max_chars).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

/// Newest first, ties by id ascending.
pub fn sort_newest_first(memos: &mut [Memo]) {
    memos.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}
