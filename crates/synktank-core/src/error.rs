//! Error types for synktank-core

use thiserror::Error;

use crate::models::{Memo, MemoId};

/// Result type alias using synktank-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in synktank-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Memo not found
    #[error("Memo not found: {0}")]
    NotFound(String),

    /// Remote store rejected or failed a request
    #[error("Store error: {0}")]
    Store(String),

    /// SQLite error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Transport error talking to a remote store
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The permanent copy exists but the temporary source could not be removed
    #[error("{0}")]
    PartialPromotion(Box<PartialPromotion>),

    /// Another promotion of the same temporary memo has not settled yet
    #[error("Promotion already in progress for memo {0}")]
    PromotionInProgress(MemoId),
}

impl Error {
    /// Whether the target memo was absent.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether this is a transport/server failure of the store.
    pub const fn is_store_error(&self) -> bool {
        matches!(
            self,
            Self::Store(_) | Self::Database(_) | Self::Http(_) | Self::Io(_)
        )
    }

    /// The partial promotion payload, if this is one.
    pub fn as_partial_promotion(&self) -> Option<&PartialPromotion> {
        match self {
            Self::PartialPromotion(partial) => Some(partial),
            _ => None,
        }
    }
}

/// Promotion state after step 1 (create) succeeded and step 2 (delete) failed.
///
/// Both copies exist. Only the delete of `temporary_id` may be retried;
/// repeating the whole promotion would create a second permanent memo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialPromotion {
    /// The temporary memo that still has to be deleted
    pub temporary_id: MemoId,
    /// The permanent memo created by step 1
    pub permanent: Memo,
    /// Why the delete failed
    pub reason: String,
}

impl std::fmt::Display for PartialPromotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Memo promoted to {} but temporary memo {} was not removed: {}",
            self.permanent.id, self.temporary_id, self.reason
        )
    }
}
