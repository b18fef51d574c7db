//! Data models for SynkTank

mod memo;

pub use memo::{sort_newest_first, Collection, Memo, MemoId, EMPTY_PREVIEW, PREVIEW_CHARS};
