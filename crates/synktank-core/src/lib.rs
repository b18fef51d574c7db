//! synktank-core - Core library for SynkTank
//!
//! Memo models, the persistence contract with its SQLite, Supabase and
//! in-memory stores, and the editing engine (debounced autosave, list
//! caches, two-step promotion) shared by every SynkTank client.

pub mod config;
pub mod editor;
pub mod error;
pub mod list;
pub mod models;
pub mod notify;
pub mod promotion;
pub mod services;
pub mod store;

pub use config::{EngineConfig, StoreConfig, StoreSettings};
pub use editor::{DebounceScheduler, DocumentBuffer, MemoEditor};
pub use error::{Error, PartialPromotion, Result};
pub use list::ListCache;
pub use models::{Collection, Memo, MemoId};
pub use notify::{CollectingNotifier, Notifier, TracingNotifier};
pub use promotion::{PromotionCoordinator, PromotionState};
pub use services::MemoService;
pub use store::{MemoStore, MemoryStore, SqliteMemoStore, SupabaseMemoStore};
