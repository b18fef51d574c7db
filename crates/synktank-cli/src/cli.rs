use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "synktank")]
#[command(about = "Jot temporary memos and keep the ones worth keeping")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Autosave quiet period in milliseconds
    #[arg(long, global = true, value_name = "MS")]
    pub debounce_ms: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new memo (temporary unless --permanent)
    #[command(alias = "add")]
    New {
        /// Create in the permanent collection
        #[arg(long)]
        permanent: bool,
        /// Memo content (empty when omitted)
        content: Vec<String>,
    },
    /// List memos, most recently updated first
    List {
        /// List the permanent collection
        #[arg(long)]
        permanent: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a memo's content
    Show {
        /// Memo ID
        id: String,
        /// Look in the permanent collection
        #[arg(long)]
        permanent: bool,
    },
    /// Edit a memo in $VISUAL / $EDITOR
    Edit {
        /// Memo ID
        id: String,
        /// Edit a permanent memo
        #[arg(long)]
        permanent: bool,
    },
    /// Append stdin lines to a memo, autosaving as they arrive
    Append {
        /// Memo ID
        id: String,
        /// Append to a permanent memo
        #[arg(long)]
        permanent: bool,
    },
    /// Delete a temporary memo
    Delete {
        /// Memo ID
        id: String,
    },
    /// Move a temporary memo into the permanent collection
    Promote {
        /// Temporary memo ID
        id: String,
    },
    /// Remove the temporary copy left behind by an interrupted promotion
    FinishPromotion {
        /// Temporary memo ID
        id: String,
    },
}
