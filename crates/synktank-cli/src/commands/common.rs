use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use serde::Serialize;
use synktank_core::models::{EMPTY_PREVIEW, PREVIEW_CHARS};
use synktank_core::{CollectingNotifier, Collection, Memo, MemoId, MemoService, StoreSettings};

use crate::error::CliError;

/// Everything a command needs: the service plus the notifications it raised.
pub struct Session {
    pub service: MemoService,
    pub notifier: CollectingNotifier,
}

impl Session {
    pub fn open(settings: &StoreSettings) -> Result<Self, CliError> {
        let store_config = settings.store_config(default_db_path)?;
        tracing::debug!("Store: {:?}", store_config);

        let store = store_config.open()?;
        let notifier = CollectingNotifier::new();
        let service = MemoService::new(
            store,
            Arc::new(notifier.clone()),
            settings.engine_config(),
        );
        Ok(Self { service, notifier })
    }
}

#[derive(Debug, Serialize)]
pub struct MemoListItem {
    pub id: String,
    pub collection: Collection,
    pub preview: String,
    pub content: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub relative_time: String,
}

pub const fn collection_for(permanent: bool) -> Collection {
    if permanent {
        Collection::Permanent
    } else {
        Collection::Temporary
    }
}

pub fn parse_memo_id(id: &str) -> Result<MemoId, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyMemoId);
    }
    trimmed
        .parse::<MemoId>()
        .map_err(|_| CliError::InvalidMemoId(trimmed.to_string()))
}

pub fn format_memo_lines(memos: &[Memo]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    memos
        .iter()
        .map(|memo| {
            let preview = memo_preview(memo, 40);
            let relative_time = format_relative_time(memo.updated_at, now_ms);
            format!("{}  {preview:<40}  {relative_time}", memo.id)
        })
        .collect()
}

pub fn memo_to_list_item(memo: &Memo) -> MemoListItem {
    let now_ms = Utc::now().timestamp_millis();
    MemoListItem {
        id: memo.id.to_string(),
        collection: memo.collection,
        preview: memo.preview(PREVIEW_CHARS),
        content: memo.content.clone(),
        created_at: memo.created_at,
        updated_at: memo.updated_at,
        relative_time: format_relative_time(memo.updated_at, now_ms),
    }
}

/// One-line preview for terminal columns.
pub fn memo_preview(memo: &Memo, max_chars: usize) -> String {
    if memo.is_empty() {
        return EMPTY_PREVIEW.to_string();
    }
    let first_line = memo
        .content
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("");
    let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

/// "just now", minutes, hours, then days for the last week; older
/// timestamps show their date.
pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else {
        format_date(timestamp_ms)
    }
}

pub fn format_date(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d").to_string(),
    )
}

/// Content given on the command line, or empty.
pub fn join_content(content_parts: &[String]) -> String {
    content_parts.join(" ").trim().to_string()
}

/// Open `initial_content` in the user's editor and return the saved text.
pub fn capture_editor_input_with_initial(initial_content: &str) -> Result<String, CliError> {
    let editor = preferred_editor();
    let temp_file = create_temp_memo_file_path();
    std::fs::write(&temp_file, initial_content)?;

    let launch_result = launch_editor(&editor, &temp_file);
    let memo_content = std::fs::read_to_string(&temp_file)?;
    let _ = std::fs::remove_file(&temp_file);

    launch_result?;
    Ok(strip_editor_newline(&memo_content))
}

/// Editors add a final newline on save; drop exactly one.
pub fn strip_editor_newline(content: &str) -> String {
    content
        .strip_suffix("\r\n")
        .or_else(|| content.strip_suffix('\n'))
        .unwrap_or(content)
        .to_string()
}

pub fn launch_editor(editor: &str, file_path: &Path) -> Result<(), CliError> {
    match Command::new(editor).arg(file_path).status() {
        Ok(status) => {
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            let mut parts = editor.split_whitespace();
            let Some(program) = parts.next() else {
                return Err(CliError::EditorFailed("empty EDITOR command".into()));
            };

            let mut command = Command::new(program);
            command.args(parts).arg(file_path);

            let status = command.status()?;
            if status.success() {
                Ok(())
            } else {
                Err(CliError::EditorFailed(format!(
                    "`{editor}` exited with status {status}"
                )))
            }
        }
        Err(err) => Err(CliError::Io(err)),
    }
}

pub fn preferred_editor() -> String {
    env::var("VISUAL")
        .or_else(|_| env::var("EDITOR"))
        .unwrap_or_else(|_| default_editor().to_string())
}

pub const fn default_editor() -> &'static str {
    if cfg!(windows) {
        "notepad"
    } else {
        "vi"
    }
}

pub fn create_temp_memo_file_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos());
    env::temp_dir().join(format!("synktank-memo-{}-{now}.md", std::process::id()))
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(env::temp_dir)
        .join("synktank")
        .join("synktank.db")
}
