use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use pretty_assertions::assert_eq;
use synktank_core::store::StoreOp;
use synktank_core::{
    CollectingNotifier, Collection, EngineConfig, Memo, MemoService, MemoryStore, StoreConfig,
    StoreSettings,
};

use crate::cli::{Cli, Commands};
use crate::commands::append::append_line;
use crate::commands::common::{
    collection_for, default_editor, format_relative_time, join_content, memo_preview,
    memo_to_list_item, parse_memo_id, strip_editor_newline, Session,
};
use crate::commands::delete::run_delete;
use crate::commands::promote::{recovery_hint, run_finish_promotion};
use crate::config::{
    load_settings_from_path, settings_from_vars, ENV_DB_PATH, ENV_DEBOUNCE_MS, ENV_SUPABASE_URL,
};
use crate::error::CliError;
use crate::execute;

const MINUTE: i64 = 60_000;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map = pairs
        .iter()
        .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
        .collect::<HashMap<_, _>>();
    move |name| map.get(name).cloned()
}

fn sqlite_session(dir: &tempfile::TempDir) -> Session {
    let settings = StoreSettings {
        db_path: Some(dir.path().join("memos.db")),
        debounce_ms: Some(10),
        ..StoreSettings::default()
    };
    Session::open(&settings).unwrap()
}

fn memory_session(store: &MemoryStore) -> Session {
    let notifier = CollectingNotifier::new();
    let service = MemoService::new(
        Arc::new(store.clone()),
        Arc::new(notifier.clone()),
        EngineConfig::default(),
    );
    Session { service, notifier }
}

#[test]
fn default_editor_is_defined() {
    assert!(!default_editor().is_empty());
}

#[test]
fn format_relative_time_units() {
    let now = 100 * DAY;
    assert_eq!(format_relative_time(now - 30_000, now), "just now");
    assert_eq!(format_relative_time(now - 2 * MINUTE, now), "2m ago");
    assert_eq!(format_relative_time(now - 2 * HOUR, now), "2h ago");
    assert_eq!(format_relative_time(now - 6 * DAY, now), "6d ago");
}

#[test]
fn format_relative_time_falls_back_to_date_after_a_week() {
    let now = 100 * DAY;
    assert_eq!(format_relative_time(0, now), "1970-01-01");
    assert_eq!(format_relative_time(now - 7 * DAY, now), "1970-04-04");
}

#[test]
fn memo_preview_uses_placeholder_for_blank_memo() {
    let memo = Memo::new(Collection::Temporary, "  \n ");
    assert_eq!(memo_preview(&memo, 40), "Empty memo");
}

#[test]
fn memo_preview_truncates_with_ellipsis() {
    let memo = Memo::new(
        Collection::Temporary,
        "\nThis is a very long sentence that should be shortened",
    );
    assert_eq!(memo_preview(&memo, 20), "This is a very lo...");
}

#[test]
fn list_item_preview_keeps_first_hundred_chars() {
    let memo = Memo::new(Collection::Permanent, "x".repeat(120));
    let item = memo_to_list_item(&memo);
    assert_eq!(item.preview.chars().count(), 103);
    assert!(item.preview.ends_with("..."));
    assert_eq!(item.relative_time, "just now");
}

#[test]
fn parse_memo_id_validates_input() {
    assert!(matches!(parse_memo_id("   "), Err(CliError::EmptyMemoId)));
    assert!(matches!(
        parse_memo_id("not-a-uuid"),
        Err(CliError::InvalidMemoId(id)) if id == "not-a-uuid"
    ));

    let memo = Memo::new(Collection::Temporary, "");
    assert_eq!(parse_memo_id(&format!(" {} ", memo.id)).unwrap(), memo.id);
}

#[test]
fn collection_flag_maps_to_collection() {
    assert_eq!(collection_for(false), Collection::Temporary);
    assert_eq!(collection_for(true), Collection::Permanent);
}

#[test]
fn join_content_allows_empty_memo() {
    assert_eq!(join_content(&[]), "");
    assert_eq!(
        join_content(&["buy".to_string(), "milk".to_string()]),
        "buy milk"
    );
}

#[test]
fn append_line_separates_lines() {
    assert_eq!(append_line("", "first"), "first");
    assert_eq!(append_line("first", "second"), "first\nsecond");
    assert_eq!(append_line("first\n", "second"), "first\nsecond");
}

#[test]
fn strip_editor_newline_drops_one_trailing_newline() {
    assert_eq!(strip_editor_newline("draft\n"), "draft");
    assert_eq!(strip_editor_newline("draft\r\n"), "draft");
    assert_eq!(strip_editor_newline("draft\n\n"), "draft\n");
    assert_eq!(strip_editor_newline(""), "");
}

#[test]
fn recovery_hint_names_finish_command() {
    let hint = recovery_hint("0195f0c4-0000-7000-8000-000000000000");
    assert!(hint.contains("synktank finish-promotion 0195f0c4-0000-7000-8000-000000000000"));
}

#[test]
fn cli_parses_new_with_flags() {
    let cli = Cli::try_parse_from([
        "synktank",
        "--debounce-ms",
        "250",
        "new",
        "--permanent",
        "hello",
        "world",
    ])
    .unwrap();

    assert_eq!(cli.debounce_ms, Some(250));
    match cli.command {
        Some(Commands::New { permanent, content }) => {
            assert!(permanent);
            assert_eq!(content, vec!["hello", "world"]);
        }
        _ => panic!("expected new command"),
    }
}

#[test]
fn cli_parses_finish_promotion() {
    let cli = Cli::try_parse_from(["synktank", "finish-promotion", "abc"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::FinishPromotion { id }) if id == "abc"));
}

#[test]
fn env_settings_are_trimmed_and_parsed() {
    let settings = settings_from_vars(vars(&[
        (ENV_DB_PATH, " /data/memos.db "),
        (ENV_DEBOUNCE_MS, " 750 "),
        (ENV_SUPABASE_URL, "   "),
    ]))
    .unwrap();

    assert_eq!(settings.db_path, Some(PathBuf::from("/data/memos.db")));
    assert_eq!(settings.debounce_ms, Some(750));
    assert_eq!(settings.supabase_url, None);
}

#[test]
fn env_debounce_must_be_numeric() {
    let result = settings_from_vars(vars(&[(ENV_DEBOUNCE_MS, "soon")]));
    assert!(matches!(result, Err(CliError::Config(_))));
}

#[test]
fn missing_config_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let settings = load_settings_from_path(&dir.path().join("config.json")).unwrap();
    assert_eq!(settings, StoreSettings::default());
}

#[test]
fn config_file_values_are_normalized() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"supabase_url":" https://demo.supabase.co ","supabase_anon_key":" anon ","debounce_ms":300}"#,
    )
    .unwrap();

    let settings = load_settings_from_path(&path).unwrap();
    assert_eq!(
        settings.supabase_url.as_deref(),
        Some("https://demo.supabase.co")
    );
    assert_eq!(settings.supabase_anon_key.as_deref(), Some("anon"));
    assert_eq!(settings.debounce_ms, Some(300));
    assert!(matches!(
        settings.store_config(PathBuf::new),
        Ok(StoreConfig::Supabase { .. })
    ));
}

#[test]
fn malformed_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(
        load_settings_from_path(&path),
        Err(CliError::Config(_))
    ));
}

#[tokio::test]
async fn delete_removes_temporary_memo_from_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let session = sqlite_session(&dir);
    let memo = session
        .service
        .create_memo(Collection::Temporary, "scratch")
        .await
        .unwrap();

    run_delete(&memo.id.to_string(), &session).await.unwrap();

    let remaining = session
        .service
        .list_cache(Collection::Temporary)
        .refresh()
        .await
        .unwrap();
    assert!(remaining.is_empty());
    assert!(session.notifier.messages().is_empty());
}

#[tokio::test]
async fn delete_of_unknown_memo_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let session = sqlite_session(&dir);
    let unknown = Memo::new(Collection::Temporary, "");

    let error = run_delete(&unknown.id.to_string(), &session)
        .await
        .unwrap_err();
    assert!(matches!(error, CliError::Core(inner) if inner.is_not_found()));
}

#[tokio::test]
async fn promote_then_finish_leaves_single_permanent_memo() {
    let dir = tempfile::tempdir().unwrap();
    let session = sqlite_session(&dir);
    let memo = session
        .service
        .create_memo(Collection::Temporary, "keeper")
        .await
        .unwrap();

    let permanent = session.service.promote(memo.id).await.unwrap();
    run_finish_promotion(&memo.id.to_string(), &session)
        .await
        .unwrap();

    let permanents = session
        .service
        .list_cache(Collection::Permanent)
        .refresh()
        .await
        .unwrap();
    assert_eq!(permanents.len(), 1);
    assert_eq!(permanents[0].id, permanent.id);
    assert_eq!(permanents[0].content, "keeper");
}

#[tokio::test]
async fn failed_command_still_reports_its_warnings() {
    let store = MemoryStore::new();
    let session = memory_session(&store);
    let memo = session
        .service
        .create_memo(Collection::Temporary, "keep me")
        .await
        .unwrap();
    store.fail_next(StoreOp::Delete, 1);

    let command = Commands::Delete {
        id: memo.id.to_string(),
    };
    let (result, warnings) = execute(&command, &session).await;

    assert!(matches!(result, Err(CliError::Core(_))));
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with("Warning: Failed to delete memo"));
    assert!(session.notifier.messages().is_empty());
}
