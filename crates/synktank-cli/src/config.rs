//! CLI settings: config file, environment, and command-line overrides.

use std::path::{Path, PathBuf};

use synktank_core::config::non_blank;
use synktank_core::StoreSettings;

use crate::cli::Cli;
use crate::error::CliError;

const CONFIG_FILE_NAME: &str = "config.json";

pub const ENV_DB_PATH: &str = "SYNKTANK_DB_PATH";
pub const ENV_SUPABASE_URL: &str = "SYNKTANK_SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "SYNKTANK_SUPABASE_ANON_KEY";
pub const ENV_DEBOUNCE_MS: &str = "SYNKTANK_DEBOUNCE_MS";

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("synktank").join(CONFIG_FILE_NAME))
}

/// Read settings from `path`. A missing file yields defaults.
pub fn load_settings_from_path(path: &Path) -> Result<StoreSettings, CliError> {
    if !path.exists() {
        return Ok(StoreSettings::default());
    }

    let raw = std::fs::read_to_string(path).map_err(|error| {
        CliError::Config(format!(
            "Failed to read config at {}: {}",
            path.display(),
            error
        ))
    })?;
    let settings = serde_json::from_str::<StoreSettings>(&raw).map_err(|error| {
        CliError::Config(format!(
            "Failed to parse config at {}: {}",
            path.display(),
            error
        ))
    })?;
    Ok(normalize_settings(settings))
}

/// Settings taken from `SYNKTANK_*` variables looked up through `var`.
pub fn settings_from_vars(
    var: impl Fn(&str) -> Option<String>,
) -> Result<StoreSettings, CliError> {
    let debounce_ms = non_blank(var(ENV_DEBOUNCE_MS))
        .map(|raw| {
            raw.parse::<u64>().map_err(|_| {
                CliError::Config(format!(
                    "{ENV_DEBOUNCE_MS} must be a whole number of milliseconds, got '{raw}'"
                ))
            })
        })
        .transpose()?;

    Ok(normalize_settings(StoreSettings {
        db_path: non_blank(var(ENV_DB_PATH)).map(PathBuf::from),
        supabase_url: var(ENV_SUPABASE_URL),
        supabase_anon_key: var(ENV_SUPABASE_ANON_KEY),
        http_timeout_secs: None,
        debounce_ms,
    }))
}

/// Config file, then environment, then command-line flags.
pub fn resolve_settings(cli: &Cli) -> Result<StoreSettings, CliError> {
    let file = match default_config_path() {
        Some(path) => load_settings_from_path(&path)?,
        None => StoreSettings::default(),
    };
    let env = settings_from_vars(|name| std::env::var(name).ok())?;
    let flags = StoreSettings {
        db_path: cli.db_path.clone(),
        debounce_ms: cli.debounce_ms,
        ..StoreSettings::default()
    };

    Ok(file.merge(env).merge(flags))
}

fn normalize_settings(settings: StoreSettings) -> StoreSettings {
    StoreSettings {
        db_path: settings
            .db_path
            .filter(|path| !path.as_os_str().is_empty()),
        supabase_url: non_blank(settings.supabase_url),
        supabase_anon_key: non_blank(settings.supabase_anon_key),
        ..settings
    }
}
