use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TracelensError};

/// Number of equal-width buckets a trace timeline bar is quantized onto.
pub const BREAKDOWN_SLICES: usize = 40;
pub const MAX_SPANS_PER_TRACE: usize = 10;
pub const AVERAGE_INGESTION_DELAY_MS: i64 = 90_000;
pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const HIGHLIGHT_DEBOUNCE_MS: u64 = 100;

/// How a trace search result is turned into table rows.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TraceListMode {
    /// Breakdowns computed locally from span intervals, traces sorted newest first.
    #[default]
    ClientNormalized,
    /// Server order is authoritative, precomputed breakdowns are normalized.
    ServerSorted,
}

impl TraceListMode {
    pub fn parse(input: &str) -> Result<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "client" | "client_normalized" => Ok(Self::ClientNormalized),
            "server" | "server_sorted" => Ok(Self::ServerSorted),
            other => Err(TracelensError::Parse(format!(
                "unknown trace list mode: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub trace_list_mode: TraceListMode,
    pub per_page: usize,
    pub coalesce_slices: bool,
    pub highlight_debounce: Duration,
    pub timestamp_format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            trace_list_mode: TraceListMode::ClientNormalized,
            per_page: DEFAULT_PAGE_SIZE,
            coalesce_slices: true,
            highlight_debounce: Duration::from_millis(HIGHLIGHT_DEBOUNCE_MS),
            timestamp_format: "%b %-d, %Y %-I:%M %p".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut cfg = Self::default();
        let config_path = config_file_path();
        if let Some(file_overrides) = load_file_overrides(&config_path)? {
            apply_overrides(&mut cfg, file_overrides, "config file")?;
        }
        let env_overrides = load_env_overrides()?;
        apply_overrides(&mut cfg, env_overrides, "environment")?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(file_overrides) = load_file_overrides(path)? {
            apply_overrides(&mut cfg, file_overrides, "config file")?;
        }
        Ok(cfg)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigOverrides {
    trace_list_mode: Option<String>,
    per_page: Option<usize>,
    coalesce_slices: Option<bool>,
    highlight_debounce: Option<String>,
    timestamp_format: Option<String>,
}

fn config_file_path() -> PathBuf {
    if let Ok(path) = env::var("TRACELENS_CONFIG") {
        return PathBuf::from(path);
    }

    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let config_home = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(home).join(".config"));
    config_home.join("tracelens/config.toml")
}

fn load_file_overrides(path: &Path) -> Result<Option<ConfigOverrides>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| TracelensError::Config(format!("failed reading {}: {e}", path.display())))?;
    let parsed: ConfigOverrides = toml::from_str(&raw)
        .map_err(|e| TracelensError::Config(format!("failed parsing {}: {e}", path.display())))?;
    Ok(Some(parsed))
}

fn load_env_overrides() -> Result<ConfigOverrides> {
    let per_page = match env::var("TRACELENS_PER_PAGE") {
        Ok(v) => Some(v.parse::<usize>().map_err(|e| {
            TracelensError::Config(format!("bad TRACELENS_PER_PAGE in environment: {e}"))
        })?),
        Err(_) => None,
    };
    let coalesce_slices = match env::var("TRACELENS_COALESCE_SLICES") {
        Ok(v) => Some(parse_bool(&v).ok_or_else(|| {
            TracelensError::Config(format!(
                "bad TRACELENS_COALESCE_SLICES in environment: {v}"
            ))
        })?),
        Err(_) => None,
    };

    Ok(ConfigOverrides {
        trace_list_mode: env::var("TRACELENS_TRACE_LIST_MODE").ok(),
        per_page,
        coalesce_slices,
        highlight_debounce: env::var("TRACELENS_HIGHLIGHT_DEBOUNCE").ok(),
        timestamp_format: env::var("TRACELENS_TIMESTAMP_FORMAT").ok(),
    })
}

fn apply_overrides(cfg: &mut Config, overrides: ConfigOverrides, source: &str) -> Result<()> {
    if let Some(v) = overrides.trace_list_mode {
        cfg.trace_list_mode = TraceListMode::parse(&v).map_err(|e| {
            TracelensError::Config(format!("bad trace_list_mode in {source}: {e}"))
        })?;
    }
    if let Some(v) = overrides.per_page {
        if v == 0 {
            return Err(TracelensError::Config(format!(
                "per_page in {source} must be at least 1"
            )));
        }
        cfg.per_page = v;
    }
    if let Some(v) = overrides.coalesce_slices {
        cfg.coalesce_slices = v;
    }
    if let Some(v) = overrides.highlight_debounce {
        cfg.highlight_debounce = humantime::parse_duration(&v).map_err(|e| {
            TracelensError::Config(format!(
                "bad highlight_debounce in {source}: {e} (value={v})"
            ))
        })?;
    }
    if let Some(v) = overrides.timestamp_format {
        cfg.timestamp_format = v;
    }
    Ok(())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
