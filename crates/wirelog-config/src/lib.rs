use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::debug;

mod sensing;

pub use sensing::{
    AlternateLeafRule, DEFAULT_CARDINALITY_THRESHOLD, PartitionConfig,
    Refinement, SensingConfig,
};

/// Top-level wirelog configuration.
///
/// Every section has defaults, so an empty file is a valid config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WirelogConfig {
    /// Where captured messages are read from.
    pub source: SourceConfig,

    /// Partitioning and aggregation knobs.
    pub sensing: SensingConfig,

    /// Report rendering options.
    pub report: ReportConfig,

    /// Log output.
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// SQLite database holding the captured message queue.
    pub path: Option<String>,

    /// Table with `id`, `dir` and `raw` columns.
    pub table: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: None,
            table: "message".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Document title.
    pub title: String,

    /// Sample counts below which a bucket is flagged as low confidence,
    /// ascending.
    pub low_sample_thresholds: Vec<u64>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "Gateway Message Analysis".to_string(),
            low_sample_thresholds: vec![10, 100],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// A level like "info" or a full EnvFilter string.
    pub level: Option<String>,

    /// Emit JSON lines instead of human-readable text.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Some("info".to_string()),
            json: false,
        }
    }
}

/// Parse a YAML document after `${VAR}` expansion.
pub fn parse_config(raw: &str) -> Result<WirelogConfig> {
    let with_env =
        shellexpand::env(raw).context("expanding environment variables")?;
    if with_env.trim().is_empty() {
        return Ok(WirelogConfig::default());
    }
    let cfg: WirelogConfig =
        serde_yaml::from_str(&with_env).with_context(|| "parsing yaml")?;
    Ok(cfg)
}

pub fn load_from_path(file_path: &str) -> Result<WirelogConfig> {
    let raw = fs::read_to_string(file_path)
        .with_context(|| format!("reading config {file_path}"))?;
    let cfg = parse_config(&raw)
        .with_context(|| format!("loading config {file_path}"))?;
    debug!(path = %file_path, "config loaded");
    Ok(cfg)
}

/// Load the config at `path`, or the defaults when no path is given.
pub fn load_cfg(path: Option<&str>) -> Result<WirelogConfig> {
    match path {
        Some(p) => load_from_path(p),
        None => Ok(WirelogConfig::default()),
    }
}
