use std::io;
use std::sync::Once;

use tracing_log::LogTracer;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, layer::SubscriberExt};

static INIT: Once = Once::new();

/// Used when neither `RUST_LOG` nor the config yields a usable filter.
pub const FALLBACK_FILTER: &str = "info";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    /// Human-readable lines without color codes.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Either a simple level like "info" or a full EnvFilter string
    /// e.g. "info,schema_sensing=debug".
    pub level: Option<String>,
    /// Emit logs as JSON lines when true.
    pub json: bool,
    /// Include the event target in each line.
    pub with_targets: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: Some(FALLBACK_FILTER.to_owned()),
            json: false,
            with_targets: false,
        }
    }
}

impl Config {
    pub fn format(&self) -> Format {
        if self.json { Format::Json } else { Format::Text }
    }
}

/// Filter directives in effect: `RUST_LOG`, then the configured level,
/// then [`FALLBACK_FILTER`]. Unparseable candidates are skipped.
pub fn resolve_filter(cfg: &Config, rust_log: Option<&str>) -> EnvFilter {
    [rust_log, cfg.level.as_deref()]
        .into_iter()
        .flatten()
        .filter(|d| !d.trim().is_empty())
        .find_map(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(FALLBACK_FILTER))
}

/// Install the global subscriber once. Output goes to stderr so stdout
/// stays free for reports.
pub fn init(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut result = Ok(());
    INIT.call_once(|| {
        let _ = LogTracer::init();

        let rust_log = std::env::var("RUST_LOG").ok();
        let filter = resolve_filter(cfg, rust_log.as_deref());

        let base = fmt::layer()
            .with_writer(io::stderr)
            .with_target(cfg.with_targets);
        let layer = match cfg.format() {
            Format::Json => base.json().with_current_span(true).boxed(),
            Format::Text => base.with_ansi(false).boxed(),
        };

        let subscriber = Registry::default().with(filter).with(layer);
        result = tracing::subscriber::set_global_default(subscriber).map_err(Into::into);
    });
    result
}
