use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use metrics::{gauge, histogram};
use rows::{RowSource, SqliteRowSource};
use schema_sensing::{HtmlRenderer, Ingestor, PersistedStore};
use tracing::{debug, error, info};
use wirelog_config::{LoggingConfig, WirelogConfig, load_cfg};

#[derive(Parser, Debug)]
#[command(
    name = "wirelog",
    version,
    about = "Infer message schemas from captured gateway traffic"
)]
struct Cli {
    /// YAML configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Message database, overrides `source.path`.
    #[arg(long, global = true)]
    db: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan the message database and persist the inferred schemas.
    Prepare {
        /// Where to write the prepared schema store.
        output: PathBuf,

        /// SQL condition appended verbatim as a WHERE clause.
        filter: Option<String>,
    },

    /// Render a prepared schema store as HTML on stdout.
    Render {
        /// File written by `prepare`.
        input: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let Some(command) = cli.command else {
        let _ = Cli::command().print_help();
        return ExitCode::from(2);
    };

    let cfg = match load_cfg(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    init_o11y(&cfg.logging);
    debug!(config = ?cfg, "configuration resolved");

    let res = match &command {
        Command::Prepare { output, filter } => {
            prepare(&cfg, cli.db.as_deref(), output, filter.as_deref())
        }
        Command::Render { input } => render(&cfg, input),
    };

    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "command failed");
            ExitCode::FAILURE
        }
    }
}

fn init_o11y(logging: &LoggingConfig) {
    let cfg = o11y::O11yConfig {
        logging: o11y::logging::Config {
            level: logging.level.clone(),
            json: logging.json,
            with_targets: false,
        },
        install_panic_hook: true,
    };
    let _ = o11y::init_all(&cfg);
}

fn prepare(
    cfg: &WirelogConfig,
    db: Option<&str>,
    output: &Path,
    filter: Option<&str>,
) -> Result<()> {
    let db_path = db
        .or(cfg.source.path.as_deref())
        .context("no message database configured (pass --db or set source.path)")?;
    let source = SqliteRowSource::open(db_path, &cfg.source.table)
        .with_context(|| format!("opening message database {db_path}"))?;

    let started = Instant::now();
    let mut ingestor = Ingestor::new(&cfg.sensing);
    let scanned = source.scan(filter, |row| -> Result<()> {
        ingestor
            .ingest(&row)
            .with_context(|| format!("ingesting row {}", row.id))?;
        Ok(())
    })?;
    let (store, stats) = ingestor.finish();
    histogram!("wirelog_ingest_seconds").record(started.elapsed().as_secs_f64());
    gauge!("wirelog_partitions").set(store.len() as f64);

    for (partition, samples) in store.sample_counts() {
        info!(%partition, samples, "partition");
    }
    if !stats.malformed_ids.is_empty() {
        info!(ids = ?stats.malformed_ids, "malformed rows skipped");
    }

    let persisted = PersistedStore::new(store, stats);
    persisted
        .save(output)
        .with_context(|| format!("writing {}", output.display()))?;
    info!(
        output = %output.display(),
        scanned,
        partitions = persisted.store.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "schema store prepared"
    );
    Ok(())
}

fn render(cfg: &WirelogConfig, input: &Path) -> Result<()> {
    let persisted = PersistedStore::load(input)
        .with_context(|| format!("loading {}", input.display()))?;
    let renderer = HtmlRenderer::new(&cfg.report, cfg.sensing.cardinality_threshold);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    renderer
        .render(&persisted, &mut out)
        .context("rendering report")?;
    out.flush().context("flushing report")?;
    Ok(())
}
