//! The ingestion pass: raw rows in, schema store out.

use metrics::counter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use wirelog_config::SensingConfig;

use crate::aggregate::Aggregator;
use crate::errors::SensorResult;
use crate::partition::Partitioner;
use crate::row::RawRow;
use crate::store::SchemaStore;

/// What happened to one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// Folded into the named partition.
    Merged { partition: String },
    /// Not part of any partition.
    Dropped,
    /// Not UTF-8 JSON text; skipped.
    Malformed,
}

/// Counters for one ingestion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub rows: u64,
    pub merged: u64,
    pub dropped: u64,
    pub malformed: u64,
    /// Row ids that failed to decode, capped.
    #[serde(default)]
    pub malformed_ids: Vec<i64>,
}

/// Malformed row ids kept for the summary.
const MAX_MALFORMED_IDS: usize = 100;

impl IngestStats {
    fn record(&mut self, row: &RawRow, outcome: &RowOutcome) {
        self.rows += 1;
        match outcome {
            RowOutcome::Merged { .. } => self.merged += 1,
            RowOutcome::Dropped => self.dropped += 1,
            RowOutcome::Malformed => {
                self.malformed += 1;
                if self.malformed_ids.len() < MAX_MALFORMED_IDS {
                    self.malformed_ids.push(row.id);
                }
            }
        }
    }
}

/// Folds rows one at a time into a [`SchemaStore`] it owns.
pub struct Ingestor {
    partitioner: Partitioner,
    aggregator: Aggregator,
    store: SchemaStore,
    stats: IngestStats,
}

impl Ingestor {
    pub fn new(config: &SensingConfig) -> Self {
        Self::with_parts(Partitioner::new(&config.partition), Aggregator::new(config))
    }

    pub fn with_parts(partitioner: Partitioner, aggregator: Aggregator) -> Self {
        Self {
            partitioner,
            aggregator,
            store: SchemaStore::new(),
            stats: IngestStats::default(),
        }
    }

    /// Ingest one row.
    ///
    /// Malformed JSON is logged and skipped. An error means the value
    /// could not be classified and the pass should stop.
    pub fn ingest(&mut self, row: &RawRow) -> SensorResult<RowOutcome> {
        let outcome = self.ingest_inner(row)?;
        self.stats.record(row, &outcome);

        let label = match &outcome {
            RowOutcome::Merged { .. } => "merged",
            RowOutcome::Dropped => "dropped",
            RowOutcome::Malformed => "malformed",
        };
        counter!("wirelog_rows_total", "outcome" => label).increment(1);

        Ok(outcome)
    }

    fn ingest_inner(&mut self, row: &RawRow) -> SensorResult<RowOutcome> {
        let text = match std::str::from_utf8(&row.raw) {
            Ok(text) => text,
            Err(e) => {
                warn!(row_id = row.id, error = %e, "row is not valid UTF-8");
                return Ok(RowOutcome::Malformed);
            }
        };
        let record: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                warn!(row_id = row.id, error = %e, "error decoding row");
                return Ok(RowOutcome::Malformed);
            }
        };

        let Some(partition) = self.partitioner.partition(row.direction, &record) else {
            return Ok(RowOutcome::Dropped);
        };

        let root = self.store.partition_mut(&partition);
        if root.count == 0 {
            debug!(partition = %partition, row_id = row.id, "new partition");
        }
        self.aggregator.merge(root, &record)?;
        Ok(RowOutcome::Merged { partition })
    }

    pub fn stats(&self) -> &IngestStats {
        &self.stats
    }

    pub fn store(&self) -> &SchemaStore {
        &self.store
    }

    /// End the pass, handing back the store and its counters.
    pub fn finish(self) -> (SchemaStore, IngestStats) {
        info!(
            rows = self.stats.rows,
            merged = self.stats.merged,
            dropped = self.stats.dropped,
            malformed = self.stats.malformed,
            partitions = self.store.len(),
            "ingestion finished"
        );
        (self.store, self.stats)
    }
}

/// Run a whole pass over an in-memory sequence of rows.
pub fn ingest_rows<'a, I>(
    rows: I,
    config: &SensingConfig,
) -> SensorResult<(SchemaStore, IngestStats)>
where
    I: IntoIterator<Item = &'a RawRow>,
{
    let mut ingestor = Ingestor::new(config);
    for row in rows {
        ingestor.ingest(row)?;
    }
    Ok(ingestor.finish())
}
