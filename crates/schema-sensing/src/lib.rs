//! Schema Sensing - structural inference over captured gateway traffic.
//!
//! Decoded JSON records are bucketed by a [`Partitioner`], folded into one
//! [`SchemaNode`] tree per bucket by an [`Aggregator`], persisted as a
//! [`PersistedStore`] and later flattened and rendered as an HTML report.
//!
//! # Example
//!
//! ```ignore
//! use schema_sensing::{HtmlRenderer, IngestStats, Ingestor, PersistedStore, RawRow, SensingConfig};
//!
//! let mut ingestor = Ingestor::new(&SensingConfig::default());
//! ingestor.ingest(&RawRow::inbound(1, r#"{"op": 0, "t": "READY", "d": {"v": 6}}"#))?;
//! let (store, stats) = ingestor.finish();
//!
//! let persisted = PersistedStore::new(store, stats);
//! persisted.save("schema.json")?;
//!
//! let html = HtmlRenderer::new(&Default::default(), 10).render_to_string(&persisted)?;
//! ```

mod aggregate;
mod errors;
mod flatten;
mod ingest;
mod kind;
mod node;
mod partition;
mod render;
mod row;
mod store;

pub use aggregate::{Aggregator, ELEMENT_SEGMENT, display_path};
pub use errors::{SensorError, SensorResult};
pub use flatten::{
    Line, LineKind, Presence, ScalarDetail, ScalarDisplay, ScalarLine, Slot, flatten,
    flatten_root,
};
pub use ingest::{IngestStats, Ingestor, RowOutcome, ingest_rows};
pub use kind::{Literal, Observed, ValueKind};
pub use node::{ArrayShape, ObjectShape, ScalarSummary, SchemaNode, Shape, ValueCount, ValueCounts};
pub use partition::{Partitioner, opcode_label};
pub use render::{HtmlRenderer, escape_html};
pub use row::{Direction, RawRow};
pub use store::{PersistedStore, STORE_FORMAT_VERSION, SchemaStore};

pub use wirelog_config::SensingConfig;
