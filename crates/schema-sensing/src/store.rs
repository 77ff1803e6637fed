//! Partition → schema mapping and its persisted form.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::errors::{SensorError, SensorResult};
use crate::ingest::IngestStats;
use crate::node::SchemaNode;

/// Version of the on-disk envelope written by [`PersistedStore::save`].
pub const STORE_FORMAT_VERSION: u32 = 1;

/// One root [`SchemaNode`] per partition. Partitions never share nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaStore {
    partitions: BTreeMap<String, SchemaNode>,
}

impl SchemaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root node of a partition, created on first use.
    pub fn partition_mut(&mut self, name: &str) -> &mut SchemaNode {
        self.partitions.entry(name.to_string()).or_default()
    }

    pub fn get(&self, name: &str) -> Option<&SchemaNode> {
        self.partitions.get(name)
    }

    /// Partitions in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SchemaNode)> {
        self.partitions.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.partitions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    /// Samples per partition.
    pub fn sample_counts(&self) -> BTreeMap<String, u64> {
        self.partitions
            .iter()
            .map(|(k, v)| (k.clone(), v.count))
            .collect()
    }
}

/// Serialized envelope around a [`SchemaStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedStore {
    pub format: u32,
    pub prepared_at: DateTime<Utc>,
    #[serde(default)]
    pub stats: IngestStats,
    pub store: SchemaStore,
}

#[derive(Deserialize)]
struct Header {
    format: u32,
}

impl PersistedStore {
    pub fn new(store: SchemaStore, stats: IngestStats) -> Self {
        Self {
            format: STORE_FORMAT_VERSION,
            prepared_at: Utc::now(),
            stats,
            store,
        }
    }

    pub fn to_vec(&self) -> SensorResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_slice(bytes: &[u8]) -> SensorResult<Self> {
        let header: Header = decode(bytes)?;
        if header.format != STORE_FORMAT_VERSION {
            return Err(SensorError::Persist(format!(
                "unsupported format version {} (expected {STORE_FORMAT_VERSION})",
                header.format
            )));
        }
        decode(bytes)
    }

    /// Write to `path` via a temporary file in the same directory so
    /// readers never see a partial file. The temporary file is removed
    /// if the final rename fails.
    pub fn save(&self, path: impl AsRef<Path>) -> SensorResult<()> {
        let path = path.as_ref();
        let bytes = self.to_vec()?;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| SensorError::Io(e.error))?;
        debug!(path = %path.display(), bytes = bytes.len(), "schema store saved");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> SensorResult<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let persisted = Self::from_slice(&bytes)?;
        debug!(
            path = %path.display(),
            partitions = persisted.store.len(),
            "schema store loaded"
        );
        Ok(persisted)
    }
}

/// Each tree level nests several JSON objects deep in the persisted
/// form, so serde_json's recursion limit is lifted and the stack grows
/// on demand instead.
fn decode<T: DeserializeOwned>(bytes: &[u8]) -> SensorResult<T> {
    let mut json = serde_json::Deserializer::from_slice(bytes);
    json.disable_recursion_limit();
    let value = T::deserialize(serde_stacker::Deserializer::new(&mut json))?;
    json.end()?;
    Ok(value)
}
