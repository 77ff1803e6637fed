use schema_sensing::RawRow;

use crate::{RowError, RowSource};

/// In-memory row source. Filters are not supported.
#[derive(Debug, Clone, Default)]
pub struct MemRowSource {
    rows: Vec<RawRow>,
}

impl MemRowSource {
    pub fn new(mut rows: Vec<RawRow>) -> Self {
        rows.sort_by_key(|r| r.id);
        Self { rows }
    }

    pub fn push(&mut self, row: RawRow) {
        let at = self.rows.partition_point(|r| r.id <= row.id);
        self.rows.insert(at, row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl RowSource for MemRowSource {
    fn scan<F, E>(&self, filter: Option<&str>, mut visit: F) -> Result<u64, E>
    where
        F: FnMut(RawRow) -> Result<(), E>,
        E: From<RowError>,
    {
        if let Some(clause) = filter {
            return Err(RowError::Database(format!(
                "filter {clause:?} not supported by in-memory source"
            ))
            .into());
        }
        let mut visited = 0;
        for row in &self.rows {
            visit(row.clone())?;
            visited += 1;
        }
        Ok(visited)
    }
}
