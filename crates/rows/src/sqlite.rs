//! SQLite-backed message queue reader.

use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info};

use schema_sensing::{Direction, RawRow};

use crate::{RowError, RowResult, RowSource};

/// Reads `id, dir, raw` rows from one table of a message database.
pub struct SqliteRowSource {
    conn: Connection,
    table: String,
}

impl SqliteRowSource {
    /// Open an existing database read-only.
    pub fn open(path: impl AsRef<Path>, table: &str) -> RowResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| RowError::Database(format!("open {}: {e}", path.display())))?;
        debug!(path = %path.display(), table, "message database opened");
        Self::from_connection(conn, table)
    }

    /// Wrap an existing connection (for testing).
    pub fn from_connection(conn: Connection, table: &str) -> RowResult<Self> {
        validate_table(table)?;
        Ok(Self {
            conn,
            table: table.to_string(),
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn query(&self, filter: Option<&str>) -> String {
        let mut sql = format!("SELECT id, dir, raw FROM \"{}\"", self.table);
        if let Some(clause) = filter.map(str::trim).filter(|c| !c.is_empty()) {
            sql.push_str(" WHERE ");
            sql.push_str(clause);
        }
        sql.push_str(" ORDER BY id");
        sql
    }
}

impl RowSource for SqliteRowSource {
    fn scan<F, E>(&self, filter: Option<&str>, mut visit: F) -> Result<u64, E>
    where
        F: FnMut(RawRow) -> Result<(), E>,
        E: From<RowError>,
    {
        let sql = self.query(filter);
        debug!(%sql, "scanning messages");

        let mut stmt = self.conn.prepare(&sql).map_err(RowError::from)?;
        let mut rows = stmt.query([]).map_err(RowError::from)?;

        let mut visited = 0;
        while let Some(row) = rows.next().map_err(RowError::from)? {
            let id: i64 = row.get(0).map_err(RowError::from)?;
            let dir: i64 = row.get(1).map_err(RowError::from)?;
            let raw = raw_bytes(row.get_ref(2).map_err(RowError::from)?);
            visit(RawRow::new(id, Direction::from_flag(dir), raw))?;
            visited += 1;
        }

        info!(rows = visited, "message scan finished");
        Ok(visited)
    }
}

/// The payload column as stored. Text is not validated here; rows that
/// are not UTF-8 are rejected by the ingestor with their id.
fn raw_bytes(value: ValueRef<'_>) -> Vec<u8> {
    match value {
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => bytes.to_vec(),
        ValueRef::Integer(i) => i.to_string().into_bytes(),
        ValueRef::Real(r) => r.to_string().into_bytes(),
        ValueRef::Null => Vec::new(),
    }
}

fn validate_table(table: &str) -> RowResult<()> {
    let mut chars = table.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(RowError::InvalidTable(table.to_string()))
    }
}
