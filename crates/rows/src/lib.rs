//! Sources of captured gateway messages.

use schema_sensing::RawRow;

mod errors;
mod mem;
mod sqlite;

pub use errors::{RowError, RowResult};
pub use mem::MemRowSource;
pub use sqlite::SqliteRowSource;

/// Ordered source of raw message rows.
pub trait RowSource {
    /// Stream rows in id order to `visit`, optionally restricted by a
    /// backend-specific filter clause. Returns the number of rows visited.
    ///
    /// The scan stops at the first error, whether it comes from the
    /// backend or from `visit`.
    fn scan<F, E>(&self, filter: Option<&str>, visit: F) -> Result<u64, E>
    where
        F: FnMut(RawRow) -> Result<(), E>,
        E: From<RowError>;
}
