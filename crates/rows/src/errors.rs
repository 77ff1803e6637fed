use thiserror::Error;

#[derive(Debug, Error)]
pub enum RowError {
    #[error("message database error: {0}")]
    Database(String),

    #[error("invalid table name {0:?}")]
    InvalidTable(String),
}

impl From<rusqlite::Error> for RowError {
    fn from(e: rusqlite::Error) -> Self {
        RowError::Database(e.to_string())
    }
}

pub type RowResult<T> = std::result::Result<T, RowError>;
