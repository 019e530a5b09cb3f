//! Database error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("dictionary is closed")]
    Closed,

    #[error("dictionary not found at {0:?}")]
    NotFound(PathBuf),

    #[error("invalid dictionary: {0}")]
    InvalidData(String),
}
