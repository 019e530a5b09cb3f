//! wordlens-db - Dictionary store and word search for WordLens
//!
//! Wraps the bundled SQLite dictionary (`items(word, mean)`) and layers the
//! morphological search used to resolve a recognized word to its headword.

mod error;
mod links;
mod migrations;
mod queries;
mod schema;
mod search;
mod stemmer;

pub use error::DatabaseError;
pub use links::find_links;
pub use queries::*;
pub use schema::*;
pub use search::{trim_symbols, DictionarySearch};
pub use stemmer::{base_form_candidates, match_suffix, Suffix, SuffixRule, SUFFIXES};

use anyhow::Result;
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Handle to the dictionary database.
///
/// The connection sits behind a lock so one dictionary can serve lookups
/// from several threads. Once closed, every query fails with
/// [`DatabaseError::Closed`].
#[derive(Debug)]
pub struct Dictionary {
    conn: Mutex<Option<Connection>>,
    path: Option<PathBuf>,
}

impl Dictionary {
    /// Open an installed dictionary read-only
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DatabaseError::NotFound(path.to_path_buf()).into());
        }
        info!("opening dictionary at {:?}", path);

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        migrations::verify(&conn)?;

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open or create a writable dictionary, e.g. to build one from a word list
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("creating dictionary at {:?}", path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        migrations::run_all(&conn)?;

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an empty in-memory dictionary (for testing)
    pub fn open_in_memory() -> Result<Self> {
        debug!("opening in-memory dictionary");
        let conn = Connection::open_in_memory()?;
        migrations::run_all(&conn)?;

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path: None,
        })
    }

    /// Copy the bundled dictionary at `source` to `dest` unless `dest` already exists.
    ///
    /// Returns `true` when a copy was made.
    pub fn install(source: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<bool> {
        let (source, dest) = (source.as_ref(), dest.as_ref());
        if dest.exists() {
            debug!("dictionary already installed at {:?}", dest);
            return Ok(false);
        }
        if !source.exists() {
            return Err(DatabaseError::NotFound(source.to_path_buf()).into());
        }

        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // an interrupted copy leaves only the .partial file behind
        let partial = dest.with_extension("partial");
        let bytes = std::fs::copy(source, &partial)?;
        std::fs::rename(&partial, dest)?;

        info!("installed dictionary ({} bytes) from {:?} to {:?}", bytes, source, dest);
        Ok(true)
    }

    /// Run `f` against the open connection
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self.conn.lock();
        let conn = guard.as_ref().ok_or(DatabaseError::Closed)?;
        f(conn)
    }

    /// Insert rows (writable dictionaries only)
    pub fn insert_entries(&self, entries: &[NewEntry]) -> Result<usize> {
        self.with_connection(|conn| queries::insert_entries_batch(conn, entries))
    }

    pub fn entry_count(&self) -> Result<i64> {
        self.with_connection(queries::count_entries)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_open(&self) -> bool {
        self.conn.lock().is_some()
    }

    /// Close the connection; later lookups find nothing
    pub fn close(&self) {
        if let Some(conn) = self.conn.lock().take() {
            if let Err((_, e)) = conn.close() {
                tracing::warn!("error closing dictionary: {}", e);
            }
            debug!("dictionary closed");
        }
    }
}
