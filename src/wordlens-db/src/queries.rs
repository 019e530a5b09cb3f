//! Dictionary query functions

use anyhow::Result;
use rusqlite::{params, Connection};

use crate::schema::*;

/// Case-insensitive exact lookup.
///
/// Every matching row is folded into one entry: each definition has its
/// `" / "` separators turned into line breaks and is followed by a blank
/// line. The headword is the stored spelling of the first row.
pub fn search_direct(conn: &Connection, word: &str) -> Result<Option<DictionaryEntry>> {
    let mut stmt = conn.prepare_cached("SELECT word, mean FROM items WHERE word = ?1 COLLATE NOCASE")?;
    let mut rows = stmt.query(params![word])?;

    let mut headword: Option<String> = None;
    let mut mean = String::new();

    while let Some(row) = rows.next()? {
        if headword.is_none() {
            headword = row.get(0)?;
        }
        let definition: Option<String> = row.get(1)?;
        mean.push_str(&definition.unwrap_or_default().replace(" / ", "\n"));
        mean.push_str("\n\n");
    }

    Ok(headword.map(|word| DictionaryEntry { word, mean }))
}

/// Whether `word` has at least one row
pub fn word_exists(conn: &Connection, word: &str) -> Result<bool> {
    let mut stmt = conn.prepare_cached("SELECT 1 FROM items WHERE word = ?1 COLLATE NOCASE LIMIT 1")?;
    Ok(stmt.exists(params![word])?)
}

/// Insert a single dictionary row
#[cfg(test)]
pub fn insert_entry(conn: &Connection, entry: &NewEntry) -> Result<i64> {
    conn.execute(
        "INSERT INTO items (word, mean) VALUES (?1, ?2)",
        params![entry.word, entry.mean],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Batch insert rows in a single transaction
pub fn insert_entries_batch(conn: &Connection, entries: &[NewEntry]) -> Result<usize> {
    if entries.is_empty() {
        return Ok(0);
    }

    let tx = conn.unchecked_transaction()?;
    {
        let mut stmt = tx.prepare_cached("INSERT INTO items (word, mean) VALUES (?1, ?2)")?;
        for entry in entries {
            stmt.execute(params![entry.word, entry.mean])?;
        }
    }
    tx.commit()?;

    Ok(entries.len())
}

/// Total number of rows in the dictionary
pub fn count_entries(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
    Ok(count)
}
