//! Database Connection and Setup
//!
//! Opens the SQLite database and runs migrations.

use std::path::Path;

use rusqlite::Connection;

use crate::domain::{DomainError, DomainResult};

/// Open (or create) the database at `db_path` and bring the schema up to date.
///
/// `":memory:"` opens a private in-memory database.
pub fn init_db(db_path: &Path) -> DomainResult<Connection> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| DomainError::Internal(format!("Failed to create db directory: {}", e)))?;
    }

    let conn = Connection::open(db_path)
        .map_err(|e| DomainError::Internal(format!("Failed to open db: {}", e)))?;

    run_migrations(&conn)?;
    Ok(conn)
}

/// Check if a column exists in a table
fn column_exists(conn: &Connection, table: &str, column: &str) -> DomainResult<bool> {
    let query = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&query).map_err(|e| DomainError::Internal(e.to_string()))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .map_err(|e| DomainError::Internal(e.to_string()))?;

    for name in names {
        if name.map_err(|e| DomainError::Internal(e.to_string()))? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Run database migrations
fn run_migrations(conn: &Connection) -> DomainResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS campaign_forms (
            campaign_id TEXT PRIMARY KEY,
            id TEXT NOT NULL,
            fields TEXT NOT NULL DEFAULT '[]',
            updated_at INTEGER NOT NULL DEFAULT 0
        );
        CREATE TABLE IF NOT EXISTS nps_responses (
            id TEXT PRIMARY KEY,
            campaign_id TEXT NOT NULL,
            score INTEGER NOT NULL,
            feedback TEXT,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS contact_groups (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS contacts (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL DEFAULT '',
            phone TEXT NOT NULL DEFAULT '',
            group_ids TEXT NOT NULL DEFAULT '[]',
            company TEXT,
            position TEXT,
            tags TEXT NOT NULL DEFAULT '[]',
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );",
    )
    .map_err(|e| DomainError::Internal(format!("Failed to create tables: {}", e)))?;

    // Answers to non-NPS questions were added after the first schema
    if !column_exists(conn, "nps_responses", "form_responses")? {
        conn.execute(
            "ALTER TABLE nps_responses ADD COLUMN form_responses TEXT NOT NULL DEFAULT '{}'",
            [],
        )
        .map_err(|e| DomainError::Internal(format!("Failed to add form_responses: {}", e)))?;
    }

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_responses_campaign ON nps_responses(campaign_id)",
        [],
    )
    .map_err(|e| DomainError::Internal(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("forms.db");

        drop(init_db(&path).unwrap());
        let conn = init_db(&path).unwrap();

        assert!(column_exists(&conn, "nps_responses", "form_responses").unwrap());
        assert!(!column_exists(&conn, "nps_responses", "missing").unwrap());
        assert!(column_exists(&conn, "contacts", "group_ids").unwrap());
        assert!(column_exists(&conn, "contact_groups", "name").unwrap());
    }
}
