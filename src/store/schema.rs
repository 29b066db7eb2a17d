//! SQLite schema for sessions, override events, learned patterns, and
//! the file relationship cache.

use anyhow::{bail, Result};
use rusqlite::Connection;
use std::path::Path;

pub const SCHEMA_VERSION: i64 = 1;

pub fn open_or_create(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    init(&conn)?;
    Ok(conn)
}

/// In-memory store for tests and ephemeral runs.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init(&conn)?;
    Ok(conn)
}

fn init(conn: &Connection) -> Result<()> {
    conn.busy_timeout(std::time::Duration::from_millis(250))?;
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_root TEXT NOT NULL,
            task TEXT NOT NULL,
            mode TEXT NOT NULL,
            fingerprint TEXT NOT NULL,
            focal_file TEXT NOT NULL,
            token_budget INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            selection TEXT NOT NULL,
            outcome TEXT
        );

        CREATE TABLE IF NOT EXISTS override_events (
            session_id INTEGER NOT NULL,
            file_path TEXT NOT NULL,
            override_type TEXT NOT NULL,
            fingerprint TEXT NOT NULL,
            recorded_at TEXT NOT NULL,
            PRIMARY KEY (session_id, file_path, override_type)
        );

        CREATE TABLE IF NOT EXISTS override_patterns (
            file_path TEXT NOT NULL,
            fingerprint TEXT NOT NULL,
            override_count INTEGER NOT NULL DEFAULT 0,
            last_override_type TEXT,
            cumulative_adjustment REAL NOT NULL DEFAULT 0.0,
            confidence REAL NOT NULL DEFAULT 0.0,
            PRIMARY KEY (file_path, fingerprint)
        );

        CREATE TABLE IF NOT EXISTS file_relationships (
            file_a TEXT NOT NULL,
            file_b TEXT NOT NULL,
            relation_type TEXT NOT NULL,
            strength REAL NOT NULL,
            PRIMARY KEY (file_a, file_b, relation_type)
        );

        CREATE INDEX IF NOT EXISTS idx_patterns_fingerprint
            ON override_patterns(fingerprint);
        ",
    )?;

    let current: Option<i64> =
        conn.query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0)).ok();
    match current {
        None => {
            conn.execute("INSERT INTO schema_version(version) VALUES(?1)", [SCHEMA_VERSION])?;
        }
        Some(version) if version == SCHEMA_VERSION => {}
        Some(version) => {
            bail!("Unsupported store schema version {version}; expected {SCHEMA_VERSION}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_or_create_inserts_schema_version() {
        let tmp = TempDir::new().expect("temp dir");
        let db = tmp.path().join("store.sqlite");
        let conn = open_or_create(&db).expect("open db");
        let version: i64 = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
            .expect("query version");
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn open_or_create_rejects_mismatched_schema_version() {
        let tmp = TempDir::new().expect("temp dir");
        let db = tmp.path().join("store.sqlite");
        let conn = Connection::open(&db).expect("open db");
        conn.execute_batch(
            "CREATE TABLE schema_version(version INTEGER NOT NULL);\
             INSERT INTO schema_version(version) VALUES(999);",
        )
        .expect("seed schema version");
        drop(conn);

        let err = open_or_create(&db).expect_err("must fail on mismatched schema version");
        assert!(err.to_string().contains("Unsupported store schema version"));
    }

    #[test]
    fn tables_survive_reopen() {
        let tmp = TempDir::new().expect("temp dir");
        let db = tmp.path().join("store.sqlite");
        {
            let conn = open_or_create(&db).expect("open db");
            conn.execute(
                "INSERT INTO override_patterns(file_path, fingerprint, override_count) VALUES('a.rs', 'fp', 2)",
                [],
            )
            .expect("insert");
        }
        let conn = open_or_create(&db).expect("reopen db");
        let count: i64 = conn
            .query_row("SELECT override_count FROM override_patterns WHERE file_path = 'a.rs'", [], |r| r.get(0))
            .expect("query");
        assert_eq!(count, 2);
    }
}
