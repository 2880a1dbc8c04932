// SPDX-FileCopyrightText: 2026 Cadence Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.

use cadence_core::CadenceError;
use tokio_rusqlite::Connection;

use crate::migrations;

/// Handle to the single-writer SQLite database.
///
/// Cloning is cheap; all clones share the same background connection thread.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path`, configure pragmas, and run
    /// all pending migrations.
    pub async fn open(path: &str) -> Result<Self, CadenceError> {
        let conn = Connection::open(path).await.map_err(map_tr_err)?;

        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| {
            migrations::run_migrations(conn).map_err(|e| {
                tokio_rusqlite::Error::Other(format!("migration failed: {e}").into())
            })
        })
        .await
        .map_err(map_tr_err)?;

        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection. Query modules call through
    /// `connection().call(...)`.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Close the background connection thread, flushing WAL.
    pub async fn close(self) -> Result<(), CadenceError> {
        self.conn
            .close()
            .await
            .map_err(|e| CadenceError::Storage {
                source: Box::new(e),
            })
    }
}

/// Map a tokio-rusqlite error into the crate error type.
pub fn map_tr_err(err: tokio_rusqlite::Error) -> CadenceError {
    CadenceError::Storage {
        source: Box::new(err),
    }
}

/// Current UTC timestamp formatted like SQLite's
/// `strftime('%Y-%m-%dT%H:%M:%fZ', 'now')`, so Rust- and SQL-generated
/// timestamps compare lexicographically.
pub fn now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// A UTC timestamp plus an offset, same format as [`now_iso`].
pub fn iso_after(duration: chrono::Duration) -> String {
    (chrono::Utc::now() + duration)
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_runs_migrations_and_enables_wal() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let (journal_mode, fk): (String, i64) = db
            .connection()
            .call(|conn| {
                let mode: String =
                    conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
                let fk: i64 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
                Ok((mode, fk))
            })
            .await
            .unwrap();
        assert_eq!(journal_mode.to_lowercase(), "wal");
        assert_eq!(fk, 1);

        // Migration created the queue table.
        let count: i64 = db
            .connection()
            .call(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'queue_items'",
                    [],
                    |row| row.get(0),
                )
                .map_err(Into::into)
            })
            .await
            .unwrap();
        assert_eq!(count, 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_is_idempotent_across_restarts() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
        // Second open re-runs the migration runner without error.
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
    }

    #[test]
    fn now_iso_is_lexicographically_ordered() {
        let a = now_iso();
        let b = iso_after(chrono::Duration::seconds(1));
        assert!(a < b);
    }
}
