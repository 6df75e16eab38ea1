// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All access is serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use rusqlite::TransactionBehavior;
use thiserror::Error;
use tokio_rusqlite::Connection;
use tracing::debug;

use tutorlane_core::TutorError;

use crate::migrations;

/// Error type for closures running inside [`Database::transaction`].
///
/// `Sql` aborts the transaction as an infrastructure failure; `Domain` aborts
/// it as a business-rule violation that reaches the caller unchanged.
#[derive(Debug, Error)]
pub enum TxError {
    #[error(transparent)]
    Sql(#[from] rusqlite::Error),
    #[error(transparent)]
    Domain(#[from] TutorError),
}

/// Map a tokio-rusqlite call failure into the storage error variant.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> TutorError {
    TutorError::Storage {
        source: Box::new(e),
    }
}

/// The ledger store: one SQLite connection owned by a background thread.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database at `path`, apply PRAGMAs and run
    /// pending migrations.
    pub async fn open(path: &str) -> Result<Self, TutorError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| TutorError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = Connection::open(path)
            .await
            .map_err(|e| TutorError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.prepare(true).await?;
        debug!(path, "database opened");
        Ok(db)
    }

    /// Open a private in-memory database with the full schema.
    pub async fn open_in_memory() -> Result<Self, TutorError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| TutorError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.prepare(false).await?;
        Ok(db)
    }

    async fn prepare(&self, wal: bool) -> Result<(), TutorError> {
        self.conn
            .call(move |conn| {
                if wal {
                    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
                }
                conn.execute_batch(
                    "PRAGMA foreign_keys = ON;
                     PRAGMA busy_timeout = 5000;
                     PRAGMA synchronous = NORMAL;",
                )?;
                Ok(migrations::run_migrations(conn))
            })
            .await
            .map_err(map_tr_err)?
    }

    /// The underlying connection, for single-statement reads and writes.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Run a read-only closure on the database thread.
    pub async fn read<T, F>(&self, f: F) -> Result<T, TutorError>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Connection) -> Result<T, rusqlite::Error> + Send + 'static,
    {
        self.conn.call(move |conn| f(conn)).await.map_err(map_tr_err)
    }

    /// Run `f` inside a write transaction that is begun `IMMEDIATE`.
    ///
    /// `BEGIN IMMEDIATE` takes SQLite's write lock before the first statement,
    /// so every row `f` reads (in particular the slot row it is about to
    /// allocate from) stays locked until commit. Concurrent transactions on
    /// the same rows serialize here; there is no optimistic retry.
    ///
    /// The transaction commits only when `f` returns `Ok`. On
    /// [`TxError::Domain`] it rolls back and the domain error is returned
    /// unchanged; on [`TxError::Sql`] it rolls back and surfaces as
    /// [`TutorError::Storage`].
    pub async fn transaction<T, F>(&self, f: F) -> Result<T, TutorError>
    where
        T: Send + 'static,
        F: FnOnce(&rusqlite::Transaction<'_>) -> Result<T, TxError> + Send + 'static,
    {
        self.conn
            .call(move |conn| {
                let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
                match f(&tx) {
                    Ok(value) => {
                        tx.commit()?;
                        Ok(Ok(value))
                    }
                    Err(TxError::Domain(e)) => {
                        tx.rollback()?;
                        Ok(Err(e))
                    }
                    Err(TxError::Sql(e)) => Err(e),
                }
            })
            .await
            .map_err(map_tr_err)?
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), TutorError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        self.conn.close().await.map_err(|e| TutorError::Storage {
            source: Box::new(e),
        })?;
        debug!("database closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested/ledger.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn open_creates_parent_dirs_and_schema() {
        let (db, dir) = setup_db().await;
        assert!(dir.path().join("nested/ledger.db").exists());

        let tables: Vec<String> = db
            .read(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .unwrap();
        for expected in ["availability_slots", "bookings", "event_outbox", "payments"] {
            assert!(tables.iter().any(|t| t == expected), "missing table {expected}");
        }
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn domain_error_rolls_back() {
        let db = Database::open_in_memory().await.unwrap();
        let err = db
            .transaction(|tx| -> Result<(), TxError> {
                tx.execute(
                    "INSERT INTO languages (id, name, price_per_session_cents) VALUES ('l1', 'Swahili', 1500)",
                    [],
                )?;
                Err(TutorError::SlotFull.into())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TutorError::SlotFull));

        let count: i64 = db
            .read(|conn| conn.query_row("SELECT COUNT(*) FROM languages", [], |r| r.get(0)))
            .await
            .unwrap();
        assert_eq!(count, 0, "insert must be rolled back");
    }

    #[tokio::test]
    async fn sql_error_maps_to_storage() {
        let db = Database::open_in_memory().await.unwrap();
        let err = db
            .transaction(|tx| -> Result<(), TxError> {
                tx.execute("INSERT INTO no_such_table VALUES (1)", [])?;
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TutorError::Storage { .. }));
    }

    #[tokio::test]
    async fn commit_persists() {
        let db = Database::open_in_memory().await.unwrap();
        db.transaction(|tx| -> Result<(), TxError> {
            tx.execute(
                "INSERT INTO languages (id, name, price_per_session_cents) VALUES ('l1', 'Swahili', 1500)",
                [],
            )?;
            Ok(())
        })
        .await
        .unwrap();
        let count: i64 = db
            .read(|conn| conn.query_row("SELECT COUNT(*) FROM languages", [], |r| r.get(0)))
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
