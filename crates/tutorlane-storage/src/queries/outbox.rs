// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable outbox for domain events.
//!
//! Events are appended by the same transaction that changed the ledger, so an
//! event exists if and only if its cause committed. A dispatcher drains the
//! outbox afterwards with dequeue/ack/fail.

use std::time::Duration;

use rusqlite::{Connection, params};
use tracing::warn;

use tutorlane_core::{DomainEvent, TutorError};

use crate::database::{Database, TxError, map_tr_err};

/// A claimed outbox row.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEntry {
    pub id: i64,
    pub payload: String,
    pub attempts: i32,
    pub max_attempts: i32,
    /// Side effects of this entry already performed by earlier attempts.
    pub delivered: i32,
}

impl OutboxEntry {
    /// Decode the stored event.
    pub fn event(&self) -> Result<DomainEvent, serde_json::Error> {
        serde_json::from_str(&self.payload)
    }
}

/// Append an event. Call inside the transaction that produced it.
pub fn enqueue(conn: &Connection, event: &DomainEvent) -> Result<i64, TxError> {
    let payload = serde_json::to_string(event)
        .map_err(|e| TutorError::Internal(format!("failed to encode {}: {e}", event.kind())))?;
    conn.execute(
        "INSERT INTO event_outbox (payload) VALUES (?1)",
        params![payload],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Claim the oldest pending entry.
///
/// Atomically marks it "processing" with a 5-minute lock. Entries whose lock
/// expired (the dispatcher died mid-flight) are claimable again, and failed
/// entries only once their retry delay has passed. Returns `None` if nothing
/// is due.
pub async fn dequeue(db: &Database) -> Result<Option<OutboxEntry>, TutorError> {
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let result = tx.query_row(
                "SELECT id, payload, attempts, max_attempts, delivered
                 FROM event_outbox
                 WHERE (status = 'pending'
                        AND (next_attempt_at IS NULL
                             OR next_attempt_at <= strftime('%Y-%m-%dT%H:%M:%fZ', 'now')))
                    OR (status = 'processing'
                        AND locked_until < strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                 ORDER BY id ASC
                 LIMIT 1",
                [],
                |row| {
                    Ok(OutboxEntry {
                        id: row.get(0)?,
                        payload: row.get(1)?,
                        attempts: row.get(2)?,
                        max_attempts: row.get(3)?,
                        delivered: row.get(4)?,
                    })
                },
            );

            match result {
                Ok(entry) => {
                    tx.execute(
                        "UPDATE event_outbox SET status = 'processing',
                         locked_until = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', '+5 minutes'),
                         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                         WHERE id = ?1",
                        params![entry.id],
                    )?;
                    tx.commit()?;
                    Ok(Some(entry))
                }
                Err(rusqlite::Error::QueryReturnedNoRows) => {
                    tx.commit()?;
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Mark an entry as delivered.
pub async fn ack(db: &Database, id: i64) -> Result<(), TutorError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE event_outbox SET status = 'completed', locked_until = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record that the first `delivered` side effects of an entry succeeded.
pub async fn record_progress(db: &Database, id: i64, delivered: i32) -> Result<(), TutorError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE event_outbox SET delivered = ?1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![delivered, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a failed delivery attempt.
///
/// Increments attempts. At `max_attempts` the entry is parked as "failed";
/// otherwise it returns to "pending" and is not due again until
/// `backoff * attempts` has passed.
pub async fn fail(db: &Database, id: i64, backoff: Duration) -> Result<(), TutorError> {
    db.connection()
        .call(move |conn| {
            let (attempts, max_attempts): (i32, i32) = conn.query_row(
                "SELECT attempts, max_attempts FROM event_outbox WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;

            let new_attempts = attempts + 1;
            let delay = format!(
                "+{:.3} seconds",
                backoff.as_secs_f64() * f64::from(new_attempts)
            );
            let status = if new_attempts >= max_attempts {
                warn!(id, attempts = new_attempts, "outbox entry exhausted its retries");
                "failed"
            } else {
                "pending"
            };
            conn.execute(
                "UPDATE event_outbox SET status = ?1, attempts = ?2, locked_until = NULL,
                 next_attempt_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now', ?3),
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?4",
                params![status, new_attempts, delay, id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Count entries in a given status.
pub async fn count_with_status(db: &Database, status: &str) -> Result<i64, TutorError> {
    let status = status.to_string();
    db.read(move |conn| {
        conn.query_row(
            "SELECT COUNT(*) FROM event_outbox WHERE status = ?1",
            params![status],
            |row| row.get(0),
        )
    })
    .await
}
