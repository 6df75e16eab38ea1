// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Teacher payout requests.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use tutorlane_core::{PayoutRequest, PayoutStatus, money};

use crate::database::TxError;
use crate::rows::{enum_at, money_at, opt_ts_at, ts, ts_at, uuid_at};

pub fn insert_payout(conn: &Connection, request: &PayoutRequest) -> Result<(), TxError> {
    conn.execute(
        "INSERT INTO payout_requests (id, teacher_id, amount_cents, status, requested_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            request.id.to_string(),
            request.teacher_id.to_string(),
            money::to_cents(request.amount)?,
            request.status.to_string(),
            ts(&request.requested_at),
        ],
    )?;
    Ok(())
}

pub fn get_payout(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<PayoutRequest>> {
    conn.query_row(
        "SELECT id, teacher_id, amount_cents, status, admin_notes, requested_at, processed_at
         FROM payout_requests WHERE id = ?1",
        params![id.to_string()],
        |row| {
            Ok(PayoutRequest {
                id: uuid_at(row, 0)?,
                teacher_id: uuid_at(row, 1)?,
                amount: money_at(row, 2)?,
                status: enum_at(row, 3)?,
                admin_notes: row.get(4)?,
                requested_at: ts_at(row, 5)?,
                processed_at: opt_ts_at(row, 6)?,
            })
        },
    )
    .optional()
}

/// Close a pending request with `outcome`. Returns whether it was pending.
pub fn resolve(
    conn: &Connection,
    id: Uuid,
    outcome: PayoutStatus,
    notes: Option<&str>,
    processed_at: DateTime<Utc>,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE payout_requests SET status = ?2, admin_notes = ?3, processed_at = ?4
         WHERE id = ?1 AND status = 'pending'",
        params![id.to_string(), outcome.to_string(), notes, ts(&processed_at)],
    )?;
    Ok(changed == 1)
}
