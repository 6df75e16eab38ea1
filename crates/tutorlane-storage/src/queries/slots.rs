// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Availability slot rows.
//!
//! The slot row is the only record of capacity. Counters and the cached
//! status are written together, and only inside a write transaction.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use uuid::Uuid;

use tutorlane_core::{AvailabilitySlot, SlotStatus, TutorError};

use crate::database::TxError;
use crate::rows::{count_at, enum_at, ts, ts_at, uuid_at};

const SLOT_COLUMNS: &str = "id, teacher_id, language_id, start_time, end_time, \
                            max_students, current_students, status";

fn slot_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AvailabilitySlot> {
    Ok(AvailabilitySlot {
        id: uuid_at(row, 0)?,
        teacher_id: uuid_at(row, 1)?,
        language_id: uuid_at(row, 2)?,
        start_time: ts_at(row, 3)?,
        end_time: ts_at(row, 4)?,
        max_students: count_at(row, 5)?,
        current_students: count_at(row, 6)?,
        status: enum_at(row, 7)?,
    })
}

pub fn insert_slot(conn: &Connection, slot: &AvailabilitySlot) -> Result<(), TxError> {
    conn.execute(
        "INSERT INTO availability_slots
            (id, teacher_id, language_id, start_time, end_time, max_students, current_students, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            slot.id.to_string(),
            slot.teacher_id.to_string(),
            slot.language_id.to_string(),
            ts(&slot.start_time),
            ts(&slot.end_time),
            slot.max_students,
            slot.current_students,
            slot.status.to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_slot(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<AvailabilitySlot>> {
    conn.query_row(
        &format!("SELECT {SLOT_COLUMNS} FROM availability_slots WHERE id = ?1"),
        params![id.to_string()],
        slot_from_row,
    )
    .optional()
}

/// Read a slot under the transaction's write lock.
///
/// Takes a [`Transaction`] rather than a bare connection: the caller's
/// transaction was begun `IMMEDIATE`, so the counters returned here cannot
/// change until it commits or rolls back.
pub fn lock_slot(tx: &Transaction<'_>, id: Uuid) -> Result<AvailabilitySlot, TxError> {
    get_slot(tx, id)?.ok_or_else(|| TxError::Domain(TutorError::SlotNotFound(id)))
}

/// Write new counters and the status derived from them.
pub fn write_occupancy(
    tx: &Transaction<'_>,
    id: Uuid,
    current_students: u32,
    max_students: u32,
) -> Result<SlotStatus, TxError> {
    let status = SlotStatus::for_occupancy(current_students, max_students);
    tx.execute(
        "UPDATE availability_slots SET current_students = ?2, status = ?3 WHERE id = ?1",
        params![id.to_string(), current_students, status.to_string()],
    )?;
    Ok(status)
}

pub fn update_times(
    tx: &Transaction<'_>,
    id: Uuid,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
) -> Result<(), TxError> {
    tx.execute(
        "UPDATE availability_slots SET start_time = ?2, end_time = ?3 WHERE id = ?1",
        params![id.to_string(), ts(&start_time), ts(&end_time)],
    )?;
    Ok(())
}

/// Number of bookings (in any state) that reference the slot.
pub fn booking_count(conn: &Connection, id: Uuid) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM bookings WHERE slot_id = ?1",
        params![id.to_string()],
        |row| row.get(0),
    )
}

/// Delete a slot that is still `available`. Returns whether a row was removed.
pub fn delete_available_slot(tx: &Transaction<'_>, id: Uuid) -> Result<bool, TxError> {
    let removed = tx.execute(
        "DELETE FROM availability_slots WHERE id = ?1 AND status = 'available'",
        params![id.to_string()],
    )?;
    Ok(removed == 1)
}
