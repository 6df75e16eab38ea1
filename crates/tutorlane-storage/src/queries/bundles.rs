// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bundle catalogue and purchased student bundles.

use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use tutorlane_core::{Bundle, BundleStatus, StudentBundle, money};

use crate::database::TxError;
use crate::rows::{count_at, enum_at, money_at, uuid_at};

pub fn insert_bundle(conn: &Connection, bundle: &Bundle) -> Result<(), TxError> {
    conn.execute(
        "INSERT INTO bundles (id, name, language_id, number_of_classes, price_cents, currency, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            bundle.id.to_string(),
            bundle.name,
            bundle.language_id.to_string(),
            bundle.number_of_classes,
            money::to_cents(bundle.price)?,
            bundle.currency,
            bundle.is_active,
        ],
    )?;
    Ok(())
}

pub fn get_bundle(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<Bundle>> {
    conn.query_row(
        "SELECT id, name, language_id, number_of_classes, price_cents, currency, is_active
         FROM bundles WHERE id = ?1",
        params![id.to_string()],
        |row| {
            Ok(Bundle {
                id: uuid_at(row, 0)?,
                name: row.get(1)?,
                language_id: uuid_at(row, 2)?,
                number_of_classes: count_at(row, 3)?,
                price: money_at(row, 4)?,
                currency: row.get(5)?,
                is_active: row.get(6)?,
            })
        },
    )
    .optional()
}

pub fn insert_student_bundle(conn: &Connection, sb: &StudentBundle) -> Result<(), TxError> {
    conn.execute(
        "INSERT INTO student_bundles (id, student_id, bundle_id, remaining_classes, status)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            sb.id.to_string(),
            sb.student_id.to_string(),
            sb.bundle_id.to_string(),
            sb.remaining_classes,
            sb.status.to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_student_bundle(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<StudentBundle>> {
    conn.query_row(
        "SELECT id, student_id, bundle_id, remaining_classes, status
         FROM student_bundles WHERE id = ?1",
        params![id.to_string()],
        |row| {
            Ok(StudentBundle {
                id: uuid_at(row, 0)?,
                student_id: uuid_at(row, 1)?,
                bundle_id: uuid_at(row, 2)?,
                remaining_classes: count_at(row, 3)?,
                status: enum_at(row, 4)?,
            })
        },
    )
    .optional()
}

/// `pending_payment -> active`. Returns whether the row moved.
pub fn activate(conn: &Connection, id: Uuid) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE student_bundles SET status = ?2 WHERE id = ?1 AND status = ?3",
        params![
            id.to_string(),
            BundleStatus::Active.to_string(),
            BundleStatus::PendingPayment.to_string()
        ],
    )?;
    Ok(changed == 1)
}
