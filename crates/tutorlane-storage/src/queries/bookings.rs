// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Booking rows and guarded status transitions.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use tutorlane_core::{Booking, BookingStatus, TutorError, money};

use crate::database::TxError;
use crate::rows::{enum_at, money_at, opt_ts_at, ts, uuid_at};

const BOOKING_COLUMNS: &str = "id, student_id, teacher_id, slot_id, status, price_cents, \
                               currency, proposed_start_time, proposed_end_time";

fn booking_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Booking> {
    Ok(Booking {
        id: uuid_at(row, 0)?,
        student_id: uuid_at(row, 1)?,
        teacher_id: uuid_at(row, 2)?,
        slot_id: uuid_at(row, 3)?,
        status: enum_at(row, 4)?,
        price: money_at(row, 5)?,
        currency: row.get(6)?,
        proposed_start_time: opt_ts_at(row, 7)?,
        proposed_end_time: opt_ts_at(row, 8)?,
    })
}

pub fn insert_booking(conn: &Connection, booking: &Booking) -> Result<(), TxError> {
    conn.execute(
        "INSERT INTO bookings (id, student_id, teacher_id, slot_id, status, price_cents, currency)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            booking.id.to_string(),
            booking.student_id.to_string(),
            booking.teacher_id.to_string(),
            booking.slot_id.to_string(),
            booking.status.to_string(),
            money::to_cents(booking.price)?,
            booking.currency,
        ],
    )?;
    Ok(())
}

pub fn get_booking(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<Booking>> {
    conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id.to_string()],
        booking_from_row,
    )
    .optional()
}

/// Move a booking from `from` to `to`, only if it is still in `from`.
///
/// Pairs the booking state machine does not allow are refused with
/// [`TutorError::InvalidTransition`] before the row is touched. Returns
/// `false` when another transaction already moved it.
pub fn transition(
    conn: &Connection,
    id: Uuid,
    from: BookingStatus,
    to: BookingStatus,
) -> Result<bool, TxError> {
    if !from.can_transition_to(to) {
        return Err(TutorError::transition("booking", from, to).into());
    }
    let changed = conn.execute(
        "UPDATE bookings SET status = ?3, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE id = ?1 AND status = ?2",
        params![id.to_string(), from.to_string(), to.to_string()],
    )?;
    Ok(changed == 1)
}

/// Record (or clear, with `None`) the proposed reschedule window.
pub fn set_proposed_times(
    conn: &Connection,
    id: Uuid,
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
) -> rusqlite::Result<()> {
    let (start, end) = match window {
        Some((start, end)) => (Some(ts(&start)), Some(ts(&end))),
        None => (None, None),
    };
    conn.execute(
        "UPDATE bookings SET proposed_start_time = ?2, proposed_end_time = ?3,
         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE id = ?1",
        params![id.to_string(), start, end],
    )?;
    Ok(())
}

/// Confirmed bookings whose slot ended strictly inside `(after, before)`.
pub fn confirmed_ending_between(
    conn: &Connection,
    after: DateTime<Utc>,
    before: DateTime<Utc>,
) -> rusqlite::Result<Vec<Uuid>> {
    let mut stmt = conn.prepare(
        "SELECT b.id FROM bookings b
         JOIN availability_slots s ON s.id = b.slot_id
         WHERE b.status = 'confirmed' AND s.end_time > ?1 AND s.end_time < ?2
         ORDER BY s.end_time ASC",
    )?;
    let rows = stmt.query_map(params![ts(&after), ts(&before)], |row| uuid_at(row, 0))?;
    let mut ids = Vec::new();
    for row in rows {
        ids.push(row?);
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use crate::queries::{languages, slots, users};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use tutorlane_core::{AvailabilitySlot, Language, Role, SlotStatus, User};

    fn user(name: &str, role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            name: name.into(),
            email: format!("{}@example.com", name.to_lowercase()),
            role,
            credit_balance: Decimal::ZERO,
        }
    }

    /// Seed one booking in `status` and return its id.
    async fn setup_db(status: BookingStatus) -> (Database, Uuid) {
        let db = Database::open_in_memory().await.unwrap();
        let booking_id = Uuid::new_v4();
        db.transaction(move |tx| {
            let student = user("Amina", Role::Student);
            let teacher = user("Otieno", Role::Teacher);
            users::insert_user(tx, &student)?;
            users::insert_user(tx, &teacher)?;
            let language = Language {
                id: Uuid::new_v4(),
                name: "Swahili".into(),
                price_per_session: dec!(15.00),
                currency: "USD".into(),
            };
            languages::insert_language(tx, &language)?;
            let start = chrono::Utc::now() + chrono::Duration::days(1);
            let slot = AvailabilitySlot {
                id: Uuid::new_v4(),
                teacher_id: teacher.id,
                language_id: language.id,
                start_time: start,
                end_time: start + chrono::Duration::hours(1),
                max_students: 1,
                current_students: 1,
                status: SlotStatus::Full,
            };
            slots::insert_slot(tx, &slot)?;
            insert_booking(
                tx,
                &Booking {
                    id: booking_id,
                    student_id: student.id,
                    teacher_id: teacher.id,
                    slot_id: slot.id,
                    status,
                    price: dec!(15.00),
                    currency: "USD".into(),
                    proposed_start_time: None,
                    proposed_end_time: None,
                },
            )
        })
        .await
        .unwrap();
        (db, booking_id)
    }

    #[tokio::test]
    async fn legal_transition_moves_the_row_once() {
        let (db, id) = setup_db(BookingStatus::Confirmed).await;
        let moved = db
            .transaction(move |tx| {
                transition(tx, id, BookingStatus::Confirmed, BookingStatus::Completed)
            })
            .await
            .unwrap();
        assert!(moved);

        let again = db
            .transaction(move |tx| {
                transition(tx, id, BookingStatus::Confirmed, BookingStatus::Cancelled)
            })
            .await
            .unwrap();
        assert!(!again, "row already left confirmed");
    }

    #[tokio::test]
    async fn illegal_transition_is_refused_without_writing() {
        let (db, id) = setup_db(BookingStatus::Completed).await;
        let err = db
            .transaction(move |tx| {
                transition(tx, id, BookingStatus::Completed, BookingStatus::Confirmed)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TutorError::InvalidTransition { .. }), "got {err:?}");

        let booking = db
            .read(move |conn| get_booking(conn, id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(booking.status, BookingStatus::Completed);
    }
}
