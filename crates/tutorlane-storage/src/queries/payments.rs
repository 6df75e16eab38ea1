// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Payment rows.
//!
//! Every external correlation column is UNIQUE, so a provider event maps to
//! at most one payment. Status writes are guarded on the expected current
//! state; the boolean results tell the caller whether it won.

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use tutorlane_core::{Payment, PaymentTarget, money};

use crate::database::TxError;
use crate::rows::{enum_at, money_at, opt_enum_at, opt_uuid_at, uuid_at};

const PAYMENT_COLUMNS: &str = "id, booking_id, student_bundle_id, amount_cents, currency, \
                               provider, status, refund_status, refund_reason, \
                               provider_order_id, merchant_request_id, provider_txn_id";

fn payment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Payment> {
    let target = match (opt_uuid_at(row, 1)?, opt_uuid_at(row, 2)?) {
        (Some(booking_id), None) => PaymentTarget::Booking(booking_id),
        (None, Some(bundle_id)) => PaymentTarget::StudentBundle(bundle_id),
        _ => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                1,
                Type::Null,
                "payment must reference exactly one of booking or student bundle".into(),
            ));
        }
    };
    Ok(Payment {
        id: uuid_at(row, 0)?,
        target,
        amount: money_at(row, 3)?,
        currency: row.get(4)?,
        provider: enum_at(row, 5)?,
        status: enum_at(row, 6)?,
        refund_status: opt_enum_at(row, 7)?,
        refund_reason: row.get(8)?,
        provider_order_id: row.get(9)?,
        merchant_request_id: row.get(10)?,
        provider_txn_id: row.get(11)?,
    })
}

/// How a provider event identifies its payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentLookup {
    Id(Uuid),
    Booking(Uuid),
    ProviderOrder(String),
    MerchantRequest(String),
}

pub fn insert_payment(conn: &Connection, payment: &Payment) -> Result<(), TxError> {
    let (booking_id, bundle_id) = match payment.target {
        PaymentTarget::Booking(id) => (Some(id.to_string()), None),
        PaymentTarget::StudentBundle(id) => (None, Some(id.to_string())),
    };
    conn.execute(
        "INSERT INTO payments (id, booking_id, student_bundle_id, amount_cents, currency,
                               provider, status, provider_txn_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            payment.id.to_string(),
            booking_id,
            bundle_id,
            money::to_cents(payment.amount)?,
            payment.currency,
            payment.provider.to_string(),
            payment.status.to_string(),
            payment.provider_txn_id,
        ],
    )?;
    Ok(())
}

pub fn find_payment(conn: &Connection, lookup: &PaymentLookup) -> rusqlite::Result<Option<Payment>> {
    let (column, value) = match lookup {
        PaymentLookup::Id(id) => ("id", id.to_string()),
        PaymentLookup::Booking(id) => ("booking_id", id.to_string()),
        PaymentLookup::ProviderOrder(order) => ("provider_order_id", order.clone()),
        PaymentLookup::MerchantRequest(req) => ("merchant_request_id", req.clone()),
    };
    conn.query_row(
        &format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE {column} = ?1"),
        params![value],
        payment_from_row,
    )
    .optional()
}

pub fn get_payment(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<Payment>> {
    find_payment(conn, &PaymentLookup::Id(id))
}

pub fn set_merchant_request_id(conn: &Connection, id: Uuid, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE payments SET merchant_request_id = ?2,
         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?1",
        params![id.to_string(), value],
    )?;
    Ok(())
}

pub fn set_provider_order_id(conn: &Connection, id: Uuid, value: &str) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE payments SET provider_order_id = ?2,
         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now') WHERE id = ?1",
        params![id.to_string(), value],
    )?;
    Ok(())
}

/// `pending -> succeeded`, recording the provider transaction id.
pub fn mark_succeeded(
    conn: &Connection,
    id: Uuid,
    provider_txn_id: Option<&str>,
) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE payments SET status = 'succeeded', provider_txn_id = COALESCE(?2, provider_txn_id),
         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE id = ?1 AND status = 'pending'",
        params![id.to_string(), provider_txn_id],
    )?;
    Ok(changed == 1)
}

/// `pending -> failed`.
pub fn mark_failed(conn: &Connection, id: Uuid) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE payments SET status = 'failed',
         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE id = ?1 AND status = 'pending'",
        params![id.to_string()],
    )?;
    Ok(changed == 1)
}

/// Open a refund request on a succeeded payment that has none yet.
pub fn request_refund(conn: &Connection, id: Uuid, reason: &str) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE payments SET refund_status = 'requested', refund_reason = ?2,
         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE id = ?1 AND status = 'succeeded' AND refund_status IS NULL",
        params![id.to_string(), reason],
    )?;
    Ok(changed == 1)
}

/// `succeeded/requested -> refunded/approved`.
pub fn mark_refunded(conn: &Connection, id: Uuid) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE payments SET status = 'refunded', refund_status = 'approved',
         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE id = ?1 AND status = 'succeeded' AND refund_status = 'requested'",
        params![id.to_string()],
    )?;
    Ok(changed == 1)
}

/// `requested -> rejected`; the payment itself stays succeeded.
pub fn reject_refund(conn: &Connection, id: Uuid) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "UPDATE payments SET refund_status = 'rejected',
         updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE id = ?1 AND status = 'succeeded' AND refund_status = 'requested'",
        params![id.to_string()],
    )?;
    Ok(changed == 1)
}
