// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Referral rows. A user can be referred at most once.

use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use uuid::Uuid;

use tutorlane_core::{Referral, money};

use crate::database::TxError;
use crate::rows::{enum_at, money_at, uuid_at};

const REFERRAL_COLUMNS: &str = "id, referrer_id, referred_user_id, status, reward_amount_cents";

fn referral_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Referral> {
    Ok(Referral {
        id: uuid_at(row, 0)?,
        referrer_id: uuid_at(row, 1)?,
        referred_user_id: uuid_at(row, 2)?,
        status: enum_at(row, 3)?,
        reward_amount: money_at(row, 4)?,
    })
}

pub fn insert_referral(conn: &Connection, referral: &Referral) -> Result<(), TxError> {
    conn.execute(
        "INSERT INTO referrals (id, referrer_id, referred_user_id, status, reward_amount_cents)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            referral.id.to_string(),
            referral.referrer_id.to_string(),
            referral.referred_user_id.to_string(),
            referral.status.to_string(),
            money::to_cents(referral.reward_amount)?,
        ],
    )?;
    Ok(())
}

pub fn find_for_referred_user(
    conn: &Connection,
    referred_user_id: Uuid,
) -> rusqlite::Result<Option<Referral>> {
    conn.query_row(
        &format!("SELECT {REFERRAL_COLUMNS} FROM referrals WHERE referred_user_id = ?1"),
        params![referred_user_id.to_string()],
        referral_from_row,
    )
    .optional()
}

/// `pending -> completed` with the reward recorded. Returns whether it moved.
pub fn complete(conn: &Connection, id: Uuid, reward: Decimal) -> Result<bool, TxError> {
    let changed = conn.execute(
        "UPDATE referrals SET status = 'completed', reward_amount_cents = ?2
         WHERE id = ?1 AND status = 'pending'",
        params![id.to_string(), money::to_cents(reward)?],
    )?;
    Ok(changed == 1)
}
