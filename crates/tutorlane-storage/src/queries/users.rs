// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User accounts, student credit balances and teacher earning balances.

use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use uuid::Uuid;

use tutorlane_core::{TeacherAccount, TutorError, User, money};

use crate::database::TxError;
use crate::rows::{enum_at, money_at, uuid_at};

pub fn insert_user(conn: &Connection, user: &User) -> Result<(), TxError> {
    conn.execute(
        "INSERT INTO users (id, name, email, role, credit_balance_cents)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            user.id.to_string(),
            user.name,
            user.email,
            user.role.to_string(),
            money::to_cents(user.credit_balance)?,
        ],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        "SELECT id, name, email, role, credit_balance_cents FROM users WHERE id = ?1",
        params![id.to_string()],
        |row| {
            Ok(User {
                id: uuid_at(row, 0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                role: enum_at(row, 3)?,
                credit_balance: money_at(row, 4)?,
            })
        },
    )
    .optional()
}

/// Apply `delta` to a student's credit balance.
///
/// A debit that would take the balance below zero fails with
/// [`TutorError::InsufficientCredit`] and changes nothing.
pub fn adjust_credit(conn: &Connection, user_id: Uuid, delta: Decimal) -> Result<(), TxError> {
    let delta_cents = money::to_cents(delta)?;
    let changed = conn.execute(
        "UPDATE users SET credit_balance_cents = credit_balance_cents + ?2
         WHERE id = ?1 AND credit_balance_cents + ?2 >= 0",
        params![user_id.to_string(), delta_cents],
    )?;
    if changed == 1 {
        return Ok(());
    }
    if get_user(conn, user_id)?.is_none() {
        return Err(TutorError::not_found("user", user_id).into());
    }
    Err(TutorError::InsufficientCredit.into())
}

pub fn insert_teacher_account(conn: &Connection, account: &TeacherAccount) -> Result<(), TxError> {
    conn.execute(
        "INSERT INTO teacher_accounts (user_id, current_balance_cents) VALUES (?1, ?2)",
        params![
            account.user_id.to_string(),
            money::to_cents(account.current_balance)?
        ],
    )?;
    Ok(())
}

pub fn get_teacher_account(
    conn: &Connection,
    user_id: Uuid,
) -> rusqlite::Result<Option<TeacherAccount>> {
    conn.query_row(
        "SELECT user_id, current_balance_cents FROM teacher_accounts WHERE user_id = ?1",
        params![user_id.to_string()],
        |row| {
            Ok(TeacherAccount {
                user_id: uuid_at(row, 0)?,
                current_balance: money_at(row, 1)?,
            })
        },
    )
    .optional()
}

/// Apply `delta` to a teacher's earnings balance.
///
/// A debit beyond the balance fails with [`TutorError::InsufficientBalance`].
pub fn adjust_earnings(conn: &Connection, teacher_id: Uuid, delta: Decimal) -> Result<(), TxError> {
    let delta_cents = money::to_cents(delta)?;
    let changed = conn.execute(
        "UPDATE teacher_accounts SET current_balance_cents = current_balance_cents + ?2
         WHERE user_id = ?1 AND current_balance_cents + ?2 >= 0",
        params![teacher_id.to_string(), delta_cents],
    )?;
    if changed == 1 {
        return Ok(());
    }
    if get_teacher_account(conn, teacher_id)?.is_none() {
        return Err(TutorError::not_found("teacher account", teacher_id).into());
    }
    Err(TutorError::InsufficientBalance.into())
}
