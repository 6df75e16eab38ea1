// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Language catalogue (per-session price and currency).

use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use tutorlane_core::{Language, money};

use crate::database::TxError;
use crate::rows::{money_at, uuid_at};

pub fn insert_language(conn: &Connection, language: &Language) -> Result<(), TxError> {
    conn.execute(
        "INSERT INTO languages (id, name, price_per_session_cents, currency)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            language.id.to_string(),
            language.name,
            money::to_cents(language.price_per_session)?,
            language.currency,
        ],
    )?;
    Ok(())
}

pub fn get_language(conn: &Connection, id: Uuid) -> rusqlite::Result<Option<Language>> {
    conn.query_row(
        "SELECT id, name, price_per_session_cents, currency FROM languages WHERE id = ?1",
        params![id.to_string()],
        |row| {
            Ok(Language {
                id: uuid_at(row, 0)?,
                name: row.get(1)?,
                price_per_session: money_at(row, 2)?,
                currency: row.get(3)?,
            })
        },
    )
    .optional()
}
