// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite ledger store for the Tutorlane booking core.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, serializing write transactions,
//! and typed row access for slots, bookings, payments, wallets, payouts,
//! referrals and the domain-event outbox.

pub mod database;
pub mod migrations;
pub mod queries;
mod rows;

pub use database::{Database, TxError};
pub use queries::outbox::OutboxEntry;
