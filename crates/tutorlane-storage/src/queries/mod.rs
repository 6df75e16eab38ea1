// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the ledger tables.
//!
//! Functions take a `&rusqlite::Connection` (a `Transaction` derefs to one)
//! so the booking engine can compose several of them inside one
//! [`Database::transaction`](crate::Database::transaction). Guarded updates
//! return whether a row actually moved, so callers can detect a lost race.

pub mod bookings;
pub mod bundles;
pub mod languages;
pub mod outbox;
pub mod payments;
pub mod payouts;
pub mod referrals;
pub mod slots;
pub mod users;
