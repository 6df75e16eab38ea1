// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Tutorlane integration tests.
//!
//! Provides mock collaborators (payment gateway, exchange rates, notifier)
//! and a [`TestHarness`] that seeds a temp SQLite ledger with the usual cast:
//! a student, a teacher, an admin, a language, a slot and a bundle.

pub mod harness;
pub mod mock_gateway;
pub mod mock_notifier;
pub mod mock_rates;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_gateway::{MockGateway, MockMode};
pub use mock_notifier::RecordingNotifier;
pub use mock_rates::FixedRates;
