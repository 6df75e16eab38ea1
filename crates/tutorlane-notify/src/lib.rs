// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification side of the booking engine.
//!
//! The engine only writes domain events to the outbox. This crate drains
//! them after commit: it renders each event into emails for the people
//! involved and hands them to a [`Notifier`](tutorlane_core::Notifier).
//! Delivery failures are retried by the outbox and never reach the ledger.

pub mod brevo;
pub mod dispatcher;
pub mod log;
pub mod templates;

use std::sync::Arc;

use tutorlane_config::TutorlaneConfig;
use tutorlane_core::{Notifier, TutorError};

pub use brevo::BrevoNotifier;
pub use dispatcher::{DispatchOutcome, EventDispatcher};
pub use log::LogNotifier;

/// The configured sender: Brevo when an API key is set, the log otherwise.
pub fn notifier_from_config(config: &TutorlaneConfig) -> Result<Arc<dyn Notifier>, TutorError> {
    Ok(match BrevoNotifier::from_config(config)? {
        Some(brevo) => Arc::new(brevo),
        None => {
            tracing::info!("email API key not set; notifications go to the log");
            Arc::new(LogNotifier)
        }
    })
}
