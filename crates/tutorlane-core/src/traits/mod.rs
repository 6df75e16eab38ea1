// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits the booking engine consumes.
//!
//! All traits use `#[async_trait]` so implementations can be held as
//! `Arc<dyn Trait>` and swapped for mocks in tests.

pub mod gateway;
pub mod notifier;
pub mod rates;

pub use gateway::{CaptureResult, ChargeRequest, PaymentGateway, ProviderHandle};
pub use notifier::{Notification, Notifier};
pub use rates::RateSource;
