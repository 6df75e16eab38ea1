// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exchange-rate source.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::TutorError;

/// Quotes currencies against a fixed base (USD).
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Units of `currency` per one unit of the base currency.
    async fn rate(&self, currency: &str) -> Result<Decimal, TutorError>;
}
