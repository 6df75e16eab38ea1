// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Uniform interface over external payment providers.

use async_trait::async_trait;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::TutorError;
use crate::types::PaymentProvider;

/// A charge to open with an external provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargeRequest {
    /// Internal payment id; the provider echoes it back as the correlation
    /// identifier.
    pub payment_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    /// Provider-specific payer reference (a phone number for push payments).
    pub payer_ref: Option<String>,
}

/// What the provider returned when the charge was opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderHandle {
    /// Provider-side identifier (push request id or order id).
    pub provider_ref: String,
    /// Message to relay to the payer, if any.
    pub customer_message: Option<String>,
}

/// Result of capturing an authorized redirect order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureResult {
    /// Provider order status, e.g. `COMPLETED`.
    pub status: String,
    /// Provider transaction id to record on the payment.
    pub provider_txn_id: String,
}

impl CaptureResult {
    pub fn is_completed(&self) -> bool {
        self.status.eq_ignore_ascii_case("COMPLETED")
    }
}

/// An external payment rail.
///
/// Charges are synchronous to open and confirmed asynchronously, either by a
/// provider callback or by an explicit [`capture`](PaymentGateway::capture).
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// The provider this gateway speaks for.
    fn provider(&self) -> PaymentProvider;

    /// Open a charge. Must not be called inside a ledger transaction.
    async fn initiate(&self, request: &ChargeRequest) -> Result<ProviderHandle, TutorError>;

    /// Capture an authorized order. Push-payment rails have nothing to capture.
    async fn capture(&self, provider_ref: &str) -> Result<CaptureResult, TutorError> {
        Err(TutorError::InvalidInput(format!(
            "{} payments cannot be captured (order {provider_ref})",
            self.provider()
        )))
    }
}
