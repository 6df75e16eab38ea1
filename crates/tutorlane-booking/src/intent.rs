// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! How the payer wants to pay, and what the client must do next.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tutorlane_core::{PaymentProvider, PaymentStatus, TutorError};

/// Currency push payments are collected in.
pub const PUSH_CURRENCY: &str = "KES";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PaymentIntent {
    /// Debit the student's credit balance inside the allocating transaction.
    WalletCredit,
    /// Mobile-money push to `phone`, settled by a provider callback.
    Mpesa { phone: String },
    /// Redirect order, created and captured by follow-up calls.
    Paypal,
}

impl PaymentIntent {
    pub fn provider(&self) -> PaymentProvider {
        match self {
            PaymentIntent::WalletCredit => PaymentProvider::Credit,
            PaymentIntent::Mpesa { .. } => PaymentProvider::Mpesa,
            PaymentIntent::Paypal => PaymentProvider::Paypal,
        }
    }

    /// Whether the charge settles inside the allocating transaction.
    pub fn settles_immediately(&self) -> bool {
        matches!(self, PaymentIntent::WalletCredit)
    }

    /// Payment status the ledger starts with.
    pub fn initial_status(&self) -> PaymentStatus {
        if self.settles_immediately() {
            PaymentStatus::Succeeded
        } else {
            PaymentStatus::Pending
        }
    }

    /// Currency the provider insists on, if any.
    pub fn settlement_currency(&self) -> Option<&'static str> {
        match self {
            PaymentIntent::Mpesa { .. } => Some(PUSH_CURRENCY),
            _ => None,
        }
    }

    /// Cheap checks that must pass before any transaction opens.
    ///
    /// Phone number format is the gateway's concern; only presence is
    /// checked here.
    pub fn validate(&self) -> Result<(), TutorError> {
        match self {
            PaymentIntent::Mpesa { phone } if phone.trim().is_empty() => Err(
                TutorError::InvalidInput("a phone number is required for M-Pesa payments".into()),
            ),
            _ => Ok(()),
        }
    }
}

/// What the caller has to do after a successful allocation or purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "next", rename_all = "snake_case")]
pub enum NextStep {
    /// Paid from credit; nothing left to do.
    Settled,
    /// A push prompt is on the payer's phone; a callback will settle it.
    AwaitPushConfirmation {
        merchant_request_id: String,
        customer_message: Option<String>,
    },
    /// Create a redirect order for this payment, then capture it.
    CreateRedirectOrder { payment_id: Uuid },
}
