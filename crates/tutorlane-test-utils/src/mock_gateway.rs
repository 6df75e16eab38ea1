// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scriptable payment gateway that records every call.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tutorlane_core::{
    CaptureResult, ChargeRequest, PaymentGateway, PaymentProvider, ProviderHandle, TutorError,
};

/// How the mock answers the next calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockMode {
    Accept,
    /// Answer with a provider-side rejection.
    Reject(String),
    /// Fail as if the provider were unreachable.
    Unavailable,
    /// Sleep before answering, to exercise caller timeouts.
    Slow(Duration),
}

pub struct MockGateway {
    provider: PaymentProvider,
    mode: Mutex<MockMode>,
    capture_status: Mutex<String>,
    charges: Mutex<Vec<ChargeRequest>>,
    captures: Mutex<Vec<String>>,
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockGateway {
    pub fn new(provider: PaymentProvider) -> Self {
        Self {
            provider,
            mode: Mutex::new(MockMode::Accept),
            capture_status: Mutex::new("COMPLETED".to_string()),
            charges: Mutex::new(Vec::new()),
            captures: Mutex::new(Vec::new()),
        }
    }

    pub fn set_mode(&self, mode: MockMode) {
        *lock(&self.mode) = mode;
    }

    /// Status the next captures report, e.g. `PAYER_ACTION_REQUIRED`.
    pub fn set_capture_status(&self, status: &str) {
        *lock(&self.capture_status) = status.to_string();
    }

    pub fn charges(&self) -> Vec<ChargeRequest> {
        lock(&self.charges).clone()
    }

    pub fn captures(&self) -> Vec<String> {
        lock(&self.captures).clone()
    }

    /// The provider reference handed out for the n-th charge (1-based).
    pub fn provider_ref(&self, n: usize) -> String {
        format!("{}-ref-{n}", self.provider)
    }

    async fn answer(&self) -> Result<(), TutorError> {
        let mode = lock(&self.mode).clone();
        match mode {
            MockMode::Accept => Ok(()),
            MockMode::Reject(reason) => Err(TutorError::ProviderRejected(reason)),
            MockMode::Unavailable => Err(TutorError::Provider {
                message: format!("{} unavailable", self.provider),
                source: None,
            }),
            MockMode::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    fn provider(&self) -> PaymentProvider {
        self.provider
    }

    async fn initiate(&self, request: &ChargeRequest) -> Result<ProviderHandle, TutorError> {
        let n = {
            let mut charges = lock(&self.charges);
            charges.push(request.clone());
            charges.len()
        };
        self.answer().await?;
        Ok(ProviderHandle {
            provider_ref: self.provider_ref(n),
            customer_message: Some("Enter your PIN to complete the payment".to_string()),
        })
    }

    async fn capture(&self, provider_ref: &str) -> Result<CaptureResult, TutorError> {
        lock(&self.captures).push(provider_ref.to_string());
        self.answer().await?;
        Ok(CaptureResult {
            status: lock(&self.capture_status).clone(),
            provider_txn_id: format!("CAP-{provider_ref}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn charge() -> ChargeRequest {
        ChargeRequest {
            payment_id: Uuid::new_v4(),
            amount: dec!(10.00),
            currency: "USD".into(),
            payer_ref: None,
        }
    }

    #[tokio::test]
    async fn records_and_numbers_charges() {
        let gateway = MockGateway::new(PaymentProvider::Paypal);
        let first = gateway.initiate(&charge()).await.unwrap();
        let second = gateway.initiate(&charge()).await.unwrap();
        assert_eq!(first.provider_ref, "paypal-ref-1");
        assert_eq!(second.provider_ref, gateway.provider_ref(2));
        assert_eq!(gateway.charges().len(), 2);
    }

    #[tokio::test]
    async fn rejection_mode_still_records() {
        let gateway = MockGateway::new(PaymentProvider::Mpesa);
        gateway.set_mode(MockMode::Reject("declined".into()));
        let err = gateway.initiate(&charge()).await.unwrap_err();
        assert!(matches!(err, TutorError::ProviderRejected(_)));
        assert_eq!(gateway.charges().len(), 1);
    }
}
