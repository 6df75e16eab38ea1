// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Push-payment callback.
//!
//! The provider posts the STK callback envelope once the customer answers
//! the prompt (or the prompt expires). The invoice reference we sent,
//! `"<account>-<payment id>"`, comes back in `Reference`; when it is absent
//! or garbled the payment is found by `MerchantRequestID` instead.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tutorlane_booking::{PaymentLookup, ProviderEvent, ReconcileOutcome, SettlementOutcome};

use crate::error::{ApiError, ErrorResponse};
use crate::server::AppState;

const RECEIPT_ITEM: &str = "MpesaReceiptNumber";

#[derive(Debug, Deserialize)]
pub struct CallbackEnvelope {
    #[serde(rename = "Body")]
    pub body: CallbackBody,
}

#[derive(Debug, Deserialize)]
pub struct CallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkCallback {
    #[serde(rename = "MerchantRequestID", default)]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID", default)]
    pub checkout_request_id: String,
    pub result_code: i64,
    #[serde(default)]
    pub result_desc: String,
    #[serde(default)]
    pub callback_metadata: Option<CallbackMetadata>,
    #[serde(default)]
    pub reference: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackMetadata {
    #[serde(rename = "Item", default)]
    pub items: Vec<CallbackItem>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackItem {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Value", default)]
    pub value: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub outcome: ReconcileOutcome,
}

impl StkCallback {
    /// The payment this callback is about.
    pub fn correlation(&self) -> Option<PaymentLookup> {
        if let Some(id) = payment_id_from_reference(&self.reference) {
            return Some(PaymentLookup::Id(id));
        }
        let merchant = self.merchant_request_id.trim();
        (!merchant.is_empty()).then(|| PaymentLookup::MerchantRequest(merchant.to_string()))
    }

    pub fn outcome(&self) -> SettlementOutcome {
        if self.result_code == 0 {
            SettlementOutcome::Succeeded {
                provider_txn_id: self.receipt_number(),
            }
        } else {
            SettlementOutcome::Failed {
                reason: format!("{} (code {})", self.result_desc, self.result_code),
            }
        }
    }

    fn receipt_number(&self) -> Option<String> {
        self.callback_metadata
            .as_ref()?
            .items
            .iter()
            .find(|item| item.name == RECEIPT_ITEM)
            .and_then(|item| match &item.value {
                serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
    }
}

/// The payment id is the UUID at the end of the reference; the account
/// prefix may itself contain dashes.
fn payment_id_from_reference(reference: &str) -> Option<Uuid> {
    let reference = reference.trim();
    let start = reference.len().checked_sub(36)?;
    reference.get(start..)?.parse().ok()
}

/// POST /api/v1/payments/webhook
///
/// Answers 200 for every well-formed callback, including ones the ledger
/// ignores, so the provider stops redelivering. Only unparseable payloads
/// and unknown payments get a non-200.
pub async fn post_webhook(
    State(state): State<AppState>,
    payload: Result<Json<CallbackEnvelope>, JsonRejection>,
) -> Response {
    let Json(envelope) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "malformed payment callback");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "cannot parse webhook payload".to_string(),
                }),
            )
                .into_response();
        }
    };
    let stk = envelope.body.stk_callback;

    let Some(correlation) = stk.correlation() else {
        tracing::warn!(reference = %stk.reference, "payment callback without a usable reference");
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "callback carries no payment reference".to_string(),
            }),
        )
            .into_response();
    };

    tracing::info!(
        merchant_request_id = %stk.merchant_request_id,
        checkout_request_id = %stk.checkout_request_id,
        result_code = stk.result_code,
        "payment callback received"
    );

    let event = ProviderEvent {
        correlation,
        outcome: stk.outcome(),
    };
    match state.engine.reconcile(event).await {
        Ok(ReconcileOutcome::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "payment record not found".to_string(),
            }),
        )
            .into_response(),
        Ok(outcome) => (StatusCode::OK, Json(WebhookResponse { outcome })).into_response(),
        Err(err) => ApiError(err).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn callback(json: serde_json::Value) -> StkCallback {
        serde_json::from_value::<CallbackEnvelope>(json)
            .unwrap()
            .body
            .stk_callback
    }

    #[test]
    fn success_callback_carries_receipt() {
        let id = Uuid::new_v4();
        let stk = callback(serde_json::json!({
            "Body": {"stkCallback": {
                "MerchantRequestID": "m-1",
                "CheckoutRequestID": "c-1",
                "ResultCode": 0,
                "ResultDesc": "The service request is processed successfully.",
                "CallbackMetadata": {"Item": [
                    {"Name": "Amount", "Value": 1935},
                    {"Name": "MpesaReceiptNumber", "Value": "QKX12345"}
                ]},
                "Reference": format!("TL-{id}")
            }}
        }));
        assert_eq!(stk.correlation(), Some(PaymentLookup::Id(id)));
        assert_eq!(
            stk.outcome(),
            SettlementOutcome::Succeeded {
                provider_txn_id: Some("QKX12345".into())
            }
        );
    }

    #[test]
    fn failure_callback_keeps_description() {
        let stk = callback(serde_json::json!({
            "Body": {"stkCallback": {
                "MerchantRequestID": "m-2",
                "ResultCode": 1032,
                "ResultDesc": "Request cancelled by user",
                "Reference": ""
            }}
        }));
        assert_eq!(
            stk.correlation(),
            Some(PaymentLookup::MerchantRequest("m-2".into()))
        );
        assert!(matches!(
            stk.outcome(),
            SettlementOutcome::Failed { reason } if reason.contains("cancelled by user")
        ));
    }

    #[test]
    fn reference_prefix_may_contain_dashes() {
        let id = Uuid::new_v4();
        assert_eq!(payment_id_from_reference(&format!("MY-ACCT-{id}")), Some(id));
        assert_eq!(payment_id_from_reference("ACCOUNT-1234"), None);
        assert_eq!(payment_id_from_reference(""), None);
    }
}
