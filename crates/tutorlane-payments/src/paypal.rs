// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redirect-order payments through the PayPal Orders v2 API.
//!
//! An order is created for the payment amount; the payer approves it on the
//! provider's pages, then the order is captured. Only a `COMPLETED` capture
//! settles the payment.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::RoundingStrategy;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use tutorlane_config::TutorlaneConfig;
use tutorlane_core::{
    CaptureResult, ChargeRequest, PaymentGateway, PaymentProvider, ProviderHandle, TutorError,
};

use crate::cache::ExpiringCache;
use crate::http::{build_client, decode_error, status_error, transport_error};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct Order {
    id: String,
    status: String,
    #[serde(default)]
    purchase_units: Vec<PurchaseUnit>,
}

#[derive(Debug, Default, Deserialize)]
struct PurchaseUnit {
    #[serde(default)]
    payments: Option<UnitPayments>,
}

#[derive(Debug, Default, Deserialize)]
struct UnitPayments {
    #[serde(default)]
    captures: Vec<Capture>,
}

#[derive(Debug, Deserialize)]
struct Capture {
    id: String,
}

impl Order {
    /// Id of the first capture, falling back to the order id.
    fn capture_id(&self) -> String {
        self.purchase_units
            .first()
            .and_then(|unit| unit.payments.as_ref())
            .and_then(|payments| payments.captures.first())
            .map(|capture| capture.id.clone())
            .unwrap_or_else(|| self.id.clone())
    }
}

pub struct PaypalGateway {
    client: reqwest::Client,
    timeout: Duration,
    api_base_url: String,
    client_id: String,
    client_secret: String,
    token: ExpiringCache<String>,
}

impl PaypalGateway {
    /// Build the gateway from configuration. Returns `None` when the
    /// provider has no credentials.
    pub fn from_config(config: &TutorlaneConfig) -> Result<Option<Self>, TutorError> {
        let paypal = &config.paypal;
        let (Some(client_id), Some(client_secret)) = (&paypal.client_id, &paypal.client_secret)
        else {
            return Ok(None);
        };
        let timeout = Duration::from_secs(config.commerce.gateway_timeout_secs);

        Ok(Some(Self {
            client: build_client(timeout)?,
            timeout,
            api_base_url: paypal.api_base_url.trim_end_matches('/').to_string(),
            client_id: client_id.clone(),
            client_secret: client_secret.clone(),
            token: ExpiringCache::new(),
        }))
    }

    async fn access_token(&self) -> Result<String, TutorError> {
        self.token
            .get_or_refresh(|| async move {
                debug!("fetching PayPal access token");
                let response = self
                    .client
                    .post(format!("{}/v1/oauth2/token", self.api_base_url))
                    .basic_auth(&self.client_id, Some(&self.client_secret))
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body("grant_type=client_credentials")
                    .send()
                    .await
                    .map_err(|e| transport_error("PayPal token", self.timeout, e))?;

                if response.status() != StatusCode::OK {
                    return Err(status_error("PayPal token endpoint", response).await);
                }
                let token: TokenResponse = response
                    .json()
                    .await
                    .map_err(|e| decode_error("PayPal token", e))?;
                let ttl = token.expires_in.saturating_sub(300);
                Ok((token.access_token, Duration::from_secs(ttl)))
            })
            .await
    }

    async fn post_order(
        &self,
        what: &str,
        url: String,
        body: Option<serde_json::Value>,
    ) -> Result<Order, TutorError> {
        let token = self.access_token().await?;
        let mut request = self
            .client
            .post(url)
            .bearer_auth(&token)
            .header("content-type", "application/json");
        request = match body {
            Some(body) => request.json(&body),
            None => request.body("{}"),
        };
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(what, self.timeout, e))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            self.token.invalidate().await;
        }
        if !response.status().is_success() {
            return Err(status_error(what, response).await);
        }
        response.json().await.map_err(|e| decode_error(what, e))
    }
}

#[async_trait]
impl PaymentGateway for PaypalGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Paypal
    }

    async fn initiate(&self, request: &ChargeRequest) -> Result<ProviderHandle, TutorError> {
        let value = request
            .amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
        let body = json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "custom_id": request.payment_id.to_string(),
                "amount": {
                    "currency_code": request.currency.to_ascii_uppercase(),
                    "value": format!("{value:.2}"),
                }
            }]
        });
        let order = self
            .post_order(
                "PayPal create order",
                format!("{}/v2/checkout/orders", self.api_base_url),
                Some(body),
            )
            .await?;

        info!(payment_id = %request.payment_id, order_id = %order.id, "PayPal order created");
        Ok(ProviderHandle {
            provider_ref: order.id,
            customer_message: None,
        })
    }

    async fn capture(&self, provider_ref: &str) -> Result<CaptureResult, TutorError> {
        let order = self
            .post_order(
                "PayPal capture order",
                format!(
                    "{}/v2/checkout/orders/{provider_ref}/capture",
                    self.api_base_url
                ),
                None,
            )
            .await?;

        debug!(order_id = %order.id, status = %order.status, "PayPal order captured");
        Ok(CaptureResult {
            provider_txn_id: order.capture_id(),
            status: order.status,
        })
    }
}
