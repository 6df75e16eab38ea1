// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mobile-money push payments through the KCB Buni STK-push API.
//!
//! [`MpesaGateway::initiate`] sends a push prompt to the payer's handset and
//! returns the provider's merchant request id. The outcome arrives later on
//! the webhook, correlated by the invoice reference `"<account>-<payment id>"`.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::RoundingStrategy;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use tutorlane_config::TutorlaneConfig;
use tutorlane_core::{ChargeRequest, PaymentGateway, PaymentProvider, ProviderHandle, TutorError};

use crate::cache::ExpiringCache;
use crate::http::{build_client, decode_error, status_error, transport_error};
use crate::phone::normalize_msisdn;

/// Seconds shaved off the advertised token lifetime.
const TOKEN_EXPIRY_MARGIN_SECS: u64 = 300;

/// Path the provider posts push outcomes to, relative to the public base URL.
pub const CALLBACK_PATH: &str = "/api/v1/payments/webhook";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StkPushRequest<'a> {
    phone_number: String,
    amount: String,
    invoice_number: String,
    shared_short_code: bool,
    org_short_code: &'a str,
    org_pass_key: &'a str,
    callback_url: &'a str,
    transaction_description: &'a str,
}

#[derive(Debug, Deserialize)]
struct StkPushResponse {
    response: StkPushOutcome,
}

#[derive(Debug, Deserialize)]
struct StkPushOutcome {
    #[serde(rename = "MerchantRequestID")]
    merchant_request_id: String,
    #[serde(rename = "ResponseCode")]
    response_code: String,
    #[serde(rename = "ResponseDescription", default)]
    response_description: String,
    #[serde(rename = "CustomerMessage", default)]
    customer_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// KCB Buni STK-push gateway.
pub struct MpesaGateway {
    client: reqwest::Client,
    timeout: Duration,
    base_url: String,
    token_url: String,
    api_key: String,
    api_secret: String,
    account_number: String,
    route_code: String,
    org_short_code: String,
    org_pass_key: String,
    transaction_desc: String,
    callback_url: String,
    token: ExpiringCache<String>,
}

impl MpesaGateway {
    /// Build the gateway from configuration. Returns `None` when the
    /// provider has no credentials.
    pub fn from_config(config: &TutorlaneConfig) -> Result<Option<Self>, TutorError> {
        let mpesa = &config.mpesa;
        let (Some(api_key), Some(api_secret)) = (&mpesa.api_key, &mpesa.api_secret) else {
            return Ok(None);
        };
        let timeout = Duration::from_secs(config.commerce.gateway_timeout_secs);

        Ok(Some(Self {
            client: build_client(timeout)?,
            timeout,
            base_url: mpesa.base_url.trim_end_matches('/').to_string(),
            token_url: mpesa.token_url.clone(),
            api_key: api_key.clone(),
            api_secret: api_secret.clone(),
            account_number: mpesa.account_number.clone(),
            route_code: mpesa.route_code.clone(),
            org_short_code: mpesa.org_short_code.clone(),
            org_pass_key: mpesa.org_pass_key.clone(),
            transaction_desc: mpesa.transaction_desc.clone(),
            callback_url: format!(
                "{}{CALLBACK_PATH}",
                config.server.webhook_base_url.trim_end_matches('/')
            ),
            token: ExpiringCache::new(),
        }))
    }

    async fn access_token(&self) -> Result<String, TutorError> {
        self.token
            .get_or_refresh(|| async move {
                debug!("fetching M-Pesa access token");
                let response = self
                    .client
                    .post(&self.token_url)
                    .basic_auth(&self.api_key, Some(&self.api_secret))
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body("grant_type=client_credentials")
                    .send()
                    .await
                    .map_err(|e| transport_error("M-Pesa token", self.timeout, e))?;

                if response.status() != StatusCode::OK {
                    return Err(status_error("M-Pesa token endpoint", response).await);
                }
                let token: TokenResponse = response
                    .json()
                    .await
                    .map_err(|e| decode_error("M-Pesa token", e))?;
                let ttl = token.expires_in.saturating_sub(TOKEN_EXPIRY_MARGIN_SECS);
                Ok((token.access_token, Duration::from_secs(ttl)))
            })
            .await
    }
}

#[async_trait]
impl PaymentGateway for MpesaGateway {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Mpesa
    }

    async fn initiate(&self, request: &ChargeRequest) -> Result<ProviderHandle, TutorError> {
        let phone = normalize_msisdn(request.payer_ref.as_deref().unwrap_or_default())?;
        if !request.currency.eq_ignore_ascii_case("KES") {
            return Err(TutorError::InvalidInput(format!(
                "M-Pesa charges must be in KES, got {}",
                request.currency
            )));
        }

        let token = self.access_token().await?;
        let amount = request
            .amount
            .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
        let body = StkPushRequest {
            phone_number: phone,
            amount: amount.to_string(),
            invoice_number: format!("{}-{}", self.account_number, request.payment_id),
            shared_short_code: true,
            org_short_code: &self.org_short_code,
            org_pass_key: &self.org_pass_key,
            callback_url: &self.callback_url,
            transaction_description: &self.transaction_desc,
        };
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();

        let response = self
            .client
            .post(format!("{}/stkpush", self.base_url))
            .bearer_auth(&token)
            .header("routeCode", &self.route_code)
            .header("operation", "STKPush")
            .header("messageId", format!("{}_{nanos}", request.payment_id))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("M-Pesa STK push", self.timeout, e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.token.invalidate().await;
        }
        if status != StatusCode::OK {
            warn!(payment_id = %request.payment_id, %status, "STK push refused");
            return Err(status_error("M-Pesa STK push", response).await);
        }

        let outcome = response
            .json::<StkPushResponse>()
            .await
            .map_err(|e| decode_error("M-Pesa STK push", e))?
            .response;
        if outcome.response_code != "0" {
            warn!(
                payment_id = %request.payment_id,
                code = %outcome.response_code,
                "STK push not accepted"
            );
            return Err(TutorError::ProviderRejected(outcome.response_description));
        }

        info!(
            payment_id = %request.payment_id,
            merchant_request_id = %outcome.merchant_request_id,
            "STK push initiated"
        );
        Ok(ProviderHandle {
            provider_ref: outcome.merchant_request_id,
            customer_message: outcome.customer_message,
        })
    }
}
