// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! USD-based exchange rates from exchangerate-api.com.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;
use tracing::{debug, info};

use tutorlane_config::TutorlaneConfig;
use tutorlane_core::{RateSource, TutorError};

use crate::cache::ExpiringCache;
use crate::http::{build_client, decode_error, status_error, transport_error};

type RateTable = Arc<HashMap<String, Decimal>>;

#[derive(Debug, Deserialize)]
struct LatestRates {
    result: String,
    #[serde(default)]
    conversion_rates: HashMap<String, f64>,
}

/// Rate table fetched at most once per cache period.
pub struct ExchangeRateApi {
    client: reqwest::Client,
    timeout: Duration,
    base_url: String,
    api_key: Option<String>,
    ttl: Duration,
    table: ExpiringCache<RateTable>,
}

impl ExchangeRateApi {
    pub fn from_config(config: &TutorlaneConfig) -> Result<Self, TutorError> {
        let timeout = Duration::from_secs(config.commerce.gateway_timeout_secs);
        Ok(Self {
            client: build_client(timeout)?,
            timeout,
            base_url: config.exchange.base_url.trim_end_matches('/').to_string(),
            api_key: config.exchange.api_key.clone(),
            ttl: Duration::from_secs(config.exchange.cache_ttl_secs),
            table: ExpiringCache::new(),
        })
    }

    async fn fetch(&self) -> Result<(RateTable, Duration), TutorError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| TutorError::Conversion("exchange rate API key not configured".into()))?;

        debug!("fetching exchange rates");
        let response = self
            .client
            .get(format!("{}/{api_key}/latest/USD", self.base_url))
            .send()
            .await
            .map_err(|e| transport_error("exchange rate", self.timeout, e))?;
        if !response.status().is_success() {
            return Err(status_error("exchange rate API", response).await);
        }
        let latest: LatestRates = response
            .json()
            .await
            .map_err(|e| decode_error("exchange rate", e))?;
        if latest.result != "success" {
            return Err(TutorError::Conversion(format!(
                "exchange rate API returned result `{}`",
                latest.result
            )));
        }

        let table: HashMap<String, Decimal> = latest
            .conversion_rates
            .into_iter()
            .filter_map(|(code, rate)| {
                Decimal::from_f64(rate).map(|d| (code.to_ascii_uppercase(), d.round_dp(6)))
            })
            .collect();
        info!(currencies = table.len(), "exchange rate cache updated");
        Ok((Arc::new(table), self.ttl))
    }
}

#[async_trait]
impl RateSource for ExchangeRateApi {
    async fn rate(&self, currency: &str) -> Result<Decimal, TutorError> {
        let code = currency.to_ascii_uppercase();
        if code == "USD" {
            return Ok(Decimal::ONE);
        }
        let table = self.table.get_or_refresh(move || self.fetch()).await?;
        table
            .get(&code)
            .copied()
            .ok_or_else(|| TutorError::Conversion(format!("{code} exchange rate not found")))
    }
}
