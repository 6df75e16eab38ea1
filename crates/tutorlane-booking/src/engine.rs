// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine assembly and the commercial policy it applies.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use tracing::warn;

use tutorlane_config::TutorlaneConfig;
use tutorlane_core::{
    ChargeRequest, Payment, PaymentGateway, PaymentProvider, RateSource, TutorError, money,
};
use tutorlane_storage::Database;
use tutorlane_storage::queries::payments;

use crate::intent::{NextStep, PaymentIntent};

/// Numbers that decide who is paid what, and how long we wait for providers.
#[derive(Debug, Clone, PartialEq)]
pub struct CommercePolicy {
    /// Platform share of a completed booking, in `[0, 1)`.
    pub commission_rate: Decimal,
    /// Credit granted to a referrer on the referred user's first settlement.
    pub referral_reward: Decimal,
    /// Hard bound on any single provider call.
    pub gateway_timeout: Duration,
    /// Slots that ended more than this long ago are past the sweep window.
    pub sweep_window_start: chrono::Duration,
    /// Grace period after a slot ends before the class counts as missed.
    pub sweep_window_end: chrono::Duration,
}

impl CommercePolicy {
    pub fn from_config(config: &TutorlaneConfig) -> Result<Self, TutorError> {
        let decimal = |name: &str, value: f64, dp: u32| {
            Decimal::from_f64(value)
                .map(|d| d.round_dp(dp))
                .ok_or_else(|| TutorError::Config(format!("{name} is not a finite number")))
        };
        let minutes = |value: u64| {
            i64::try_from(value)
                .map(chrono::Duration::minutes)
                .map_err(|_| TutorError::Config(format!("sweep window of {value} minutes is too large")))
        };
        Ok(Self {
            commission_rate: decimal("commerce.commission_rate", config.commerce.commission_rate, 4)?,
            referral_reward: decimal("commerce.referral_reward", config.commerce.referral_reward, 2)?,
            gateway_timeout: Duration::from_secs(config.commerce.gateway_timeout_secs),
            sweep_window_start: minutes(config.sweep.window_start_mins)?,
            sweep_window_end: minutes(config.sweep.window_end_mins)?,
        })
    }
}

/// The booking engine. Cheap to share behind an `Arc`.
pub struct BookingEngine {
    pub(crate) db: Arc<Database>,
    gateways: HashMap<PaymentProvider, Arc<dyn PaymentGateway>>,
    rates: Arc<dyn RateSource>,
    pub(crate) policy: CommercePolicy,
}

impl BookingEngine {
    pub fn new(db: Arc<Database>, rates: Arc<dyn RateSource>, policy: CommercePolicy) -> Self {
        Self {
            db,
            gateways: HashMap::new(),
            rates,
            policy,
        }
    }

    /// Register a gateway under the provider it reports.
    pub fn with_gateway(mut self, gateway: Arc<dyn PaymentGateway>) -> Self {
        self.gateways.insert(gateway.provider(), gateway);
        self
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn policy(&self) -> &CommercePolicy {
        &self.policy
    }

    pub(crate) fn gateway(
        &self,
        provider: PaymentProvider,
    ) -> Result<&Arc<dyn PaymentGateway>, TutorError> {
        self.gateways
            .get(&provider)
            .ok_or_else(|| TutorError::Config(format!("no {provider} gateway is configured")))
    }

    /// Run a provider call under the policy's hard timeout.
    pub(crate) async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, TutorError>>,
    ) -> Result<T, TutorError> {
        let limit = self.policy.gateway_timeout;
        tokio::time::timeout(limit, call)
            .await
            .map_err(|_| TutorError::Timeout { duration: limit })?
    }

    /// Amount and currency to charge for `price` through `intent`.
    ///
    /// Push payments settle in KES, converted before any transaction opens.
    pub(crate) async fn quote(
        &self,
        intent: &PaymentIntent,
        price: Decimal,
        currency: &str,
    ) -> Result<(Decimal, String), TutorError> {
        match intent.settlement_currency() {
            Some(target) if !target.eq_ignore_ascii_case(currency) => {
                let from_rate = self.rates.rate(currency).await?;
                let to_rate = self.rates.rate(target).await?;
                let amount = money::convert(price, from_rate, to_rate, target)?;
                Ok((amount, target.to_string()))
            }
            Some(target) => Ok((money::round_to_currency(price, target), target.to_string())),
            None => Ok((price, currency.to_string())),
        }
    }

    /// Open the external charge for a freshly committed pending payment.
    ///
    /// Runs after the allocating transaction. A failure here leaves the
    /// reservation in place.
    pub(crate) async fn open_external_charge(
        &self,
        payment: &Payment,
        intent: &PaymentIntent,
    ) -> Result<NextStep, TutorError> {
        match intent {
            PaymentIntent::WalletCredit => Ok(NextStep::Settled),
            PaymentIntent::Paypal => Ok(NextStep::CreateRedirectOrder {
                payment_id: payment.id,
            }),
            PaymentIntent::Mpesa { phone } => {
                let gateway = self.gateway(PaymentProvider::Mpesa)?;
                let request = ChargeRequest {
                    payment_id: payment.id,
                    amount: payment.amount,
                    currency: payment.currency.clone(),
                    payer_ref: Some(phone.clone()),
                };
                let handle = match self.bounded(gateway.initiate(&request)).await {
                    Ok(handle) => handle,
                    Err(e) => {
                        warn!(
                            payment_id = %payment.id,
                            error = %e,
                            "push payment initiation failed; reservation left pending"
                        );
                        return Err(e);
                    }
                };

                let payment_id = payment.id;
                let merchant_request_id = handle.provider_ref.clone();
                self.db
                    .transaction(move |tx| {
                        payments::set_merchant_request_id(tx, payment_id, &merchant_request_id)?;
                        Ok(())
                    })
                    .await?;
                Ok(NextStep::AwaitPushConfirmation {
                    merchant_request_id: handle.provider_ref,
                    customer_message: handle.customer_message,
                })
            }
        }
    }
}
