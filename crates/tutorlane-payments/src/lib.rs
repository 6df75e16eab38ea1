// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External payment rails and the exchange-rate source.
//!
//! Each adapter implements a trait from `tutorlane-core` so the booking
//! engine never sees provider wire formats:
//! - [`MpesaGateway`]: mobile-money push payments, confirmed by callback
//! - [`PaypalGateway`]: redirect orders, confirmed by capture
//! - [`ExchangeRateApi`]: USD-based rate table with a time-bounded cache

pub mod cache;
pub mod exchange;
mod http;
pub mod mpesa;
pub mod paypal;
pub mod phone;

pub use cache::ExpiringCache;
pub use exchange::ExchangeRateApi;
pub use mpesa::MpesaGateway;
pub use paypal::PaypalGateway;
pub use phone::normalize_msisdn;
