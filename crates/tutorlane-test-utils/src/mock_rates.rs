// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed exchange-rate table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;
use tutorlane_core::{RateSource, TutorError};

pub struct FixedRates {
    rates: HashMap<String, Decimal>,
    failing: AtomicBool,
    lookups: AtomicUsize,
}

impl Default for FixedRates {
    fn default() -> Self {
        Self::new()
    }
}

impl FixedRates {
    /// A table with USD only.
    pub fn new() -> Self {
        Self {
            rates: HashMap::from([("USD".to_string(), Decimal::ONE)]),
            failing: AtomicBool::new(false),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn with(mut self, currency: &str, rate: Decimal) -> Self {
        self.rates.insert(currency.to_ascii_uppercase(), rate);
        self
    }

    /// Make every lookup fail, as if the rate API were down.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateSource for FixedRates {
    async fn rate(&self, currency: &str) -> Result<Decimal, TutorError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(TutorError::Conversion("rate source unavailable".into()));
        }
        self.rates
            .get(&currency.to_ascii_uppercase())
            .copied()
            .ok_or_else(|| TutorError::Conversion(format!("{currency} exchange rate not found")))
    }
}
