// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The booking engine: every ledger mutation the marketplace performs.
//!
//! [`BookingEngine`] owns the database handle, the payment gateways and the
//! exchange-rate source. Its operations are grouped by concern:
//! - `allocator`: seat allocation against a slot
//! - `bundles`: multi-class package purchase
//! - `reconciler`: applying provider settlement events, redirect orders
//! - `refund`: refund requests and admin decisions
//! - `reschedule`: student proposals, teacher decisions
//! - `wallet`: completion earnings, payouts, referral rewards
//! - `slots`: teacher slot management
//! - `sweep`: marking missed classes
//!
//! Every mutation runs in one `BEGIN IMMEDIATE` transaction; external
//! provider calls happen only after it commits.

pub mod allocator;
pub mod bundles;
pub mod engine;
pub mod intent;
pub mod reconciler;
pub mod refund;
pub mod reschedule;
pub mod slots;
pub mod sweep;
pub mod wallet;

pub use allocator::Allocation;
pub use bundles::BundlePurchase;
pub use engine::{BookingEngine, CommercePolicy};
pub use intent::{NextStep, PaymentIntent};
pub use reconciler::{ProviderEvent, ReconcileOutcome, SettlementOutcome};
pub use slots::NewSlot;
pub use tutorlane_storage::queries::payments::PaymentLookup;
pub use wallet::PayoutDecision;

#[cfg(test)]
pub(crate) mod testkit {
    use std::sync::Arc;

    use tutorlane_test_utils::TestHarness;

    use crate::{BookingEngine, CommercePolicy};

    /// An engine over the harness ledger with both mock gateways wired in.
    pub fn engine(harness: &TestHarness) -> BookingEngine {
        let policy = CommercePolicy::from_config(&harness.config).unwrap();
        BookingEngine::new(Arc::clone(&harness.db), harness.rates.clone(), policy)
            .with_gateway(harness.mpesa.clone())
            .with_gateway(harness.paypal.clone())
    }
}
