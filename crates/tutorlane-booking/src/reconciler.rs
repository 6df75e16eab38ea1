// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Settlement reconciliation.
//!
//! Provider callbacks and captures arrive out of order and more than once.
//! Every event is reduced to a [`ProviderEvent`] and applied by
//! [`BookingEngine::reconcile`], which is idempotent: the first terminal
//! outcome wins, repeats are acknowledged without touching the ledger.

use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use tutorlane_core::{
    BookingStatus, DomainEvent, PaymentProvider, PaymentStatus, PaymentTarget, Principal, Role,
    TutorError,
};
use tutorlane_storage::TxError;
use tutorlane_storage::queries::payments::PaymentLookup;
use tutorlane_storage::queries::{bookings, bundles, outbox, payments};

use crate::engine::BookingEngine;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementOutcome {
    Succeeded { provider_txn_id: Option<String> },
    Failed { reason: String },
}

/// A provider's statement about one payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEvent {
    pub correlation: PaymentLookup,
    pub outcome: SettlementOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// The event moved the payment to a terminal state.
    Applied,
    /// The payment already carries this outcome.
    AlreadyApplied,
    /// No payment matches the correlation identifier.
    NotFound,
    /// The event contradicts the recorded outcome and was ignored.
    Rejected,
}

impl BookingEngine {
    /// Apply a settlement event.
    #[instrument(skip(self, event), fields(correlation = ?event.correlation))]
    pub async fn reconcile(&self, event: ProviderEvent) -> Result<ReconcileOutcome, TutorError> {
        let ProviderEvent {
            correlation,
            outcome,
        } = event;

        let result = self
            .db
            .transaction(move |tx| {
                let Some(payment) = payments::find_payment(tx, &correlation)? else {
                    return Ok(ReconcileOutcome::NotFound);
                };

                match (payment.status, &outcome) {
                    (PaymentStatus::Succeeded | PaymentStatus::Refunded, SettlementOutcome::Succeeded { .. })
                    | (PaymentStatus::Failed, SettlementOutcome::Failed { .. }) => {
                        Ok(ReconcileOutcome::AlreadyApplied)
                    }
                    (PaymentStatus::Failed, SettlementOutcome::Succeeded { .. }) => {
                        warn!(payment_id = %payment.id, "success reported for a failed payment; ignored");
                        Ok(ReconcileOutcome::Rejected)
                    }
                    (PaymentStatus::Succeeded | PaymentStatus::Refunded, SettlementOutcome::Failed { reason }) => {
                        warn!(payment_id = %payment.id, %reason, "failure reported for a settled payment; ignored");
                        Ok(ReconcileOutcome::Rejected)
                    }
                    (PaymentStatus::Pending, SettlementOutcome::Failed { reason }) => {
                        payments::mark_failed(tx, payment.id)?;
                        info!(payment_id = %payment.id, %reason, "payment failed");
                        Ok(ReconcileOutcome::Applied)
                    }
                    (PaymentStatus::Pending, SettlementOutcome::Succeeded { provider_txn_id }) => {
                        payments::mark_succeeded(tx, payment.id, provider_txn_id.as_deref())?;
                        let payer = match payment.target {
                            PaymentTarget::Booking(booking_id) => {
                                let booking = bookings::get_booking(tx, booking_id)?.ok_or_else(
                                    || TxError::Domain(TutorError::not_found("booking", booking_id)),
                                )?;
                                if !bookings::transition(
                                    tx,
                                    booking_id,
                                    BookingStatus::PendingPayment,
                                    BookingStatus::Confirmed,
                                )? {
                                    return Err(TutorError::transition(
                                        "booking",
                                        booking.status,
                                        BookingStatus::Confirmed,
                                    )
                                    .into());
                                }
                                outbox::enqueue(tx, &DomainEvent::BookingConfirmed { booking_id })?;
                                booking.student_id
                            }
                            PaymentTarget::StudentBundle(student_bundle_id) => {
                                let student_bundle = bundles::get_student_bundle(tx, student_bundle_id)?
                                    .ok_or_else(|| {
                                        TxError::Domain(TutorError::not_found(
                                            "student bundle",
                                            student_bundle_id,
                                        ))
                                    })?;
                                bundles::activate(tx, student_bundle_id)?;
                                outbox::enqueue(tx, &DomainEvent::BundleActivated { student_bundle_id })?;
                                student_bundle.student_id
                            }
                        };
                        outbox::enqueue(tx, &DomainEvent::ReferralCheck { user_id: payer })?;
                        info!(payment_id = %payment.id, "payment settled");
                        Ok(ReconcileOutcome::Applied)
                    }
                }
            })
            .await?;

        if result == ReconcileOutcome::NotFound {
            warn!("settlement event matches no payment");
        }
        Ok(result)
    }

    /// Open the provider order for a pending redirect payment.
    ///
    /// Returns the provider order id the client approves against.
    #[instrument(skip(self), fields(caller = %principal.user_id))]
    pub async fn create_redirect_order(
        &self,
        principal: &Principal,
        payment_id: Uuid,
    ) -> Result<String, TutorError> {
        let (payment, payer) = self
            .db
            .read(move |c| {
                let Some(payment) = payments::get_payment(c, payment_id)? else {
                    return Ok(None);
                };
                let payer = match payment.target {
                    PaymentTarget::Booking(id) => bookings::get_booking(c, id)?.map(|b| b.student_id),
                    PaymentTarget::StudentBundle(id) => {
                        bundles::get_student_bundle(c, id)?.map(|sb| sb.student_id)
                    }
                };
                Ok(Some((payment, payer)))
            })
            .await?
            .ok_or_else(|| TutorError::not_found("payment", payment_id))?;

        if principal.role != Role::Admin && payer != Some(principal.user_id) {
            return Err(TutorError::not_found("payment", payment_id));
        }
        if payment.provider != PaymentProvider::Paypal {
            return Err(TutorError::InvalidInput(format!(
                "payment {payment_id} is not a redirect payment"
            )));
        }
        if payment.status != PaymentStatus::Pending {
            return Err(TutorError::transition(
                "payment",
                payment.status,
                PaymentStatus::Pending,
            ));
        }

        let gateway = self.gateway(PaymentProvider::Paypal)?;
        let request = tutorlane_core::ChargeRequest {
            payment_id: payment.id,
            amount: payment.amount,
            currency: payment.currency.clone(),
            payer_ref: None,
        };
        let handle = self.bounded(gateway.initiate(&request)).await?;

        let order_id = handle.provider_ref.clone();
        self.db
            .transaction(move |tx| {
                payments::set_provider_order_id(tx, payment_id, &order_id)?;
                Ok(())
            })
            .await?;
        info!(%payment_id, order_id = %handle.provider_ref, "redirect order created");
        Ok(handle.provider_ref)
    }

    /// Capture an approved redirect order and settle its payment.
    #[instrument(skip(self))]
    pub async fn capture_redirect_order(
        &self,
        order_id: &str,
    ) -> Result<ReconcileOutcome, TutorError> {
        let lookup = PaymentLookup::ProviderOrder(order_id.to_string());
        let payment = self
            .db
            .read(move |c| payments::find_payment(c, &lookup))
            .await?
            .ok_or_else(|| TutorError::not_found("order", order_id))?;

        if payment.status == PaymentStatus::Succeeded {
            return Ok(ReconcileOutcome::AlreadyApplied);
        }
        if payment.status != PaymentStatus::Pending {
            return Err(TutorError::transition(
                "payment",
                payment.status,
                PaymentStatus::Succeeded,
            ));
        }

        let gateway = self.gateway(PaymentProvider::Paypal)?;
        let capture = self.bounded(gateway.capture(order_id)).await?;
        if !capture.is_completed() {
            return Err(TutorError::ProviderRejected(format!(
                "order {order_id} captured with status {}",
                capture.status
            )));
        }

        self.reconcile(ProviderEvent {
            correlation: PaymentLookup::Id(payment.id),
            outcome: SettlementOutcome::Succeeded {
                provider_txn_id: Some(capture.provider_txn_id),
            },
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;
    use tutorlane_core::BundleStatus;
    use tutorlane_test_utils::TestHarness;

    use super::*;
    use crate::intent::PaymentIntent;
    use crate::testkit::engine;

    fn push() -> PaymentIntent {
        PaymentIntent::Mpesa {
            phone: "0712345678".into(),
        }
    }

    fn succeeded(lookup: PaymentLookup, txn: &str) -> ProviderEvent {
        ProviderEvent {
            correlation: lookup,
            outcome: SettlementOutcome::Succeeded {
                provider_txn_id: Some(txn.to_string()),
            },
        }
    }

    fn failed(lookup: PaymentLookup) -> ProviderEvent {
        ProviderEvent {
            correlation: lookup,
            outcome: SettlementOutcome::Failed {
                reason: "Request cancelled by user".into(),
            },
        }
    }

    async fn drain_kinds(harness: &TestHarness) -> Vec<&'static str> {
        let mut kinds = Vec::new();
        while let Some(entry) = outbox::dequeue(&harness.db).await.unwrap() {
            kinds.push(entry.event().unwrap().kind());
            outbox::ack(&harness.db, entry.id).await.unwrap();
        }
        kinds
    }

    #[tokio::test]
    async fn push_callback_confirms_booking() {
        let harness = TestHarness::builder().build().await.unwrap();
        let engine = engine(&harness);
        let allocation = engine
            .allocate(&harness.student(), harness.slot.id, push())
            .await
            .unwrap();

        let outcome = engine
            .reconcile(succeeded(
                PaymentLookup::Id(allocation.payment.id),
                "QKJ1ABC2DE",
            ))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Applied);

        let payment = harness.payment(allocation.payment.id).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Succeeded);
        assert_eq!(payment.provider_txn_id.as_deref(), Some("QKJ1ABC2DE"));
        let booking = harness.booking(allocation.booking.id).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        assert_eq!(
            drain_kinds(&harness).await,
            vec!["booking_confirmed", "referral_check"]
        );
    }

    #[tokio::test]
    async fn duplicate_callback_is_acknowledged_once() {
        let harness = TestHarness::builder().build().await.unwrap();
        let engine = engine(&harness);
        let allocation = engine
            .allocate(&harness.student(), harness.slot.id, push())
            .await
            .unwrap();
        let merchant = PaymentLookup::MerchantRequest(harness.mpesa.provider_ref(1));

        let first = engine
            .reconcile(succeeded(merchant.clone(), "TXN-1"))
            .await
            .unwrap();
        let second = engine
            .reconcile(succeeded(merchant, "TXN-2"))
            .await
            .unwrap();
        assert_eq!(
            (first, second),
            (ReconcileOutcome::Applied, ReconcileOutcome::AlreadyApplied)
        );

        let payment = harness.payment(allocation.payment.id).await.unwrap();
        assert_eq!(payment.provider_txn_id.as_deref(), Some("TXN-1"));
        assert_eq!(
            drain_kinds(&harness).await,
            vec!["booking_confirmed", "referral_check"]
        );
    }

    #[tokio::test]
    async fn failure_then_late_success_is_rejected() {
        let harness = TestHarness::builder().build().await.unwrap();
        let engine = engine(&harness);
        let allocation = engine
            .allocate(&harness.student(), harness.slot.id, push())
            .await
            .unwrap();
        let id = PaymentLookup::Id(allocation.payment.id);

        assert_eq!(
            engine.reconcile(failed(id.clone())).await.unwrap(),
            ReconcileOutcome::Applied
        );
        assert_eq!(
            engine.reconcile(failed(id.clone())).await.unwrap(),
            ReconcileOutcome::AlreadyApplied
        );
        assert_eq!(
            engine.reconcile(succeeded(id, "LATE")).await.unwrap(),
            ReconcileOutcome::Rejected
        );

        let payment = harness.payment(allocation.payment.id).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Failed);
        let booking = harness.booking(allocation.booking.id).await.unwrap();
        assert_eq!(booking.status, BookingStatus::PendingPayment);
        // The seat stays held after a failed payment.
        let slot = harness.slot(harness.slot.id).await.unwrap();
        assert_eq!(slot.current_students, 1);
    }

    #[tokio::test]
    async fn failure_after_success_is_rejected() {
        let harness = TestHarness::builder().build().await.unwrap();
        let engine = engine(&harness);
        let allocation = engine
            .allocate(&harness.student(), harness.slot.id, push())
            .await
            .unwrap();
        let id = PaymentLookup::Id(allocation.payment.id);
        engine.reconcile(succeeded(id.clone(), "T")).await.unwrap();
        assert_eq!(
            engine.reconcile(failed(id)).await.unwrap(),
            ReconcileOutcome::Rejected
        );
        let payment = harness.payment(allocation.payment.id).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Succeeded);
    }

    #[tokio::test]
    async fn unknown_correlation_is_not_found() {
        let harness = TestHarness::builder().build().await.unwrap();
        let engine = engine(&harness);
        let outcome = engine
            .reconcile(failed(PaymentLookup::MerchantRequest("nope".into())))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::NotFound);
    }

    #[tokio::test]
    async fn bundle_settlement_activates() {
        let harness = TestHarness::builder().build().await.unwrap();
        let engine = engine(&harness);
        let purchase = engine
            .purchase_bundle(&harness.student(), harness.bundle.id, push())
            .await
            .unwrap();
        engine
            .reconcile(succeeded(PaymentLookup::Id(purchase.payment.id), "B1"))
            .await
            .unwrap();

        let status = harness
            .db
            .read({
                let id = purchase.student_bundle.id;
                move |c| bundles::get_student_bundle(c, id)
            })
            .await
            .unwrap()
            .unwrap()
            .status;
        assert_eq!(status, BundleStatus::Active);
        assert_eq!(
            drain_kinds(&harness).await,
            vec!["bundle_activated", "referral_check"]
        );
    }

    #[tokio::test]
    async fn redirect_order_lifecycle() {
        let harness = TestHarness::builder().build().await.unwrap();
        let engine = engine(&harness);
        let allocation = engine
            .allocate(&harness.student(), harness.slot.id, PaymentIntent::Paypal)
            .await
            .unwrap();

        let order_id = engine
            .create_redirect_order(&harness.student(), allocation.payment.id)
            .await
            .unwrap();
        assert_eq!(order_id, harness.paypal.provider_ref(1));
        let charge = &harness.paypal.charges()[0];
        assert_eq!((charge.amount, charge.currency.as_str()), (dec!(15.00), "USD"));

        let outcome = engine.capture_redirect_order(&order_id).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::Applied);
        let payment = harness.payment(allocation.payment.id).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Succeeded);
        assert_eq!(
            payment.provider_txn_id.as_deref(),
            Some(format!("CAP-{order_id}").as_str())
        );

        // A second capture never reaches the provider.
        let again = engine.capture_redirect_order(&order_id).await.unwrap();
        assert_eq!(again, ReconcileOutcome::AlreadyApplied);
        assert_eq!(harness.paypal.captures().len(), 1);
    }

    #[tokio::test]
    async fn incomplete_capture_leaves_payment_pending() {
        let harness = TestHarness::builder().build().await.unwrap();
        harness.paypal.set_capture_status("PAYER_ACTION_REQUIRED");
        let engine = engine(&harness);
        let allocation = engine
            .allocate(&harness.student(), harness.slot.id, PaymentIntent::Paypal)
            .await
            .unwrap();
        let order_id = engine
            .create_redirect_order(&harness.student(), allocation.payment.id)
            .await
            .unwrap();

        let err = engine.capture_redirect_order(&order_id).await.unwrap_err();
        assert!(matches!(err, TutorError::ProviderRejected(_)));
        let payment = harness.payment(allocation.payment.id).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn redirect_order_requires_owner_and_provider() {
        let harness = TestHarness::builder().build().await.unwrap();
        let engine = engine(&harness);
        let allocation = engine
            .allocate(&harness.student(), harness.slot.id, push())
            .await
            .unwrap();

        let err = engine
            .create_redirect_order(&harness.student(), allocation.payment.id)
            .await
            .unwrap_err();
        assert!(matches!(err, TutorError::InvalidInput(_)));

        let stranger = harness.add_student(dec!(0)).await.unwrap();
        let err = engine
            .create_redirect_order(
                &Principal::new(stranger.id, Role::Student),
                allocation.payment.id,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TutorError::NotFound { .. }));

        let err = engine.capture_redirect_order("missing-order").await.unwrap_err();
        assert!(matches!(err, TutorError::NotFound { .. }));
    }
}
