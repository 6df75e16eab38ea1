// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Refund requests and the admin decision on them.
//!
//! Approval reverses a settled booking in one transaction: the payment is
//! marked refunded, the booking cancelled, the seat released, and wallet
//! payments are credited back. Provider-side refunds happen out of band.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{info, instrument};
use uuid::Uuid;

use tutorlane_core::{
    BookingStatus, DomainEvent, Payment, PaymentProvider, PaymentStatus, PaymentTarget, Principal,
    RefundStatus, Role, TutorError,
};
use tutorlane_storage::TxError;
use tutorlane_storage::queries::payments::PaymentLookup;
use tutorlane_storage::queries::{bookings, outbox, payments, slots, users};

use crate::engine::BookingEngine;

fn payment_in_refund(
    conn: &Connection,
    payment_id: Uuid,
) -> Result<Payment, TxError> {
    let payment = payments::get_payment(conn, payment_id)?
        .ok_or_else(|| TxError::Domain(TutorError::not_found("payment", payment_id)))?;
    if payment.status != PaymentStatus::Succeeded
        || payment.refund_status != Some(RefundStatus::Requested)
    {
        return Err(TutorError::transition(
            "refund",
            payment
                .refund_status
                .map_or_else(|| payment.status.to_string(), |s| s.to_string()),
            "decided",
        )
        .into());
    }
    Ok(payment)
}

impl BookingEngine {
    /// Ask for a refund of a paid booking before its class starts.
    #[instrument(skip(self, reason), fields(student_id = %principal.user_id))]
    pub async fn request_refund(
        &self,
        principal: &Principal,
        booking_id: Uuid,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Payment, TutorError> {
        principal.require(Role::Student)?;
        let reason = reason.trim().to_string();
        if reason.is_empty() {
            return Err(TutorError::InvalidInput("a refund reason is required".into()));
        }
        let student_id = principal.user_id;

        let payment = self
            .db
            .transaction(move |tx| {
                let booking = bookings::get_booking(tx, booking_id)?
                    .filter(|b| b.student_id == student_id)
                    .ok_or_else(|| TxError::Domain(TutorError::not_found("booking", booking_id)))?;
                let slot = slots::lock_slot(tx, booking.slot_id)?;
                if slot.start_time <= now {
                    return Err(TutorError::InvalidInput(
                        "refunds close once the class has started".into(),
                    )
                    .into());
                }
                let payment = payments::find_payment(tx, &PaymentLookup::Booking(booking_id))?
                    .ok_or_else(|| TxError::Domain(TutorError::not_found("payment", booking_id)))?;
                if !payments::request_refund(tx, payment.id, &reason)? {
                    return Err(match payment.refund_status {
                        Some(existing) => TutorError::InvalidInput(format!(
                            "a refund was already {existing} for this booking"
                        )),
                        None => TutorError::transition(
                            "payment",
                            payment.status,
                            RefundStatus::Requested,
                        ),
                    }
                    .into());
                }
                Ok(payments::get_payment(tx, payment.id)?.unwrap_or(payment))
            })
            .await?;

        info!(%booking_id, payment_id = %payment.id, "refund requested");
        Ok(payment)
    }

    /// Approve a requested refund.
    #[instrument(skip(self), fields(admin_id = %principal.user_id))]
    pub async fn approve_refund(
        &self,
        principal: &Principal,
        payment_id: Uuid,
    ) -> Result<Payment, TutorError> {
        principal.require(Role::Admin)?;

        let payment = self
            .db
            .transaction(move |tx| {
                let payment = payment_in_refund(tx, payment_id)?;
                let PaymentTarget::Booking(booking_id) = payment.target else {
                    return Err(TutorError::InvalidInput(
                        "bundle purchases are not refundable through the booking flow".into(),
                    )
                    .into());
                };
                let booking = bookings::get_booking(tx, booking_id)?
                    .ok_or_else(|| TxError::Domain(TutorError::not_found("booking", booking_id)))?;

                if !bookings::transition(
                    tx,
                    booking_id,
                    BookingStatus::Confirmed,
                    BookingStatus::Cancelled,
                )? {
                    return Err(TutorError::transition(
                        "booking",
                        booking.status,
                        BookingStatus::Cancelled,
                    )
                    .into());
                }

                let slot = slots::lock_slot(tx, booking.slot_id)?;
                slots::write_occupancy(
                    tx,
                    slot.id,
                    slot.current_students.saturating_sub(1),
                    slot.max_students,
                )?;

                payments::mark_refunded(tx, payment_id)?;
                if payment.provider == PaymentProvider::Credit {
                    users::adjust_credit(tx, booking.student_id, payment.amount)?;
                }
                outbox::enqueue(tx, &DomainEvent::RefundApproved { payment_id })?;
                Ok(payments::get_payment(tx, payment_id)?.unwrap_or(payment))
            })
            .await?;

        info!(%payment_id, provider = %payment.provider, "refund approved");
        Ok(payment)
    }

    /// Reject a requested refund. The payment stays settled.
    #[instrument(skip(self), fields(admin_id = %principal.user_id))]
    pub async fn reject_refund(
        &self,
        principal: &Principal,
        payment_id: Uuid,
    ) -> Result<Payment, TutorError> {
        principal.require(Role::Admin)?;

        let payment = self
            .db
            .transaction(move |tx| {
                let payment = payment_in_refund(tx, payment_id)?;
                payments::reject_refund(tx, payment_id)?;
                outbox::enqueue(tx, &DomainEvent::RefundRejected { payment_id })?;
                Ok(payments::get_payment(tx, payment_id)?.unwrap_or(payment))
            })
            .await?;

        info!(%payment_id, "refund rejected");
        Ok(payment)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use tutorlane_core::SlotStatus;
    use tutorlane_test_utils::TestHarness;

    use super::*;
    use crate::intent::PaymentIntent;
    use crate::reconciler::{ProviderEvent, SettlementOutcome};
    use crate::testkit::engine;

    #[tokio::test]
    async fn wallet_refund_restores_credit_and_seat() {
        let harness = TestHarness::builder()
            .with_student_credit(dec!(20.00))
            .build()
            .await
            .unwrap();
        let engine = engine(&harness);
        let allocation = engine
            .allocate(&harness.student(), harness.slot.id, PaymentIntent::WalletCredit)
            .await
            .unwrap();

        let requested = engine
            .request_refund(&harness.student(), allocation.booking.id, "Cannot attend", Utc::now())
            .await
            .unwrap();
        assert_eq!(requested.refund_status, Some(RefundStatus::Requested));
        assert_eq!(requested.refund_reason.as_deref(), Some("Cannot attend"));

        let refunded = engine
            .approve_refund(&harness.admin(), allocation.payment.id)
            .await
            .unwrap();
        assert_eq!(refunded.status, PaymentStatus::Refunded);
        assert_eq!(refunded.refund_status, Some(RefundStatus::Approved));

        let student = harness.user(harness.student.id).await.unwrap();
        assert_eq!(student.credit_balance, dec!(20.00));
        let slot = harness.slot(harness.slot.id).await.unwrap();
        assert_eq!((slot.current_students, slot.status), (0, SlotStatus::Available));
        let booking = harness.booking(allocation.booking.id).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Cancelled);

        // Approving twice is refused and changes nothing.
        let err = engine
            .approve_refund(&harness.admin(), allocation.payment.id)
            .await
            .unwrap_err();
        assert!(matches!(err, TutorError::InvalidTransition { .. }));
        let student = harness.user(harness.student.id).await.unwrap();
        assert_eq!(student.credit_balance, dec!(20.00));
    }

    #[tokio::test]
    async fn external_refund_releases_seat_without_credit() {
        let harness = TestHarness::builder().build().await.unwrap();
        let engine = engine(&harness);
        let allocation = engine
            .allocate(
                &harness.student(),
                harness.slot.id,
                PaymentIntent::Mpesa {
                    phone: "0712345678".into(),
                },
            )
            .await
            .unwrap();
        engine
            .reconcile(ProviderEvent {
                correlation: PaymentLookup::Id(allocation.payment.id),
                outcome: SettlementOutcome::Succeeded {
                    provider_txn_id: Some("QK1".into()),
                },
            })
            .await
            .unwrap();

        engine
            .request_refund(&harness.student(), allocation.booking.id, "Sick", Utc::now())
            .await
            .unwrap();
        engine
            .approve_refund(&harness.admin(), allocation.payment.id)
            .await
            .unwrap();

        let student = harness.user(harness.student.id).await.unwrap();
        assert_eq!(student.credit_balance, dec!(0));
        let slot = harness.slot(harness.slot.id).await.unwrap();
        assert_eq!(slot.current_students, 0);
    }

    #[tokio::test]
    async fn rejection_keeps_booking() {
        let harness = TestHarness::builder()
            .with_student_credit(dec!(15.00))
            .build()
            .await
            .unwrap();
        let engine = engine(&harness);
        let allocation = engine
            .allocate(&harness.student(), harness.slot.id, PaymentIntent::WalletCredit)
            .await
            .unwrap();
        engine
            .request_refund(&harness.student(), allocation.booking.id, "Changed my mind", Utc::now())
            .await
            .unwrap();

        let payment = engine
            .reject_refund(&harness.admin(), allocation.payment.id)
            .await
            .unwrap();
        assert_eq!(payment.status, PaymentStatus::Succeeded);
        assert_eq!(payment.refund_status, Some(RefundStatus::Rejected));
        let booking = harness.booking(allocation.booking.id).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);

        let err = engine
            .request_refund(&harness.student(), allocation.booking.id, "Again", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, TutorError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn refund_window_closes_at_start() {
        let harness = TestHarness::builder()
            .with_student_credit(dec!(15.00))
            .build()
            .await
            .unwrap();
        let engine = engine(&harness);
        let allocation = engine
            .allocate(&harness.student(), harness.slot.id, PaymentIntent::WalletCredit)
            .await
            .unwrap();

        let after_start = harness.slot.start_time + Duration::minutes(1);
        let err = engine
            .request_refund(&harness.student(), allocation.booking.id, "Late", after_start)
            .await
            .unwrap_err();
        assert!(matches!(err, TutorError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn unpaid_booking_cannot_be_refunded() {
        let harness = TestHarness::builder().build().await.unwrap();
        let engine = engine(&harness);
        let allocation = engine
            .allocate(&harness.student(), harness.slot.id, PaymentIntent::Paypal)
            .await
            .unwrap();
        let err = engine
            .request_refund(&harness.student(), allocation.booking.id, "Never paid", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, TutorError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn only_owner_and_admin_may_act() {
        let harness = TestHarness::builder()
            .with_student_credit(dec!(15.00))
            .build()
            .await
            .unwrap();
        let engine = engine(&harness);
        let allocation = engine
            .allocate(&harness.student(), harness.slot.id, PaymentIntent::WalletCredit)
            .await
            .unwrap();

        let other = harness.add_student(dec!(0)).await.unwrap();
        let err = engine
            .request_refund(
                &Principal::new(other.id, Role::Student),
                allocation.booking.id,
                "Not mine",
                Utc::now(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TutorError::NotFound { .. }));

        engine
            .request_refund(&harness.student(), allocation.booking.id, "Mine", Utc::now())
            .await
            .unwrap();
        let err = engine
            .approve_refund(&harness.teacher(), allocation.payment.id)
            .await
            .unwrap_err();
        assert!(matches!(err, TutorError::Forbidden(_)));
    }
}
