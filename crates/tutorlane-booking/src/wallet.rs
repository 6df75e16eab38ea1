// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Teacher earnings, payouts and referral rewards.
//!
//! Balances only move inside a transaction that also writes the ledger row
//! explaining the movement.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use tutorlane_core::{
    Booking, BookingStatus, DomainEvent, PayoutRequest, PayoutStatus, Principal, ReferralStatus,
    Role, TutorError, money,
};
use tutorlane_storage::TxError;
use tutorlane_storage::queries::{bookings, outbox, payouts, referrals, slots, users};

use crate::engine::BookingEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutDecision {
    Complete,
    Reject,
}

impl PayoutDecision {
    fn outcome(self) -> PayoutStatus {
        match self {
            PayoutDecision::Complete => PayoutStatus::Completed,
            PayoutDecision::Reject => PayoutStatus::Rejected,
        }
    }
}

impl BookingEngine {
    /// Mark a finished class as taught and accrue the teacher's earnings.
    #[instrument(skip(self), fields(teacher_id = %principal.user_id))]
    pub async fn complete_booking(
        &self,
        principal: &Principal,
        booking_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Booking, TutorError> {
        principal.require(Role::Teacher)?;
        let teacher_id = principal.user_id;
        let commission_rate = self.policy.commission_rate;

        let (booking, earned) = self
            .db
            .transaction(move |tx| {
                let booking = bookings::get_booking(tx, booking_id)?
                    .filter(|b| b.teacher_id == teacher_id)
                    .ok_or_else(|| TxError::Domain(TutorError::not_found("booking", booking_id)))?;
                let slot = slots::lock_slot(tx, booking.slot_id)?;
                if slot.end_time > now {
                    return Err(TutorError::InvalidInput(
                        "a class can only be completed after it ends".into(),
                    )
                    .into());
                }
                if !bookings::transition(
                    tx,
                    booking_id,
                    BookingStatus::Confirmed,
                    BookingStatus::Completed,
                )? {
                    return Err(TutorError::transition(
                        "booking",
                        booking.status,
                        BookingStatus::Completed,
                    )
                    .into());
                }

                let earned = money::net_of_commission(booking.price, commission_rate);
                users::adjust_earnings(tx, teacher_id, earned)?;
                outbox::enqueue(tx, &DomainEvent::BookingCompleted { booking_id })?;
                let booking = Booking {
                    status: BookingStatus::Completed,
                    ..booking
                };
                Ok((booking, earned))
            })
            .await?;

        info!(%booking_id, %earned, "booking completed");
        Ok(booking)
    }

    /// Withdraw `amount` of earnings; the balance is debited immediately.
    #[instrument(skip(self), fields(teacher_id = %principal.user_id))]
    pub async fn request_payout(
        &self,
        principal: &Principal,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<PayoutRequest, TutorError> {
        principal.require(Role::Teacher)?;
        let amount = money::round_to_currency(amount, "USD");
        if amount <= Decimal::ZERO {
            return Err(TutorError::InvalidInput(
                "payout amount must be at least one cent".into(),
            ));
        }
        let request = PayoutRequest {
            id: Uuid::new_v4(),
            teacher_id: principal.user_id,
            amount,
            status: PayoutStatus::Pending,
            admin_notes: None,
            requested_at: now,
            processed_at: None,
        };

        let stored = request.clone();
        self.db
            .transaction(move |tx| {
                users::adjust_earnings(tx, stored.teacher_id, -stored.amount)?;
                payouts::insert_payout(tx, &stored)?;
                Ok(())
            })
            .await?;

        info!(request_id = %request.id, amount = %request.amount, "payout requested");
        Ok(request)
    }

    /// Close a pending payout. A rejection returns the amount to the teacher.
    #[instrument(skip(self, notes), fields(admin_id = %principal.user_id))]
    pub async fn process_payout(
        &self,
        principal: &Principal,
        request_id: Uuid,
        decision: PayoutDecision,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<PayoutRequest, TutorError> {
        principal.require(Role::Admin)?;

        let request = self
            .db
            .transaction(move |tx| {
                let request = payouts::get_payout(tx, request_id)?
                    .ok_or_else(|| TxError::Domain(TutorError::not_found("payout request", request_id)))?;
                let outcome = decision.outcome();
                if !payouts::resolve(tx, request_id, outcome, notes.as_deref(), now)? {
                    return Err(TutorError::transition("payout request", request.status, outcome).into());
                }
                if decision == PayoutDecision::Reject {
                    users::adjust_earnings(tx, request.teacher_id, request.amount)?;
                }
                outbox::enqueue(tx, &DomainEvent::PayoutProcessed { request_id })?;
                Ok(PayoutRequest {
                    status: outcome,
                    admin_notes: notes,
                    processed_at: Some(now),
                    ..request
                })
            })
            .await?;

        info!(%request_id, status = %request.status, "payout processed");
        Ok(request)
    }

    /// Pay the referral reward owed for `user_id`, if any.
    ///
    /// Returns whether a reward was granted. Safe to call repeatedly: the
    /// referral row moves to `completed` at most once.
    #[instrument(skip(self))]
    pub async fn complete_referral(&self, user_id: Uuid) -> Result<bool, TutorError> {
        let reward = self.policy.referral_reward;

        let granted = self
            .db
            .transaction(move |tx| {
                let Some(referral) = referrals::find_for_referred_user(tx, user_id)? else {
                    return Ok(None);
                };
                if referral.status != ReferralStatus::Pending
                    || !referrals::complete(tx, referral.id, reward)?
                {
                    return Ok(None);
                }
                users::adjust_credit(tx, referral.referrer_id, reward)?;
                Ok(Some(referral.referrer_id))
            })
            .await?;

        match granted {
            Some(referrer_id) => {
                info!(%user_id, %referrer_id, %reward, "referral reward granted");
                Ok(true)
            }
            None => {
                debug!(%user_id, "no pending referral");
                Ok(false)
            }
        }
    }
}
