// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Seat allocation: the only path that creates a booking.
//!
//! One `BEGIN IMMEDIATE` transaction locks the slot, checks capacity, takes
//! the seat, writes the booking and its payment, and for wallet payments
//! debits the credit balance. Two students racing for the last seat
//! serialize on the slot lock; the loser sees the incremented counter and
//! gets [`TutorError::SlotFull`].

use tracing::{debug, info, instrument};
use uuid::Uuid;

use tutorlane_core::{
    Booking, BookingStatus, DomainEvent, Payment, PaymentTarget, Principal, Role, TutorError,
};
use tutorlane_storage::TxError;
use tutorlane_storage::queries::{bookings, languages, outbox, payments, slots, users};

use crate::engine::BookingEngine;
use crate::intent::{NextStep, PaymentIntent};

/// The rows a successful allocation created, plus the caller's next step.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub booking: Booking,
    pub payment: Payment,
    pub next_step: NextStep,
}

impl BookingEngine {
    /// Book one seat in `slot_id` for the calling student.
    ///
    /// Wallet payments come back confirmed. External payments come back
    /// `pending_payment` holding the seat until a settlement event arrives;
    /// for push payments the provider prompt is opened after commit.
    #[instrument(skip(self, intent), fields(student_id = %principal.user_id, provider = %intent.provider()))]
    pub async fn allocate(
        &self,
        principal: &Principal,
        slot_id: Uuid,
        intent: PaymentIntent,
    ) -> Result<Allocation, TutorError> {
        principal.require(Role::Student)?;
        intent.validate()?;

        // Price comes from the slot's language; read it outside the lock so
        // the conversion lookup never runs under it.
        let (price, currency) = self
            .db
            .read(move |c| {
                let Some(slot) = slots::get_slot(c, slot_id)? else {
                    return Ok(None);
                };
                let language = languages::get_language(c, slot.language_id)?;
                Ok(language.map(|l| (l.price_per_session, l.currency)))
            })
            .await?
            .ok_or(TutorError::SlotNotFound(slot_id))?;
        let (amount, charge_currency) = self.quote(&intent, price, &currency).await?;

        let student_id = principal.user_id;
        let provider = intent.provider();
        let settles = intent.settles_immediately();
        let payment_status = intent.initial_status();

        let (booking, payment) = self
            .db
            .transaction(move |tx| {
                let slot = slots::lock_slot(tx, slot_id)?;
                if !slot.has_capacity() {
                    return Err(TxError::Domain(TutorError::SlotFull));
                }
                let status = slots::write_occupancy(
                    tx,
                    slot.id,
                    slot.current_students + 1,
                    slot.max_students,
                )?;
                debug!(slot_id = %slot.id, %status, "seat taken");

                let booking = Booking {
                    id: Uuid::new_v4(),
                    student_id,
                    teacher_id: slot.teacher_id,
                    slot_id: slot.id,
                    status: if settles {
                        BookingStatus::Confirmed
                    } else {
                        BookingStatus::PendingPayment
                    },
                    price,
                    currency,
                    proposed_start_time: None,
                    proposed_end_time: None,
                };
                bookings::insert_booking(tx, &booking)?;

                if settles {
                    users::adjust_credit(tx, student_id, -amount)?;
                }

                let payment = Payment {
                    id: Uuid::new_v4(),
                    target: PaymentTarget::Booking(booking.id),
                    amount,
                    currency: charge_currency,
                    provider,
                    status: payment_status,
                    refund_status: None,
                    refund_reason: None,
                    provider_order_id: None,
                    merchant_request_id: None,
                    provider_txn_id: None,
                };
                payments::insert_payment(tx, &payment)?;

                if settles {
                    outbox::enqueue(
                        tx,
                        &DomainEvent::BookingConfirmed {
                            booking_id: booking.id,
                        },
                    )?;
                }
                Ok((booking, payment))
            })
            .await?;

        info!(
            booking_id = %booking.id,
            payment_id = %payment.id,
            status = %booking.status,
            "seat allocated"
        );

        let next_step = self.open_external_charge(&payment, &intent).await?;
        Ok(Allocation {
            booking,
            payment,
            next_step,
        })
    }
}
