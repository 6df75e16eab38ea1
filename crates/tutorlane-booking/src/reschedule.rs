// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reschedule proposals and the teacher's answer.

use chrono::{DateTime, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use tutorlane_core::{Booking, BookingStatus, DomainEvent, Principal, Role, TutorError};
use tutorlane_storage::TxError;
use tutorlane_storage::queries::{bookings, outbox, slots};

use crate::engine::BookingEngine;

impl BookingEngine {
    /// Propose a new time for a confirmed booking.
    #[instrument(skip(self), fields(student_id = %principal.user_id))]
    pub async fn request_reschedule(
        &self,
        principal: &Principal,
        booking_id: Uuid,
        new_start: DateTime<Utc>,
        new_end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Booking, TutorError> {
        principal.require(Role::Student)?;
        if new_start <= now {
            return Err(TutorError::InvalidInput(
                "the new start time must be in the future".into(),
            ));
        }
        if new_end <= new_start {
            return Err(TutorError::InvalidInput(
                "the new end time must be after the new start time".into(),
            ));
        }
        let student_id = principal.user_id;

        let booking = self
            .db
            .transaction(move |tx| {
                let booking = bookings::get_booking(tx, booking_id)?
                    .filter(|b| b.student_id == student_id)
                    .ok_or_else(|| TxError::Domain(TutorError::not_found("booking", booking_id)))?;
                if !bookings::transition(
                    tx,
                    booking_id,
                    BookingStatus::Confirmed,
                    BookingStatus::RescheduleRequested,
                )? {
                    return Err(TutorError::transition(
                        "booking",
                        booking.status,
                        BookingStatus::RescheduleRequested,
                    )
                    .into());
                }
                bookings::set_proposed_times(tx, booking_id, Some((new_start, new_end)))?;
                outbox::enqueue(tx, &DomainEvent::RescheduleRequested { booking_id })?;
                Ok(Booking {
                    status: BookingStatus::RescheduleRequested,
                    proposed_start_time: Some(new_start),
                    proposed_end_time: Some(new_end),
                    ..booking
                })
            })
            .await?;

        info!(%booking_id, "reschedule requested");
        Ok(booking)
    }

    /// Approve or reject a pending proposal. Either way the booking returns
    /// to `confirmed`; approval moves the slot to the proposed window.
    #[instrument(skip(self), fields(teacher_id = %principal.user_id))]
    pub async fn process_reschedule(
        &self,
        principal: &Principal,
        booking_id: Uuid,
        approve: bool,
    ) -> Result<Booking, TutorError> {
        principal.require(Role::Teacher)?;
        let teacher_id = principal.user_id;

        let booking = self
            .db
            .transaction(move |tx| {
                let booking = bookings::get_booking(tx, booking_id)?
                    .filter(|b| b.teacher_id == teacher_id)
                    .ok_or_else(|| TxError::Domain(TutorError::not_found("booking", booking_id)))?;
                if booking.status != BookingStatus::RescheduleRequested {
                    return Err(TutorError::transition(
                        "booking",
                        booking.status,
                        BookingStatus::Confirmed,
                    )
                    .into());
                }

                if approve {
                    let (Some(start), Some(end)) =
                        (booking.proposed_start_time, booking.proposed_end_time)
                    else {
                        return Err(TutorError::Internal(format!(
                            "booking {booking_id} has no proposed window"
                        ))
                        .into());
                    };
                    let slot = slots::lock_slot(tx, booking.slot_id)?;
                    slots::update_times(tx, slot.id, start, end)?;
                }

                if !bookings::transition(
                    tx,
                    booking_id,
                    BookingStatus::RescheduleRequested,
                    BookingStatus::Confirmed,
                )? {
                    return Err(TutorError::transition(
                        "booking",
                        booking.status,
                        BookingStatus::Confirmed,
                    )
                    .into());
                }
                bookings::set_proposed_times(tx, booking_id, None)?;
                outbox::enqueue(
                    tx,
                    &DomainEvent::RescheduleProcessed {
                        booking_id,
                        approved: approve,
                    },
                )?;
                Ok(Booking {
                    status: BookingStatus::Confirmed,
                    proposed_start_time: None,
                    proposed_end_time: None,
                    ..booking
                })
            })
            .await?;

        info!(%booking_id, approve, "reschedule processed");
        Ok(booking)
    }
}
