// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Teacher slot management.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use tutorlane_core::{AvailabilitySlot, Principal, Role, SlotStatus, TutorError};
use tutorlane_storage::TxError;
use tutorlane_storage::queries::{languages, slots};

use crate::engine::BookingEngine;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewSlot {
    pub language_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default = "one_seat")]
    pub max_students: u32,
}

fn one_seat() -> u32 {
    1
}

impl BookingEngine {
    #[instrument(skip(self, new), fields(teacher_id = %principal.user_id))]
    pub async fn create_slot(
        &self,
        principal: &Principal,
        new: NewSlot,
    ) -> Result<AvailabilitySlot, TutorError> {
        principal.require(Role::Teacher)?;
        if new.end_time <= new.start_time {
            return Err(TutorError::InvalidInput(
                "slot end time must be after its start time".into(),
            ));
        }
        if new.max_students == 0 {
            return Err(TutorError::InvalidInput(
                "a slot needs at least one seat".into(),
            ));
        }

        let slot = AvailabilitySlot {
            id: Uuid::new_v4(),
            teacher_id: principal.user_id,
            language_id: new.language_id,
            start_time: new.start_time,
            end_time: new.end_time,
            max_students: new.max_students,
            current_students: 0,
            status: SlotStatus::Available,
        };
        let stored = slot.clone();
        self.db
            .transaction(move |tx| {
                if languages::get_language(tx, stored.language_id)?.is_none() {
                    return Err(TutorError::not_found("language", stored.language_id).into());
                }
                slots::insert_slot(tx, &stored)
            })
            .await?;

        info!(slot_id = %slot.id, max_students = slot.max_students, "slot created");
        Ok(slot)
    }

    /// Remove an unbooked slot owned by the caller.
    #[instrument(skip(self), fields(teacher_id = %principal.user_id))]
    pub async fn delete_slot(&self, principal: &Principal, slot_id: Uuid) -> Result<(), TutorError> {
        principal.require(Role::Teacher)?;
        let teacher_id = principal.user_id;

        self.db
            .transaction(move |tx| {
                let slot = slots::lock_slot(tx, slot_id)?;
                if slot.teacher_id != teacher_id {
                    return Err(TxError::Domain(TutorError::SlotNotFound(slot_id)));
                }
                if slot.status != SlotStatus::Available || slots::booking_count(tx, slot_id)? > 0 {
                    return Err(TutorError::InvalidInput(
                        "slots with bookings cannot be deleted".into(),
                    )
                    .into());
                }
                if !slots::delete_available_slot(tx, slot_id)? {
                    return Err(TutorError::transition("slot", slot.status, "deleted").into());
                }
                Ok(())
            })
            .await?;

        info!(%slot_id, "slot deleted");
        Ok(())
    }
}
