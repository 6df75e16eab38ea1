// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Missed-class sweep.

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use tutorlane_core::{BookingStatus, TutorError};
use tutorlane_storage::queries::bookings;

use crate::engine::BookingEngine;

impl BookingEngine {
    /// Mark confirmed bookings whose class ended inside the sweep window as
    /// `unattended`. Returns how many moved.
    ///
    /// The window is `(now - window_start, now - window_end)`; a booking
    /// completed by its teacher in the meantime is skipped by the guarded
    /// transition.
    #[instrument(skip(self))]
    pub async fn sweep_unattended(&self, now: DateTime<Utc>) -> Result<usize, TutorError> {
        let after = now - self.policy.sweep_window_start;
        let before = now - self.policy.sweep_window_end;

        let moved = self
            .db
            .transaction(move |tx| {
                let mut moved = 0;
                for booking_id in bookings::confirmed_ending_between(tx, after, before)? {
                    if bookings::transition(
                        tx,
                        booking_id,
                        BookingStatus::Confirmed,
                        BookingStatus::Unattended,
                    )? {
                        debug!(%booking_id, "marked unattended");
                        moved += 1;
                    }
                }
                Ok(moved)
            })
            .await?;

        if moved > 0 {
            info!(moved, "unattended sweep finished");
        }
        Ok(moved)
    }
}
