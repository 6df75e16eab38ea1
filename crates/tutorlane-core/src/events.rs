// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain events written to the outbox by the transaction that caused them.
//!
//! A separate dispatcher consumes them after commit; a dispatch failure never
//! reaches back into the ledger.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    BookingConfirmed { booking_id: Uuid },
    BundleActivated { student_bundle_id: Uuid },
    RefundApproved { payment_id: Uuid },
    RefundRejected { payment_id: Uuid },
    RescheduleRequested { booking_id: Uuid },
    RescheduleProcessed { booking_id: Uuid, approved: bool },
    BookingCompleted { booking_id: Uuid },
    PayoutProcessed { request_id: Uuid },
    /// Settle a pending referral reward for a user who just paid externally.
    ReferralCheck { user_id: Uuid },
}

impl DomainEvent {
    /// Stable name used for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainEvent::BookingConfirmed { .. } => "booking_confirmed",
            DomainEvent::BundleActivated { .. } => "bundle_activated",
            DomainEvent::RefundApproved { .. } => "refund_approved",
            DomainEvent::RefundRejected { .. } => "refund_rejected",
            DomainEvent::RescheduleRequested { .. } => "reschedule_requested",
            DomainEvent::RescheduleProcessed { .. } => "reschedule_processed",
            DomainEvent::BookingCompleted { .. } => "booking_completed",
            DomainEvent::PayoutProcessed { .. } => "payout_processed",
            DomainEvent::ReferralCheck { .. } => "referral_check",
        }
    }
}
