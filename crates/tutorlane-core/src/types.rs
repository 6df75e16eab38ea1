// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ledger record types and their status machines.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

// --- Status enums ---

/// Account role carried by every authenticated principal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

/// Cached occupancy state of an availability slot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SlotStatus {
    Available,
    Booked,
    Full,
}

impl SlotStatus {
    /// Derive the status from the slot counters.
    ///
    /// A one-seat slot that is taken is `booked`; a group slot with no seats
    /// left is `full`.
    pub fn for_occupancy(current_students: u32, max_students: u32) -> Self {
        if current_students < max_students {
            SlotStatus::Available
        } else if max_students == 1 {
            SlotStatus::Booked
        } else {
            SlotStatus::Full
        }
    }
}

/// Booking lifecycle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BookingStatus {
    PendingPayment,
    Confirmed,
    Completed,
    Unattended,
    Cancelled,
    RescheduleRequested,
}

impl BookingStatus {
    /// Whether the booking state machine allows moving to `next`.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (PendingPayment, Confirmed)
                | (Confirmed, Completed)
                | (Confirmed, Unattended)
                | (Confirmed, Cancelled)
                | (Confirmed, RescheduleRequested)
                | (RescheduleRequested, Confirmed)
        )
    }

    /// Terminal states admit no further transition.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BookingStatus::Completed | BookingStatus::Cancelled | BookingStatus::Unattended
        )
    }
}

/// Payment rail a charge is collected through.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentProvider {
    /// Internal wallet credit; settles inside the allocating transaction.
    Credit,
    /// Mobile-money push payment.
    Mpesa,
    /// Redirect-order card/wallet payment.
    Paypal,
}

/// Settlement state of a payment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
    Refunded,
}

/// Refund sub-state; only moves once the payment has succeeded.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RefundStatus {
    Requested,
    Approved,
    Rejected,
}

/// Lifecycle of a purchased bundle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BundleStatus {
    PendingPayment,
    Active,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Completed,
    Rejected,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReferralStatus {
    Pending,
    Completed,
}

// --- Records ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    /// Student-side store of value.
    pub credit_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeacherAccount {
    pub user_id: Uuid,
    /// Accrued post-commission earnings available for payout.
    pub current_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Language {
    pub id: Uuid,
    pub name: String,
    pub price_per_session: Decimal,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub language_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub max_students: u32,
    pub current_students: u32,
    pub status: SlotStatus,
}

impl AvailabilitySlot {
    /// Whether another student can be seated.
    pub fn has_capacity(&self) -> bool {
        !matches!(self.status, SlotStatus::Booked | SlotStatus::Full)
            && self.current_students < self.max_students
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub student_id: Uuid,
    pub teacher_id: Uuid,
    pub slot_id: Uuid,
    pub status: BookingStatus,
    pub price: Decimal,
    pub currency: String,
    pub proposed_start_time: Option<DateTime<Utc>>,
    pub proposed_end_time: Option<DateTime<Utc>>,
}

/// What a payment pays for. Exactly one target per payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum PaymentTarget {
    Booking(Uuid),
    StudentBundle(Uuid),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub target: PaymentTarget,
    pub amount: Decimal,
    pub currency: String,
    pub provider: PaymentProvider,
    pub status: PaymentStatus,
    pub refund_status: Option<RefundStatus>,
    pub refund_reason: Option<String>,
    pub provider_order_id: Option<String>,
    pub merchant_request_id: Option<String>,
    pub provider_txn_id: Option<String>,
}

impl Payment {
    pub fn booking_id(&self) -> Option<Uuid> {
        match self.target {
            PaymentTarget::Booking(id) => Some(id),
            PaymentTarget::StudentBundle(_) => None,
        }
    }
}

/// A catalogue package of classes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub id: Uuid,
    pub name: String,
    pub language_id: Uuid,
    pub number_of_classes: u32,
    pub price: Decimal,
    pub currency: String,
    pub is_active: bool,
}

/// A bundle bought by a student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentBundle {
    pub id: Uuid,
    pub student_id: Uuid,
    pub bundle_id: Uuid,
    pub remaining_classes: u32,
    pub status: BundleStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutRequest {
    pub id: Uuid,
    pub teacher_id: Uuid,
    pub amount: Decimal,
    pub status: PayoutStatus,
    pub admin_notes: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Referral {
    pub id: Uuid,
    pub referrer_id: Uuid,
    pub referred_user_id: Uuid,
    pub status: ReferralStatus,
    pub reward_amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn slot_status_follows_counters() {
        assert_eq!(SlotStatus::for_occupancy(0, 1), SlotStatus::Available);
        assert_eq!(SlotStatus::for_occupancy(1, 1), SlotStatus::Booked);
        assert_eq!(SlotStatus::for_occupancy(3, 4), SlotStatus::Available);
        assert_eq!(SlotStatus::for_occupancy(4, 4), SlotStatus::Full);
    }

    #[test]
    fn statuses_use_snake_case_on_the_wire() {
        assert_eq!(BookingStatus::PendingPayment.to_string(), "pending_payment");
        assert_eq!(
            BookingStatus::from_str("reschedule_requested").unwrap(),
            BookingStatus::RescheduleRequested
        );
        let json = serde_json::to_string(&PaymentProvider::Mpesa).unwrap();
        assert_eq!(json, "\"mpesa\"");
    }

    #[test]
    fn terminal_booking_states_have_no_exits() {
        use BookingStatus::*;
        let all = [
            PendingPayment,
            Confirmed,
            Completed,
            Unattended,
            Cancelled,
            RescheduleRequested,
        ];
        for from in [Completed, Cancelled, Unattended] {
            assert!(from.is_terminal());
            for to in all {
                assert!(!from.can_transition_to(to), "{from} -> {to} must be refused");
            }
        }
    }

    #[test]
    fn pending_payment_only_confirms() {
        use BookingStatus::*;
        assert!(PendingPayment.can_transition_to(Confirmed));
        assert!(!PendingPayment.can_transition_to(Completed));
        assert!(!PendingPayment.can_transition_to(Cancelled));
    }

    proptest::proptest! {
        #[test]
        fn accepted_walks_never_leave_terminal_states(steps in proptest::collection::vec(0usize..6, 0..24)) {
            use BookingStatus::*;
            let all = [
                PendingPayment,
                Confirmed,
                Completed,
                Unattended,
                Cancelled,
                RescheduleRequested,
            ];
            let mut state = PendingPayment;
            let mut terminal_at = None;
            for (i, step) in steps.into_iter().enumerate() {
                let next = all[step];
                if state.can_transition_to(next) {
                    proptest::prop_assert!(terminal_at.is_none(), "moved out of {state} at step {i}");
                    state = next;
                    if state.is_terminal() {
                        terminal_at = Some(i);
                    }
                }
            }
        }

        #[test]
        fn occupancy_status_matches_capacity(max in 1u32..40, taken in 0u32..40) {
            let taken = taken.min(max);
            let status = SlotStatus::for_occupancy(taken, max);
            proptest::prop_assert_eq!(status == SlotStatus::Available, taken < max);
        }
    }

    #[test]
    fn full_slot_has_no_capacity() {
        let slot = AvailabilitySlot {
            id: Uuid::new_v4(),
            teacher_id: Uuid::new_v4(),
            language_id: Uuid::new_v4(),
            start_time: Utc::now(),
            end_time: Utc::now(),
            max_students: 2,
            current_students: 2,
            status: SlotStatus::Full,
        };
        assert!(!slot.has_capacity());
    }
}
