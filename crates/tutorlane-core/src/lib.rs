// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Tutorlane booking and settlement engine.
//!
//! This crate provides the ledger record types, the status machines that
//! govern them, the error type, and the collaborator traits (payment
//! gateways, notifier, exchange-rate source) the engine is written against.

pub mod error;
pub mod events;
pub mod money;
pub mod principal;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::TutorError;
pub use events::DomainEvent;
pub use principal::Principal;
pub use traits::{
    CaptureResult, ChargeRequest, Notification, Notifier, PaymentGateway, ProviderHandle,
    RateSource,
};
pub use types::{
    AvailabilitySlot, Booking, BookingStatus, Bundle, BundleStatus, Language, Payment,
    PaymentProvider, PaymentStatus, PaymentTarget, PayoutRequest, PayoutStatus, Referral,
    ReferralStatus, RefundStatus, Role, SlotStatus, StudentBundle, TeacherAccount, User,
};
