// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Tutorlane booking engine.
//!
//! Authenticates callers from HS256 bearer tokens, turns requests into
//! [`BookingEngine`](tutorlane_booking::BookingEngine) calls and maps
//! engine errors onto status codes. The push-payment callback is the only
//! unauthenticated write.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;
pub mod webhook;

pub use auth::{AuthState, Claims, TokenVerifier};
pub use error::ApiError;
pub use server::{AppState, router, start_server};
