// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the booking API.
//!
//! Each handler decodes its body, takes the caller from the request
//! extensions and hands both to one engine operation. Role checks happen
//! inside the engine.

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tutorlane_booking::{NewSlot, NextStep, PaymentIntent, PayoutDecision, ReconcileOutcome};
use tutorlane_core::{
    AvailabilitySlot, Booking, Payment, PaymentProvider, PayoutRequest, Principal,
    StudentBundle, TutorError,
};

use crate::error::ApiError;
use crate::server::AppState;

type ApiResult<T> = Result<T, ApiError>;

/// How the student wants to pay, as sent by the booking and bundle forms.
#[derive(Debug, Default, Deserialize)]
pub struct PaymentChoice {
    #[serde(default)]
    pub use_credit: bool,
    #[serde(default)]
    pub payment_provider: Option<PaymentProvider>,
    #[serde(default)]
    pub mpesa_phone_number: Option<String>,
}

impl PaymentChoice {
    pub fn into_intent(self) -> Result<PaymentIntent, TutorError> {
        if self.use_credit {
            return Ok(PaymentIntent::WalletCredit);
        }
        match self.payment_provider {
            Some(PaymentProvider::Credit) => Ok(PaymentIntent::WalletCredit),
            Some(PaymentProvider::Mpesa) => Ok(PaymentIntent::Mpesa {
                phone: self.mpesa_phone_number.unwrap_or_default(),
            }),
            Some(PaymentProvider::Paypal) => Ok(PaymentIntent::Paypal),
            None => Err(TutorError::InvalidInput(
                "choose a payment provider or pay with credit".into(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BookingRequest {
    pub availability_slot_id: Uuid,
    #[serde(flatten)]
    pub payment: PaymentChoice,
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub booking: Booking,
    pub payment: Payment,
    pub next_step: NextStep,
}

#[derive(Debug, Serialize)]
pub struct BundlePurchaseResponse {
    pub student_bundle: StudentBundle,
    pub payment: Payment,
    pub next_step: NextStep,
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    #[serde(rename = "orderID")]
    pub order_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CaptureOrderRequest {
    #[serde(rename = "orderID")]
    pub order_id: String,
}

#[derive(Debug, Serialize)]
pub struct OutcomeResponse {
    pub outcome: ReconcileOutcome,
}

#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    pub reason: String,
}

#[derive(Debug, Deserialize)]
pub struct RescheduleRequest {
    pub new_start_time: DateTime<Utc>,
    pub new_end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    Reject,
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub decision: Decision,
}

#[derive(Debug, Deserialize)]
pub struct PayoutRequestBody {
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct PayoutDecisionRequest {
    pub decision: PayoutDecision,
    #[serde(default)]
    pub admin_notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /health
pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// POST /api/v1/slots
pub async fn create_slot(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<NewSlot>,
) -> ApiResult<(StatusCode, Json<AvailabilitySlot>)> {
    let slot = state.engine.create_slot(&principal, body).await?;
    Ok((StatusCode::CREATED, Json(slot)))
}

/// DELETE /api/v1/slots/{slot_id}
pub async fn delete_slot(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(slot_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.engine.delete_slot(&principal, slot_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/bookings
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<BookingRequest>,
) -> ApiResult<impl IntoResponse> {
    let intent = body.payment.into_intent()?;
    let allocation = state
        .engine
        .allocate(&principal, body.availability_slot_id, intent)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(BookingResponse {
            booking: allocation.booking,
            payment: allocation.payment,
            next_step: allocation.next_step,
        }),
    ))
}

/// POST /api/v1/bundles/{bundle_id}/purchase
pub async fn purchase_bundle(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(bundle_id): Path<Uuid>,
    Json(body): Json<PaymentChoice>,
) -> ApiResult<impl IntoResponse> {
    let intent = body.into_intent()?;
    let purchase = state
        .engine
        .purchase_bundle(&principal, bundle_id, intent)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(BundlePurchaseResponse {
            student_bundle: purchase.student_bundle,
            payment: purchase.payment,
            next_step: purchase.next_step,
        }),
    ))
}

/// POST /api/v1/payments/paypal/create-order/{payment_id}
pub async fn create_order(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(payment_id): Path<Uuid>,
) -> ApiResult<Json<CreateOrderResponse>> {
    let order_id = state
        .engine
        .create_redirect_order(&principal, payment_id)
        .await?;
    Ok(Json(CreateOrderResponse { order_id }))
}

/// POST /api/v1/payments/paypal/capture-order
pub async fn capture_order(
    State(state): State<AppState>,
    Extension(_principal): Extension<Principal>,
    Json(body): Json<CaptureOrderRequest>,
) -> ApiResult<Json<OutcomeResponse>> {
    let order_id = body.order_id.trim();
    if order_id.is_empty() {
        return Err(TutorError::InvalidInput("orderID is required".into()).into());
    }
    let outcome = state.engine.capture_redirect_order(order_id).await?;
    Ok(Json(OutcomeResponse { outcome }))
}

/// POST /api/v1/bookings/{booking_id}/request-refund
pub async fn request_refund(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<RefundRequest>,
) -> ApiResult<Json<Payment>> {
    let payment = state
        .engine
        .request_refund(&principal, booking_id, &body.reason, Utc::now())
        .await?;
    Ok(Json(payment))
}

/// POST /api/v1/admin/refunds/{payment_id}
pub async fn process_refund(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(payment_id): Path<Uuid>,
    Json(body): Json<DecisionRequest>,
) -> ApiResult<Json<Payment>> {
    let payment = match body.decision {
        Decision::Approve => state.engine.approve_refund(&principal, payment_id).await?,
        Decision::Reject => state.engine.reject_refund(&principal, payment_id).await?,
    };
    Ok(Json(payment))
}

/// POST /api/v1/bookings/{booking_id}/request-reschedule
pub async fn request_reschedule(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<RescheduleRequest>,
) -> ApiResult<Json<Booking>> {
    let booking = state
        .engine
        .request_reschedule(
            &principal,
            booking_id,
            body.new_start_time,
            body.new_end_time,
            Utc::now(),
        )
        .await?;
    Ok(Json(booking))
}

/// POST /api/v1/teacher/bookings/{booking_id}/reschedule
pub async fn process_reschedule(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(booking_id): Path<Uuid>,
    Json(body): Json<DecisionRequest>,
) -> ApiResult<Json<Booking>> {
    let booking = state
        .engine
        .process_reschedule(&principal, booking_id, body.decision == Decision::Approve)
        .await?;
    Ok(Json(booking))
}

/// POST /api/v1/teacher/bookings/{booking_id}/complete
pub async fn complete_booking(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(booking_id): Path<Uuid>,
) -> ApiResult<Json<Booking>> {
    let booking = state
        .engine
        .complete_booking(&principal, booking_id, Utc::now())
        .await?;
    Ok(Json(booking))
}

/// POST /api/v1/teacher/payouts
pub async fn request_payout(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<PayoutRequestBody>,
) -> ApiResult<(StatusCode, Json<PayoutRequest>)> {
    let request = state
        .engine
        .request_payout(&principal, body.amount, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// POST /api/v1/admin/payouts/{request_id}
pub async fn process_payout(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(request_id): Path<Uuid>,
    Json(body): Json<PayoutDecisionRequest>,
) -> ApiResult<Json<PayoutRequest>> {
    let request = state
        .engine
        .process_payout(
            &principal,
            request_id,
            body.decision,
            body.admin_notes,
            Utc::now(),
        )
        .await?;
    Ok(Json(request))
}
