// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the booking API.

use std::sync::Arc;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use tutorlane_booking::BookingEngine;
use tutorlane_config::model::ServerConfig;
use tutorlane_core::TutorError;

use crate::auth::{AuthState, auth_middleware};
use crate::handlers;
use crate::webhook;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<BookingEngine>,
    pub auth: AuthState,
}

/// Build the full route table.
///
/// `/health` and the push-payment callback are public; everything under
/// `/api/v1` else requires a bearer token.
pub fn router(state: AppState) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/api/v1/payments/webhook", post(webhook::post_webhook))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/api/v1/slots", post(handlers::create_slot))
        .route("/api/v1/slots/{slot_id}", delete(handlers::delete_slot))
        .route("/api/v1/bookings", post(handlers::create_booking))
        .route(
            "/api/v1/bookings/{booking_id}/request-refund",
            post(handlers::request_refund),
        )
        .route(
            "/api/v1/bookings/{booking_id}/request-reschedule",
            post(handlers::request_reschedule),
        )
        .route(
            "/api/v1/teacher/bookings/{booking_id}/complete",
            post(handlers::complete_booking),
        )
        .route(
            "/api/v1/teacher/bookings/{booking_id}/reschedule",
            post(handlers::process_reschedule),
        )
        .route(
            "/api/v1/bundles/{bundle_id}/purchase",
            post(handlers::purchase_bundle),
        )
        .route(
            "/api/v1/payments/paypal/create-order/{payment_id}",
            post(handlers::create_order),
        )
        .route(
            "/api/v1/payments/paypal/capture-order",
            post(handlers::capture_order),
        )
        .route("/api/v1/teacher/payouts", post(handlers::request_payout))
        .route(
            "/api/v1/admin/refunds/{payment_id}",
            post(handlers::process_refund),
        )
        .route(
            "/api/v1/admin/payouts/{request_id}",
            post(handlers::process_payout),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind `host:port` and serve until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: AppState,
    cancel: CancellationToken,
) -> Result<(), TutorError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| TutorError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| TutorError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use rust_decimal_macros::dec;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use tutorlane_booking::CommercePolicy;
    use tutorlane_core::{BookingStatus, Principal, Role};
    use tutorlane_test_utils::TestHarness;
    use uuid::Uuid;

    use crate::auth::{Claims, TokenVerifier};

    const SECRET: &str = "gateway-test-secret";

    fn app(harness: &TestHarness, secret: Option<&str>) -> Router {
        let policy = CommercePolicy::from_config(&harness.config).unwrap();
        let engine = BookingEngine::new(Arc::clone(&harness.db), harness.rates.clone(), policy)
            .with_gateway(harness.mpesa.clone())
            .with_gateway(harness.paypal.clone());
        router(AppState {
            engine: Arc::new(engine),
            auth: AuthState::from_secret(secret),
        })
    }

    fn token(principal: Principal) -> String {
        TokenVerifier::new(SECRET).issue(&Claims {
            user_id: principal.user_id,
            role: principal.role,
            exp: chrono::Utc::now().timestamp() + 3600,
        })
        .unwrap()
    }

    fn post(uri: &str, principal: Option<Principal>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(principal) = principal {
            builder = builder.header("authorization", format!("Bearer {}", token(principal)));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn callback(reference: String, result_code: i64) -> Value {
        json!({
            "Body": {"stkCallback": {
                "MerchantRequestID": "mpesa-ref-1",
                "CheckoutRequestID": "ws_CO_1",
                "ResultCode": result_code,
                "ResultDesc": if result_code == 0 { "Success" } else { "Request cancelled by user" },
                "CallbackMetadata": {"Item": [{"Name": "MpesaReceiptNumber", "Value": "QKX777"}]},
                "Reference": reference
            }}
        })
    }

    #[tokio::test]
    async fn health_is_public() {
        let harness = TestHarness::builder().build().await.unwrap();
        let app = app(&harness, Some(SECRET));
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn api_requires_a_valid_token() {
        let harness = TestHarness::builder().build().await.unwrap();
        let app = app(&harness, Some(SECRET));
        let body = json!({"availability_slot_id": harness.slot.id, "use_credit": true});

        let (status, _) = send(&app, post("/api/v1/bookings", None, body.clone())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let forged = TokenVerifier::new("someone-else").issue(&Claims {
            user_id: harness.student.id,
            role: Role::Student,
            exp: chrono::Utc::now().timestamp() + 60,
        })
        .unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/bookings")
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {forged}"))
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_secret_fails_closed() {
        let harness = TestHarness::builder()
            .with_student_credit(dec!(50.00))
            .build()
            .await
            .unwrap();
        let app = app(&harness, None);
        let body = json!({"availability_slot_id": harness.slot.id, "use_credit": true});
        let (status, _) = send(&app, post("/api/v1/bookings", Some(harness.student()), body)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(harness.row_counts().await.unwrap(), (0, 0));
    }

    #[tokio::test]
    async fn wallet_booking_is_created_confirmed() {
        let harness = TestHarness::builder()
            .with_student_credit(dec!(20.00))
            .build()
            .await
            .unwrap();
        let app = app(&harness, Some(SECRET));
        let body = json!({"availability_slot_id": harness.slot.id, "use_credit": true});
        let (status, body) =
            send(&app, post("/api/v1/bookings", Some(harness.student()), body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["booking"]["status"], "confirmed");
        assert_eq!(body["payment"]["status"], "succeeded");
        assert_eq!(body["next_step"]["next"], "settled");

        // Second student finds the seat gone.
        let other = harness.add_student(dec!(20.00)).await.unwrap();
        let body = json!({"availability_slot_id": harness.slot.id, "use_credit": true});
        let (status, body) = send(
            &app,
            post(
                "/api/v1/bookings",
                Some(Principal::new(other.id, Role::Student)),
                body,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "this time slot is no longer available");
    }

    #[tokio::test]
    async fn wrong_role_is_forbidden() {
        let harness = TestHarness::builder().build().await.unwrap();
        let app = app(&harness, Some(SECRET));
        let body = json!({"availability_slot_id": harness.slot.id, "use_credit": true});
        let (status, _) = send(&app, post("/api/v1/bookings", Some(harness.teacher()), body)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn insufficient_credit_is_a_bad_request() {
        let harness = TestHarness::builder().build().await.unwrap();
        let app = app(&harness, Some(SECRET));
        let body = json!({"availability_slot_id": harness.slot.id, "use_credit": true});
        let (status, body) =
            send(&app, post("/api/v1/bookings", Some(harness.student()), body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "insufficient credit balance");
    }

    #[tokio::test]
    async fn push_booking_settles_through_the_webhook_once() {
        let harness = TestHarness::builder().build().await.unwrap();
        let app = app(&harness, Some(SECRET));
        let body = json!({
            "availability_slot_id": harness.slot.id,
            "payment_provider": "mpesa",
            "mpesa_phone_number": "0712345678"
        });
        let (status, body) =
            send(&app, post("/api/v1/bookings", Some(harness.student()), body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["booking"]["status"], "pending_payment");
        assert_eq!(body["next_step"]["next"], "await_push_confirmation");
        let payment_id: Uuid = body["payment"]["id"].as_str().unwrap().parse().unwrap();
        let booking_id: Uuid = body["booking"]["id"].as_str().unwrap().parse().unwrap();

        let reference = format!("ACCOUNT-{payment_id}");
        let (status, body) = send(
            &app,
            post("/api/v1/payments/webhook", None, callback(reference.clone(), 0)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "applied");

        let (status, body) = send(
            &app,
            post("/api/v1/payments/webhook", None, callback(reference, 0)),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "already_applied");

        let booking = harness.booking(booking_id).await.unwrap();
        assert_eq!(booking.status, BookingStatus::Confirmed);
        let payment = harness.payment(payment_id).await.unwrap();
        assert_eq!(payment.provider_txn_id.as_deref(), Some("QKX777"));
    }

    #[tokio::test]
    async fn webhook_rejects_garbage_and_unknown_payments() {
        let harness = TestHarness::builder().build().await.unwrap();
        let app = app(&harness, Some(SECRET));

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/payments/webhook")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let reference = format!("ACCOUNT-{}", Uuid::new_v4());
        let (status, _) = send(
            &app,
            post("/api/v1/payments/webhook", None, callback(reference, 0)),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn failed_callback_is_acknowledged() {
        let harness = TestHarness::builder().build().await.unwrap();
        let app = app(&harness, Some(SECRET));
        let body = json!({
            "availability_slot_id": harness.slot.id,
            "payment_provider": "mpesa",
            "mpesa_phone_number": "0712345678"
        });
        let (_, body) = send(&app, post("/api/v1/bookings", Some(harness.student()), body)).await;
        let payment_id = body["payment"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            post(
                "/api/v1/payments/webhook",
                None,
                callback(format!("ACCOUNT-{payment_id}"), 1032),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "applied");

        // A late success for the failed payment is still a 200.
        let (status, body) = send(
            &app,
            post(
                "/api/v1/payments/webhook",
                None,
                callback(format!("ACCOUNT-{payment_id}"), 0),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "rejected");
    }

    #[tokio::test]
    async fn redirect_order_round_trip() {
        let harness = TestHarness::builder().build().await.unwrap();
        let app = app(&harness, Some(SECRET));
        let body = json!({"availability_slot_id": harness.slot.id, "payment_provider": "paypal"});
        let (status, body) =
            send(&app, post("/api/v1/bookings", Some(harness.student()), body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["next_step"]["next"], "create_redirect_order");
        let payment_id = body["payment"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            post(
                &format!("/api/v1/payments/paypal/create-order/{payment_id}"),
                Some(harness.student()),
                Value::Null,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let order_id = body["orderID"].as_str().unwrap().to_string();
        assert_eq!(order_id, harness.paypal.provider_ref(1));

        let (status, body) = send(
            &app,
            post(
                "/api/v1/payments/paypal/capture-order",
                Some(harness.student()),
                json!({"orderID": order_id}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "applied");
    }

    #[tokio::test]
    async fn teacher_slot_lifecycle() {
        let harness = TestHarness::builder().build().await.unwrap();
        let app = app(&harness, Some(SECRET));
        let start = chrono::Utc::now() + chrono::Duration::days(3);
        let body = json!({
            "language_id": harness.language.id,
            "start_time": start,
            "end_time": start + chrono::Duration::hours(1),
            "max_students": 4
        });
        let (status, body) = send(&app, post("/api/v1/slots", Some(harness.teacher()), body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["max_students"], 4);
        assert_eq!(body["status"], "available");
        let slot_id = body["id"].as_str().unwrap().to_string();

        let request = Request::builder()
            .method("DELETE")
            .uri(format!("/api/v1/slots/{slot_id}"))
            .header(
                "authorization",
                format!("Bearer {}", token(harness.teacher())),
            )
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn payout_requires_earnings() {
        let harness = TestHarness::builder().build().await.unwrap();
        let app = app(&harness, Some(SECRET));
        let (status, body) = send(
            &app,
            post(
                "/api/v1/teacher/payouts",
                Some(harness.teacher()),
                json!({"amount": "10.00"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "insufficient earnings balance");
    }

    #[tokio::test]
    async fn malformed_path_ids_are_rejected() {
        let harness = TestHarness::builder().build().await.unwrap();
        let app = app(&harness, Some(SECRET));
        let (status, _) = send(
            &app,
            post(
                "/api/v1/admin/refunds/not-a-uuid",
                Some(harness.admin()),
                json!({"decision": "approve"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
