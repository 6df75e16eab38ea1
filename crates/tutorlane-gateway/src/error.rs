// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of engine errors onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use tutorlane_core::TutorError;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A [`TutorError`] on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub TutorError);

impl From<TutorError> for ApiError {
    fn from(err: TutorError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            TutorError::SlotNotFound(_) | TutorError::NotFound { .. } => StatusCode::NOT_FOUND,
            TutorError::SlotFull | TutorError::InvalidTransition { .. } => StatusCode::CONFLICT,
            TutorError::InsufficientCredit
            | TutorError::InsufficientBalance
            | TutorError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            TutorError::Forbidden(_) => StatusCode::FORBIDDEN,
            TutorError::Provider { .. }
            | TutorError::ProviderRejected(_)
            | TutorError::Conversion(_) => StatusCode::BAD_GATEWAY,
            TutorError::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
            TutorError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            TutorError::Storage { .. } | TutorError::Notification(_) | TutorError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self.0, "request failed");
            "internal server error".to_string()
        } else {
            if status.is_server_error() {
                tracing::warn!(error = %self.0, "upstream failure");
            }
            self.0.to_string()
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn business_errors_map_to_client_statuses() {
        let cases = [
            (TutorError::SlotFull, StatusCode::CONFLICT),
            (TutorError::SlotNotFound(uuid::Uuid::nil()), StatusCode::NOT_FOUND),
            (TutorError::InsufficientCredit, StatusCode::BAD_REQUEST),
            (TutorError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (
                TutorError::transition("payout", "completed", "rejected"),
                StatusCode::CONFLICT,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status(), status);
        }
    }

    #[test]
    fn infrastructure_errors_map_to_server_statuses() {
        assert_eq!(
            ApiError(TutorError::Timeout {
                duration: Duration::from_secs(10)
            })
            .status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ApiError(TutorError::ProviderRejected("declined".into())).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError(TutorError::Internal("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
