// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared HTTP plumbing for the provider adapters.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use tutorlane_core::TutorError;

/// Build a client whose every request is bounded by `timeout`.
pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, TutorError> {
    let mut headers = HeaderMap::new();
    headers.insert("accept", HeaderValue::from_static("application/json"));

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|e| TutorError::Provider {
            message: format!("failed to build HTTP client: {e}"),
            source: Some(Box::new(e)),
        })
}

/// Classify a transport failure. Timeouts keep their own variant so callers
/// can tell "no answer" from "bad answer".
pub(crate) fn transport_error(what: &str, timeout: Duration, e: reqwest::Error) -> TutorError {
    if e.is_timeout() {
        TutorError::Timeout { duration: timeout }
    } else {
        TutorError::Provider {
            message: format!("{what} request failed: {e}"),
            source: Some(Box::new(e)),
        }
    }
}

/// Error for a response that arrived with an unexpected status.
pub(crate) async fn status_error(what: &str, response: reqwest::Response) -> TutorError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    TutorError::Provider {
        message: format!("{what} returned {status}: {body}"),
        source: None,
    }
}

/// Error for a body that did not decode into the expected shape.
pub(crate) fn decode_error(what: &str, e: reqwest::Error) -> TutorError {
    TutorError::Provider {
        message: format!("failed to decode {what} response: {e}"),
        source: Some(Box::new(e)),
    }
}
