// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transactional email through the Brevo HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::debug;

use tutorlane_config::TutorlaneConfig;
use tutorlane_core::{Notification, Notifier, TutorError};

#[derive(Debug, Serialize)]
struct Contact<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendEmail<'a> {
    sender: Contact<'a>,
    to: [Contact<'a>; 1],
    subject: &'a str,
    html_content: &'a str,
}

pub struct BrevoNotifier {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    sender_email: String,
    sender_name: String,
}

impl BrevoNotifier {
    /// Build from the `[email]` section. `None` when no API key is set.
    pub fn from_config(config: &TutorlaneConfig) -> Result<Option<Self>, TutorError> {
        let Some(api_key) = config.email.api_key.clone().filter(|k| !k.is_empty()) else {
            return Ok(None);
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.commerce.gateway_timeout_secs))
            .build()
            .map_err(|e| TutorError::Notification(format!("failed to build HTTP client: {e}")))?;
        Ok(Some(Self {
            client,
            base_url: config.email.base_url.trim_end_matches('/').to_string(),
            api_key,
            sender_email: config.email.sender_email.clone(),
            sender_name: config.email.sender_name.clone(),
        }))
    }
}

/// Display name for a recipient: the given name, or the mailbox part.
fn recipient_name(notification: &Notification) -> &str {
    let name = notification.recipient_name.trim();
    if !name.is_empty() {
        return name;
    }
    notification
        .recipient_email
        .split_once('@')
        .map_or(notification.recipient_email.as_str(), |(local, _)| local)
}

#[async_trait]
impl Notifier for BrevoNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), TutorError> {
        let email = notification.recipient_email.trim();
        if !email.contains('@') {
            return Err(TutorError::Notification(format!(
                "invalid recipient email: {email}"
            )));
        }

        let payload = SendEmail {
            sender: Contact {
                name: &self.sender_name,
                email: &self.sender_email,
            },
            to: [Contact {
                name: recipient_name(notification),
                email,
            }],
            subject: &notification.subject,
            html_content: &notification.html_body,
        };

        debug!(to = email, subject = %notification.subject, "sending email");
        let response = self
            .client
            .post(format!("{}/smtp/email", self.base_url))
            .header("accept", "application/json")
            .header("api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| TutorError::Notification(format!("email request failed: {e}")))?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(TutorError::Notification(format!(
                "email API returned {status}: {body}"
            )));
        }
        Ok(())
    }
}
