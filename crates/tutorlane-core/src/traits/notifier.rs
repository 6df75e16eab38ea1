// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound notification sender.

use async_trait::async_trait;

use crate::error::TutorError;

/// A rendered message for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub recipient_name: String,
    pub recipient_email: String,
    pub subject: String,
    pub html_body: String,
}

/// Delivers notifications. Callers log failures and move on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), TutorError>;
}
