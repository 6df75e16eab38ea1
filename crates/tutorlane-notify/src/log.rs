// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use tracing::info;

use tutorlane_core::{Notification, Notifier, TutorError};

/// Writes notifications to the log instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), TutorError> {
        info!(
            to = %notification.recipient_email,
            subject = %notification.subject,
            "notification (not sent, no email provider configured)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[tokio::test]
    #[traced_test]
    async fn logs_instead_of_sending() {
        LogNotifier
            .send(&Notification {
                recipient_name: "Amina".into(),
                recipient_email: "amina@example.com".into(),
                subject: "Your Booking is Confirmed!".into(),
                html_body: "<p>hi</p>".into(),
            })
            .await
            .unwrap();
        assert!(logs_contain("amina@example.com"));
        assert!(logs_contain("Your Booking is Confirmed!"));
    }
}
