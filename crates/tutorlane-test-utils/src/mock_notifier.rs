// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notifier that keeps every message it was asked to send.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tutorlane_core::{Notification, Notifier, TutorError};

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    failing: AtomicBool,
    allowance: Mutex<Option<usize>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
        *self
            .allowance
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    /// Deliver the next `sends` messages, then fail until reset.
    pub fn fail_after(&self, sends: usize) {
        *self
            .allowance
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(sends);
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Subjects of all delivered messages, in order.
    pub fn subjects(&self) -> Vec<String> {
        self.sent().into_iter().map(|n| n.subject).collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), TutorError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TutorError::Notification("mail relay down".into()));
        }
        {
            let mut allowance = self
                .allowance
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            match *allowance {
                Some(0) => return Err(TutorError::Notification("mail relay down".into())),
                Some(n) => *allowance = Some(n - 1),
                None => {}
            }
        }
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(notification.clone());
        Ok(())
    }
}
