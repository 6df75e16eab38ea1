// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbox dispatcher.
//!
//! Claims one outbox entry at a time, performs its side effect and acks it.
//! A failed entry goes back to the outbox and is retried after a growing
//! delay until its attempts run out. Mails already sent for an entry are
//! recorded on it and skipped by the retry. Nothing here writes to the ledger except through the engine's own
//! operations (referral rewards).

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use tutorlane_booking::BookingEngine;
use tutorlane_core::{DomainEvent, Notifier, TutorError};
use tutorlane_storage::queries::outbox;
use tutorlane_storage::{Database, OutboxEntry};

use crate::templates;

/// What happened to one claimed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    Retrying,
}

/// Base delay before a failed entry is retried; multiplied by the attempt.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(30);

pub struct EventDispatcher {
    db: Arc<Database>,
    engine: Arc<BookingEngine>,
    notifier: Arc<dyn Notifier>,
    retry_backoff: Duration,
}

impl EventDispatcher {
    pub fn new(
        db: Arc<Database>,
        engine: Arc<BookingEngine>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            db,
            engine,
            notifier,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Process the oldest due entry. `None` when the outbox is empty.
    pub async fn dispatch_next(&self) -> Result<Option<DispatchOutcome>, TutorError> {
        let Some(entry) = outbox::dequeue(&self.db).await? else {
            return Ok(None);
        };

        match self.handle(&entry).await {
            Ok(()) => {
                outbox::ack(&self.db, entry.id).await?;
                Ok(Some(DispatchOutcome::Delivered))
            }
            Err(e) => {
                warn!(
                    entry_id = entry.id,
                    attempt = entry.attempts + 1,
                    max_attempts = entry.max_attempts,
                    error = %e,
                    "event dispatch failed"
                );
                outbox::fail(&self.db, entry.id, self.retry_backoff).await?;
                Ok(Some(DispatchOutcome::Retrying))
            }
        }
    }

    /// Dispatch until nothing is due. Returns how many entries were claimed.
    pub async fn drain(&self) -> Result<usize, TutorError> {
        let mut claimed = 0;
        while self.dispatch_next().await?.is_some() {
            claimed += 1;
        }
        Ok(claimed)
    }

    /// Poll the outbox every `poll_interval` until `cancel` fires.
    pub async fn run(&self, poll_interval: Duration, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(poll_ms = poll_interval.as_millis() as u64, "event dispatcher started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.drain().await {
                        Ok(0) => {}
                        Ok(n) => debug!(claimed = n, "outbox drained"),
                        Err(e) => error!(error = %e, "outbox polling failed"),
                    }
                }
                _ = cancel.cancelled() => {
                    info!("event dispatcher shutting down");
                    break;
                }
            }
        }
    }

    async fn handle(&self, entry: &OutboxEntry) -> Result<(), TutorError> {
        let event = entry
            .event()
            .map_err(|e| TutorError::Internal(format!("undecodable outbox entry {}: {e}", entry.id)))?;
        debug!(entry_id = entry.id, kind = event.kind(), "dispatching event");

        if let DomainEvent::ReferralCheck { user_id } = event {
            self.engine.complete_referral(user_id).await?;
            return Ok(());
        }

        let notifications = {
            let event = event.clone();
            self.db
                .read(move |c| templates::compose(c, &event))
                .await?
        };
        let already = usize::try_from(entry.delivered).unwrap_or(0);
        for (index, notification) in notifications.iter().enumerate().skip(already) {
            self.notifier.send(notification).await?;
            let delivered = i32::try_from(index + 1).unwrap_or(i32::MAX);
            outbox::record_progress(&self.db, entry.id, delivered).await?;
        }
        debug!(
            kind = event.kind(),
            sent = notifications.len().saturating_sub(already),
            "event notifications sent"
        );
        Ok(())
    }
}
