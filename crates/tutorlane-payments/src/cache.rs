// SPDX-FileCopyrightText: 2026 Tutorlane Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A single value with an expiry, refreshed on demand.
//!
//! Used for provider access tokens and the exchange-rate table. Readers share
//! a read lock on the hot path; a refresh takes the write lock and re-checks,
//! so concurrent misses trigger one fetch.

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tutorlane_core::TutorError;

pub struct ExpiringCache<T> {
    slot: RwLock<Option<(T, Instant)>>,
}

impl<T: Clone> Default for ExpiringCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> ExpiringCache<T> {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// The cached value if still fresh, otherwise the result of `refresh`.
    ///
    /// `refresh` returns the new value and how long it stays valid. A failed
    /// refresh leaves the cache empty-or-stale and is returned as-is.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<T, TutorError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(T, Duration), TutorError>>,
    {
        if let Some(value) = Self::fresh(&*self.slot.read().await) {
            return Ok(value);
        }

        let mut slot = self.slot.write().await;
        if let Some(value) = Self::fresh(&slot) {
            return Ok(value);
        }
        let (value, ttl) = refresh().await?;
        *slot = Some((value.clone(), Instant::now() + ttl));
        Ok(value)
    }

    /// Drop the cached value so the next read refreshes.
    pub async fn invalidate(&self) {
        *self.slot.write().await = None;
    }

    fn fresh(slot: &Option<(T, Instant)>) -> Option<T> {
        match slot {
            Some((value, expires_at)) if Instant::now() < *expires_at => Some(value.clone()),
            _ => None,
        }
    }
}
