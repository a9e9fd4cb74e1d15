// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of immich-stats.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Periodic statistics poller with a single cached snapshot.
//!
//! All sensors read the snapshot held here. A fetch replaces it wholesale on
//! success and leaves it untouched on failure, so readers never observe a
//! partially updated payload.

use crate::errors::{CoordinatorError, StatisticsError, StatisticsResult};
use crate::traits::StatisticsSource;
use crate::types::StatisticsPayload;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, broadcast};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(3600);

/// Shortest interval `run` will tick at, zero would spin
pub const MIN_UPDATE_INTERVAL: Duration = Duration::from_secs(1);

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Outcome of a refresh cycle, broadcast to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorEvent {
    Updated,
    Failed(StatisticsError),
}

#[derive(Debug, Default)]
struct CoordinatorState {
    data: Option<Arc<StatisticsPayload>>,
    last_error: Option<StatisticsError>,
    last_update_success: bool,
    last_updated: Option<DateTime<Utc>>,
    /// Number of finished fetches, used to detect a fetch that completed
    /// while a caller was waiting for the gate
    completed_fetches: u64,
}

pub struct StatisticsCoordinator {
    source: Arc<dyn StatisticsSource>,
    state: RwLock<CoordinatorState>,
    fetch_gate: Mutex<()>,
    events: broadcast::Sender<CoordinatorEvent>,
    update_interval: Duration,
}

impl fmt::Debug for StatisticsCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatisticsCoordinator")
            .field("source", &self.source.name())
            .field("state", &*self.state.read())
            .field("update_interval", &self.update_interval)
            .finish_non_exhaustive()
    }
}

impl StatisticsCoordinator {
    pub fn new(source: Arc<dyn StatisticsSource>, update_interval: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        if update_interval < MIN_UPDATE_INTERVAL {
            warn!(
                requested_ms = update_interval.as_millis(),
                "Update interval too short, using {}s",
                MIN_UPDATE_INTERVAL.as_secs()
            );
        }
        Self {
            source,
            state: RwLock::new(CoordinatorState::default()),
            fetch_gate: Mutex::new(()),
            events,
            update_interval: update_interval.max(MIN_UPDATE_INTERVAL),
        }
    }

    /// First refresh before the coordinator is considered ready.
    ///
    /// There is no earlier snapshot to fall back on, so a failure here is
    /// reported as a setup failure.
    pub async fn start(&self) -> Result<Arc<StatisticsPayload>, CoordinatorError> {
        info!(
            source = self.source.name(),
            interval_secs = self.update_interval.as_secs(),
            "Starting statistics coordinator"
        );

        self.refresh().await.map_err(|e| {
            error!(error = %e, kind = e.kind(), "Initial statistics refresh failed");
            CoordinatorError::SetupFailed(e)
        })
    }

    /// Fetch fresh statistics, or join the fetch already in flight.
    ///
    /// Callers arriving while a fetch runs wait for it and get its outcome
    /// instead of issuing a second request.
    pub async fn refresh(&self) -> StatisticsResult<Arc<StatisticsPayload>> {
        let observed = self.state.read().completed_fetches;
        let _gate = self.fetch_gate.lock().await;

        {
            let state = self.state.read();
            if state.completed_fetches != observed {
                debug!("Joined statistics fetch that completed while waiting");
                if let Some(error) = &state.last_error {
                    return Err(error.clone());
                }
                if let Some(data) = &state.data {
                    return Ok(Arc::clone(data));
                }
            }
        }

        self.fetch_and_store().await
    }

    async fn fetch_and_store(&self) -> StatisticsResult<Arc<StatisticsPayload>> {
        debug!(source = self.source.name(), "Fetching statistics");
        let result = self.source.fetch().await;

        let mut state = self.state.write();
        state.completed_fetches += 1;

        match result {
            Ok(payload) => {
                let payload = Arc::new(payload);
                state.data = Some(Arc::clone(&payload));
                state.last_error = None;
                state.last_update_success = true;
                state.last_updated = Some(Utc::now());
                drop(state);

                info!(fields = payload.len(), "Statistics updated");
                self.notify(CoordinatorEvent::Updated);
                Ok(payload)
            }
            Err(e) => {
                state.last_error = Some(e.clone());
                state.last_update_success = false;
                let has_snapshot = state.data.is_some();
                drop(state);

                warn!(
                    error = %e,
                    kind = e.kind(),
                    keeping_snapshot = has_snapshot,
                    "Statistics update failed"
                );
                self.notify(CoordinatorEvent::Failed(e.clone()));
                Err(e)
            }
        }
    }

    fn notify(&self, event: CoordinatorEvent) {
        // No subscribers is a normal state, e.g. in --once mode
        if self.events.send(event).is_err() {
            debug!("No coordinator subscribers");
        }
    }

    /// Refresh every `update_interval` until `shutdown` resolves.
    /// The first tick fires one full interval from now, `start()` covers t=0.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker =
            tokio::time::interval_at(Instant::now() + self.update_interval, self.update_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("Statistics coordinator stopped");
                    break;
                }
                _ = ticker.tick() => {
                    // Failures are logged and broadcast inside refresh
                    let _ = self.refresh().await;
                }
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.events.subscribe()
    }

    /// Current snapshot, `None` until the first successful fetch
    pub fn data(&self) -> Option<Arc<StatisticsPayload>> {
        self.state.read().data.clone()
    }

    pub fn last_error(&self) -> Option<StatisticsError> {
        self.state.read().last_error.clone()
    }

    /// Whether the most recent fetch succeeded
    pub fn last_update_success(&self) -> bool {
        self.state.read().last_update_success
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.state.read().last_updated
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Source replaying queued results, counting calls
    pub(crate) struct ScriptedSource {
        responses: parking_lot::Mutex<VecDeque<StatisticsResult<StatisticsPayload>>>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        pub(crate) fn new(responses: Vec<StatisticsResult<StatisticsPayload>>) -> Self {
            Self {
                responses: parking_lot::Mutex::new(responses.into()),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl StatisticsSource for ScriptedSource {
        async fn fetch(&self) -> StatisticsResult<StatisticsPayload> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(StatisticsPayload::default()))
        }

        async fn health_check(&self) -> StatisticsResult<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    pub(crate) fn payload(value: serde_json::Value) -> StatisticsPayload {
        StatisticsPayload::from_value(value).unwrap()
    }
}
