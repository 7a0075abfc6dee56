//! Periodic and triggered sync scheduling with single-flight de-duplication.
//!
//! Many things may want a sync at once (a caller's explicit request, the
//! periodic timer, a network-reconnect signal). Exactly one sync runs at a
//! time; concurrent requests attach to the in-flight run and all receive
//! its result, so two pushes can never race on the watermark and log-purge
//! state.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, Mutex as AsyncMutex};

use crate::models::SyncSettings;
use crate::remote::RemoteDocumentClient;

use super::{SyncEngine, SyncReport};

/// What caused a sync attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    Startup,
    Interval,
    NetworkReconnect,
    Manual,
}

impl SyncTrigger {
    /// Background triggers honor `silent_sync`; manual requests never do.
    #[must_use]
    pub const fn is_background(self) -> bool {
        !matches!(self, Self::Manual)
    }
}

/// Terminal result delivered to status listeners.
#[derive(Debug, Clone)]
pub enum SyncOutcome {
    Completed(SyncReport),
    Failed { message: String, transient: bool },
}

/// Status payload passed to registered listeners.
#[derive(Debug, Clone)]
pub struct SyncEvent {
    pub trigger: SyncTrigger,
    pub outcome: SyncOutcome,
}

/// Scheduler timing knobs, mostly interesting to tests.
#[derive(Debug, Clone)]
pub struct SchedulerTiming {
    /// Delay before the startup sync, leaving initialization in peace
    pub startup_delay: Duration,
    /// Attempts for transient failures per triggered sync
    pub retry_attempts: u32,
    /// Fixed delay between those attempts
    pub retry_delay: Duration,
}

impl Default for SchedulerTiming {
    fn default() -> Self {
        Self {
            startup_delay: Duration::from_secs(10),
            retry_attempts: 3,
            retry_delay: Duration::from_secs(5),
        }
    }
}

type StatusListener = Box<dyn Fn(&SyncEvent) + Send + Sync>;

struct Inner<R> {
    engine: SyncEngine<R>,
    settings: SyncSettings,
    timing: SchedulerTiming,
    inflight: AsyncMutex<Option<broadcast::Sender<SyncEvent>>>,
    listeners: Mutex<Vec<StatusListener>>,
}

/// Decides *when* the engine runs; the engine decides what a sync does.
pub struct AutoSyncScheduler<R> {
    inner: Arc<Inner<R>>,
}

impl<R> Clone for AutoSyncScheduler<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: RemoteDocumentClient + 'static> AutoSyncScheduler<R> {
    pub fn new(engine: SyncEngine<R>, settings: SyncSettings) -> Self {
        Self::with_timing(engine, settings, SchedulerTiming::default())
    }

    pub fn with_timing(
        engine: SyncEngine<R>,
        settings: SyncSettings,
        timing: SchedulerTiming,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                engine,
                settings,
                timing,
                inflight: AsyncMutex::new(None),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Register a typed status listener.
    ///
    /// Errors are always delivered. With `silent_sync` enabled, successful
    /// and skipped background syncs stay quiet; manual syncs always report.
    pub fn on_status_change(&self, listener: impl Fn(&SyncEvent) + Send + Sync + 'static) {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(listener));
    }

    /// Spawn the startup sync and the periodic consistency loop.
    pub fn start(&self) {
        if !self.inner.settings.enabled {
            tracing::debug!("auto-sync disabled, scheduler not started");
            return;
        }

        if self.inner.settings.sync_on_startup {
            let scheduler = self.clone();
            tokio::spawn(async move {
                tokio::time::sleep(scheduler.inner.timing.startup_delay).await;
                scheduler
                    .request_sync_with(SyncTrigger::Startup, false)
                    .await;
            });
        }

        let interval = Duration::from_secs(self.inner.settings.interval_minutes.max(1) * 60);
        let scheduler = self.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                scheduler.periodic_tick().await;
            }
        });
    }

    /// Explicitly request a sync, waiting for its result.
    pub async fn request_sync(&self) -> SyncEvent {
        self.request_sync_with(SyncTrigger::Manual, true).await
    }

    /// Signal that the network came back after being offline.
    pub fn notify_network_reconnected(&self) {
        if !self.inner.settings.sync_on_network_reconnect {
            return;
        }
        tracing::debug!("network reconnected, triggering sync");
        let scheduler = self.clone();
        tokio::spawn(async move {
            scheduler
                .request_sync_with(SyncTrigger::NetworkReconnect, false)
                .await;
        });
    }

    /// Run a consistency check first; only a diverged catalog warrants the
    /// full sync. A failed check falls through to a normal sync attempt.
    async fn periodic_tick(&self) {
        if !self.inner.engine.is_configured() {
            return;
        }
        match self.inner.engine.check_consistency().await {
            Ok(report) if report.consistent => {
                tracing::debug!("catalog consistent with remote, skipping periodic sync");
            }
            Ok(report) => {
                tracing::info!(
                    mismatched = report.mismatched.len(),
                    "catalog diverged from remote, running sync"
                );
                self.request_sync_with(SyncTrigger::Interval, true).await;
            }
            Err(error) => {
                tracing::warn!(%error, "consistency check failed, attempting sync anyway");
                self.request_sync_with(SyncTrigger::Interval, false).await;
            }
        }
    }

    /// Single-flight entry point: start a sync, or attach to the one
    /// already running and share its result.
    async fn request_sync_with(&self, trigger: SyncTrigger, force: bool) -> SyncEvent {
        let mut receiver = {
            let mut inflight = self.inner.inflight.lock().await;
            if let Some(sender) = inflight.as_ref() {
                tracing::debug!("sync already in flight, queueing behind it");
                sender.subscribe()
            } else {
                let (sender, receiver) = broadcast::channel(1);
                *inflight = Some(sender.clone());

                let scheduler = self.clone();
                tokio::spawn(async move {
                    let outcome = scheduler.run_with_retry(force).await;
                    let event = SyncEvent { trigger, outcome };
                    // Clear before broadcasting so a caller arriving after
                    // the result starts a fresh sync instead of missing it
                    *scheduler.inner.inflight.lock().await = None;
                    scheduler.notify(&event);
                    let _ = sender.send(event);
                });
                receiver
            }
        };

        match receiver.recv().await {
            Ok(event) => event,
            Err(_) => SyncEvent {
                trigger,
                outcome: SyncOutcome::Failed {
                    message: "sync task ended without reporting".into(),
                    transient: false,
                },
            },
        }
    }

    async fn run_with_retry(&self, force: bool) -> SyncOutcome {
        let mut attempt = 1u32;
        loop {
            match self.inner.engine.sync(force).await {
                Ok(report) => return SyncOutcome::Completed(report),
                Err(error) if error.is_transient() && attempt < self.inner.timing.retry_attempts => {
                    attempt += 1;
                    tracing::warn!(attempt, %error, "transient sync failure, retrying");
                    tokio::time::sleep(self.inner.timing.retry_delay).await;
                }
                Err(error) => {
                    tracing::error!(%error, "sync failed");
                    return SyncOutcome::Failed {
                        message: error.to_string(),
                        transient: error.is_transient(),
                    };
                }
            }
        }
    }

    fn notify(&self, event: &SyncEvent) {
        let suppress = self.inner.settings.silent_sync
            && event.trigger.is_background()
            && !matches!(event.outcome, SyncOutcome::Failed { .. });
        if suppress {
            return;
        }
        let listeners = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter() {
            listener(event);
        }
    }
}
