// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connectivity tracking and queue replay.
//!
//! Connectivity combines a platform signal (the host says it is online or
//! offline) with periodic probes of the remote's health endpoint. Only
//! actual transitions are acted on; going online replays the pending queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use indexmap::IndexSet;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::events::Event;
use crate::forward::Forwarder;
use crate::queue::PendingQueue;
use crate::store::Store;
use crate::transport::Transport;

/// Shared online/offline flag consulted before every forward.
#[derive(Debug, Default)]
pub struct Connectivity {
    offline: AtomicBool,
}

impl Connectivity {
    /// Starts online.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Sets the flag, returning the previous value.
    pub fn set_offline(&self, offline: bool) -> bool {
        self.offline.swap(offline, Ordering::SeqCst)
    }
}

/// Summary of one queue replay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Entries sent and removed from the queue.
    pub replayed: usize,
    /// Results written to the store.
    pub stored: usize,
    /// Entries still queued afterwards.
    pub remaining: usize,
    /// True if a transport failure cut the replay short.
    pub interrupted: bool,
}

/// Watches connectivity and replays the pending queue on reconnect.
pub struct OfflineMonitor {
    store: Arc<Store>,
    queue: Arc<PendingQueue>,
    forwarder: Arc<Forwarder>,
    transport: Arc<dyn Transport>,
    connectivity: Arc<Connectivity>,
    /// Last reported state. Starts offline so the first online report replays.
    last_offline: Mutex<bool>,
    platform_online: AtomicBool,
    max_replay_batch: usize,
    replay_lock: tokio::sync::Mutex<()>,
}

impl OfflineMonitor {
    pub fn new(
        store: Arc<Store>,
        queue: Arc<PendingQueue>,
        forwarder: Arc<Forwarder>,
        transport: Arc<dyn Transport>,
        connectivity: Arc<Connectivity>,
        max_replay_batch: usize,
    ) -> Self {
        OfflineMonitor {
            store,
            queue,
            forwarder,
            transport,
            connectivity,
            last_offline: Mutex::new(true),
            platform_online: AtomicBool::new(true),
            max_replay_batch,
            replay_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Records a connectivity observation.
    ///
    /// The shared flag always follows the observation; only transitions are
    /// acted on. A transition to online replays the pending queue before
    /// returning, and the replay summary is returned.
    pub async fn report(&self, offline: bool) -> Option<ReplaySummary> {
        self.connectivity.set_offline(offline);
        {
            let mut last = self.last_offline.lock().unwrap_or_else(PoisonError::into_inner);
            if *last == offline {
                return None;
            }
            *last = offline;
        }
        if offline {
            info!(pending = self.queue.len(), "connectivity lost");
            return None;
        }
        info!(pending = self.queue.len(), "connectivity restored");
        Some(self.replay().await)
    }

    /// Probes the remote and reports the combined state.
    pub async fn check(&self) -> Option<ReplaySummary> {
        let online = self.platform_online.load(Ordering::SeqCst) && self.probe().await;
        self.report(!online).await
    }

    async fn probe(&self) -> bool {
        match self.transport.probe().await {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "liveness probe failed");
                false
            }
        }
    }

    /// Applies a platform online/offline signal.
    ///
    /// Going offline takes effect immediately; coming online is confirmed by
    /// a probe first.
    pub async fn set_platform_online(&self, online: bool) -> Option<ReplaySummary> {
        self.platform_online.store(online, Ordering::SeqCst);
        if online {
            self.check().await
        } else {
            self.report(true).await
        }
    }

    /// Replays the pending queue.
    ///
    /// Entries are sent in queue order. Results are stored and the union of
    /// their invalidation targets is confirmed once the batch ends. Only the
    /// sent prefix leaves the queue, so entries queued meanwhile survive. A
    /// transport failure stops the batch and flips back to offline.
    pub async fn replay(&self) -> ReplaySummary {
        let _guard = self.replay_lock.lock().await;
        let bus = self.store.events();
        bus.emit(Event::Syncing(true));

        let entries = self.queue.snapshot(self.max_replay_batch);
        let batch = self.forwarder.forward_batch(&entries).await;

        let targets: IndexSet<_> = entries[..batch.sent]
            .iter()
            .flat_map(|entry| entry.options.invalidate.iter().cloned())
            .collect();

        let stored = batch.results.len();
        for result in batch.results {
            self.store.put(result);
        }
        let targets: Vec<_> = targets.into_iter().collect();
        self.forwarder.invalidate(&targets, true);

        let replayed = self.queue.remove_first(batch.sent);
        if batch.interrupted {
            *self.last_offline.lock().unwrap_or_else(PoisonError::into_inner) = true;
            self.connectivity.set_offline(true);
            warn!(replayed, remaining = self.queue.len(), "replay interrupted, back offline");
        }

        let summary = ReplaySummary {
            replayed,
            stored,
            remaining: self.queue.len(),
            interrupted: batch.interrupted,
        };
        info!(
            replayed = summary.replayed,
            stored = summary.stored,
            remaining = summary.remaining,
            "replay finished"
        );
        bus.emit(Event::Syncing(false));
        summary
    }

    /// Probes every `interval` until the returned handle is dropped.
    pub fn spawn(self: &Arc<Self>, interval: Duration) -> MonitorHandle {
        let monitor = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                monitor.check().await;
            }
        });
        MonitorHandle { task }
    }
}

impl std::fmt::Debug for OfflineMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineMonitor")
            .field("offline", &self.connectivity.is_offline())
            .field("pending", &self.queue.len())
            .finish()
    }
}

/// Stops the probe loop when dropped.
#[derive(Debug)]
pub struct MonitorHandle {
    task: JoinHandle<()>,
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
