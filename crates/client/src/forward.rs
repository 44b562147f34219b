// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Forwarding of operations to the remote.
//!
//! Forwarding never fails to its caller. Transport failures land in the
//! pending queue, server rejections are logged and dropped.
//!
//! For one operation the sequence is:
//!
//! ```text
//! forward ──► spawn optimistic invalidation (next turn)
//!         ──► offline? ─yes─► queue
//!         ──► perform ─err─► queue
//!                     ─rejected─► log, drop
//!                     ─accepted─► await optimistic ─► store ─► confirmed invalidation
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tally_core::{Operation, Reference};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::events::{Event, EventBus};
use crate::offline::Connectivity;
use crate::queue::{ForwardOptions, PendingQueue, QueueEntry};
use crate::store::Store;
use crate::transport::{Reply, Transport, TransportError};

/// What happened to a forwarded operation.
#[derive(Debug, Clone, PartialEq)]
pub enum ForwardOutcome {
    /// Forwarding was disabled for this operation.
    Skipped,
    /// The remote accepted the operation and returned this result.
    Accepted(Value),
    /// The remote rejected the operation; it was dropped.
    Rejected { status: u16 },
    /// The operation could not be sent and was queued for replay.
    Queued,
}

/// Result of sending a batch of queued entries.
#[derive(Debug, Default, PartialEq)]
pub struct BatchOutcome {
    /// Entries sent, from the front of the batch. Rejected entries count as sent.
    pub sent: usize,
    /// Results of accepted entries that asked to be stored.
    pub results: Vec<Value>,
    /// True if the batch stopped early on a transport failure.
    pub interrupted: bool,
}

/// Sends operations to the remote and applies their results.
pub struct Forwarder {
    store: Arc<Store>,
    queue: Arc<PendingQueue>,
    transport: Arc<dyn Transport>,
    connectivity: Arc<Connectivity>,
    in_flight: Mutex<Vec<JoinHandle<ForwardOutcome>>>,
}

impl Forwarder {
    pub fn new(
        store: Arc<Store>,
        queue: Arc<PendingQueue>,
        transport: Arc<dyn Transport>,
        connectivity: Arc<Connectivity>,
    ) -> Self {
        Forwarder {
            store,
            queue,
            transport,
            connectivity,
            in_flight: Mutex::new(Vec::new()),
        }
    }

    fn events(&self) -> &EventBus {
        self.store.events()
    }

    /// Forwards one operation and waits for the round trip.
    pub async fn forward(&self, operation: Operation, options: ForwardOptions) -> ForwardOutcome {
        if !operation.should_forward || !options.forwards() {
            debug!(operation_id = %operation.operation_id, "forwarding disabled");
            return ForwardOutcome::Skipped;
        }

        let optimistic = self.schedule_invalidation(options.invalidate.clone());

        if self.connectivity.is_offline() {
            self.defer(operation, options, &TransportError::Offline);
            let _ = optimistic.await;
            return ForwardOutcome::Queued;
        }

        let reply = self.transport.perform(&operation).await;
        let _ = optimistic.await;

        match reply {
            Ok(Reply::Accepted(result)) => {
                debug!(
                    operation_id = %operation.operation_id,
                    kind = operation.kind(),
                    "forwarded operation"
                );
                if options.stores() {
                    self.store.put(result.clone());
                }
                self.invalidate(&options.invalidate, true);
                ForwardOutcome::Accepted(result)
            }
            Ok(Reply::Rejected { status, body }) => {
                warn!(
                    operation_id = %operation.operation_id,
                    kind = operation.kind(),
                    status,
                    body = %body,
                    "remote rejected operation, dropping"
                );
                ForwardOutcome::Rejected { status }
            }
            Err(e) => {
                self.defer(operation, options, &e);
                ForwardOutcome::Queued
            }
        }
    }

    /// Forwards in the background, returning immediately.
    ///
    /// Without a runtime the operation goes straight to the pending queue.
    pub fn spawn(self: &Arc<Self>, operation: Operation, options: ForwardOptions) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(operation_id = %operation.operation_id, "no async runtime, queueing operation");
                self.queue.enqueue(operation, options);
                return;
            }
        };
        let forwarder = Arc::clone(self);
        let task = handle.spawn(async move { forwarder.forward(operation, options).await });
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        in_flight.retain(|task| !task.is_finished());
        in_flight.push(task);
    }

    /// Waits for every background forward, including ones started meanwhile.
    pub async fn settle(&self) -> Vec<ForwardOutcome> {
        let mut outcomes = Vec::new();
        loop {
            let tasks: Vec<_> = {
                let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
                in_flight.drain(..).collect()
            };
            if tasks.is_empty() {
                return outcomes;
            }
            for task in tasks {
                match task.await {
                    Ok(outcome) => outcomes.push(outcome),
                    Err(e) => warn!(error = %e, "forward task failed"),
                }
            }
        }
    }

    /// Sends queued entries in order, stopping at the first transport failure.
    ///
    /// Nothing is stored, invalidated, or removed from the queue here.
    pub async fn forward_batch(&self, entries: &[QueueEntry]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for entry in entries {
            if !entry.forwardable() {
                outcome.sent += 1;
                continue;
            }
            match self.transport.perform(&entry.operation).await {
                Ok(Reply::Accepted(result)) => {
                    if entry.options.stores() {
                        outcome.results.push(result);
                    }
                }
                Ok(Reply::Rejected { status, .. }) => {
                    warn!(
                        operation_id = %entry.operation.operation_id,
                        status,
                        "remote rejected replayed operation, dropping"
                    );
                }
                Err(e) => {
                    warn!(
                        operation_id = %entry.operation.operation_id,
                        error = %e,
                        "replay interrupted"
                    );
                    outcome.interrupted = true;
                    break;
                }
            }
            outcome.sent += 1;
        }
        outcome
    }

    /// Emits invalidations for `references`.
    pub(crate) fn invalidate(&self, references: &[Reference], confirmed: bool) {
        for reference in references {
            debug!(reference = %reference, confirmed, "invalidate");
            self.events().emit(Event::Invalidated {
                reference: reference.clone(),
                confirmed,
            });
        }
    }

    fn schedule_invalidation(&self, references: Vec<Reference>) -> JoinHandle<()> {
        let bus = self.events().clone();
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            for reference in references {
                debug!(reference = %reference, confirmed = false, "invalidate");
                bus.emit(Event::Invalidated {
                    reference,
                    confirmed: false,
                });
            }
        })
    }

    fn defer(&self, operation: Operation, options: ForwardOptions, error: &TransportError) {
        warn!(
            operation_id = %operation.operation_id,
            kind = operation.kind(),
            error = %error,
            "could not forward operation, queueing"
        );
        self.queue.enqueue(operation, options);
    }
}

impl std::fmt::Debug for Forwarder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Forwarder")
            .field("pending", &self.queue.len())
            .field("offline", &self.connectivity.is_offline())
            .finish()
    }
}
