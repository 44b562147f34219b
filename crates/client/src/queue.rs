// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Pending queue for operations that could not be sent.
//!
//! Entries are held in memory in submission order. On reconnect, queued
//! operations are replayed to the remote in order and the replayed prefix
//! is removed.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tally_core::{Operation, Reference};
use tracing::{debug, warn};

/// How an operation is forwarded and what happens to its result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardOptions {
    /// References invalidated once optimistically and once on confirmation.
    ///
    /// The confirmed invalidation fires for every accepted operation, also
    /// when `store` is false and the remote result is discarded.
    pub invalidate: Vec<Reference>,
    /// Whether the remote result is stored. Unset means yes.
    pub store: Option<bool>,
    /// Whether to forward at all. Unset means yes.
    pub should_forward: Option<bool>,
}

impl ForwardOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options invalidating `references`.
    pub fn invalidating<I>(references: I) -> Self
    where
        I: IntoIterator<Item = Reference>,
    {
        ForwardOptions {
            invalidate: references.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_store(mut self, store: bool) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_should_forward(mut self, should_forward: bool) -> Self {
        self.should_forward = Some(should_forward);
        self
    }

    /// True unless storing was explicitly disabled.
    pub fn stores(&self) -> bool {
        self.store != Some(false)
    }

    /// True unless forwarding was explicitly disabled.
    pub fn forwards(&self) -> bool {
        self.should_forward != Some(false)
    }
}

/// An operation awaiting retransmission.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub operation: Operation,
    pub options: ForwardOptions,
}

impl QueueEntry {
    /// True when both the operation and its options allow forwarding.
    pub fn forwardable(&self) -> bool {
        self.operation.should_forward && self.options.forwards()
    }
}

/// Ordered buffer of operations awaiting replay.
#[derive(Debug, Default)]
pub struct PendingQueue {
    entries: Mutex<VecDeque<QueueEntry>>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<QueueEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends an operation for later sending.
    ///
    /// Operations that must not be forwarded are refused; returns whether
    /// the entry was queued.
    pub fn enqueue(&self, operation: Operation, options: ForwardOptions) -> bool {
        let entry = QueueEntry { operation, options };
        if !entry.forwardable() {
            warn!(
                operation_id = %entry.operation.operation_id,
                kind = entry.operation.kind(),
                "refusing to queue a local-only operation"
            );
            return false;
        }
        let mut entries = self.lock();
        entries.push_back(entry);
        debug!(pending = entries.len(), "operation queued");
        true
    }

    /// Copies up to `limit` entries from the front of the queue. 0 = all.
    pub fn snapshot(&self, limit: usize) -> Vec<QueueEntry> {
        let entries = self.lock();
        let take = if limit == 0 { entries.len() } else { limit };
        entries.iter().take(take).cloned().collect()
    }

    /// Copies every entry.
    pub fn peek_all(&self) -> Vec<QueueEntry> {
        self.snapshot(0)
    }

    /// Removes the first `count` entries; returns how many were removed.
    pub fn remove_first(&self, count: usize) -> usize {
        let mut entries = self.lock();
        let count = count.min(entries.len());
        entries.drain(..count);
        count
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
