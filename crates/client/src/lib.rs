// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tally-client: optimistic cache and forwarding client for the tally remote
//!
//! Operations are answered immediately from a local prediction, forwarded
//! to the remote in the background, and reconciled when the authoritative
//! result arrives. Operations that cannot be sent are queued and replayed
//! once the remote is reachable again.
//!
//! # Features
//!
//! - Normalized in-memory resource store with hydrated reads
//! - Per-reference update and invalidation events
//! - Pending queue with in-order replay on reconnect
//! - Injectable transport trait for testing

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod forward;
pub mod handlers;
pub mod offline;
pub mod queue;
pub mod store;
pub mod transport;

pub use client::Client;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use events::{Event, EventBus, Subscription, Topic};
pub use forward::{ForwardOutcome, Forwarder};
pub use offline::{Connectivity, MonitorHandle, OfflineMonitor, ReplaySummary};
pub use queue::{ForwardOptions, PendingQueue, QueueEntry};
pub use store::{Store, StoreWriter};
pub use transport::{HttpTransport, Reply, Transport, TransportError};

#[cfg(test)]
mod test_helpers;



#[cfg(test)]
mod offline_tests;
