// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client facade.
//!
//! [`Client`] is the dispatcher: it validates operations, routes them to
//! their handler, and stores the predicted results. It also owns the
//! collaborators shared by forwarding and replay.
//!
//! ```text
//! perform ─► validate ─► handler (predict) ─► store result record ─► events
//!                                                   │
//!                               forwarder ◄─────────┘
//!                                   │
//!                                   ├─► transport ─► remote
//!                                   └─► pending queue ◄─ offline monitor (replay)
//! ```

use std::sync::Arc;

use serde_json::{json, Value};
use tally_core::{
    Error as CoreError, Item, Operation, OperationPayload, Product, Reference, Resource, Tab,
};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::Result;
use crate::events::{Event, EventBus, Subscription, Topic};
use crate::forward::{ForwardOutcome, Forwarder};
use crate::handlers::Handlers;
use crate::offline::{Connectivity, MonitorHandle, OfflineMonitor, ReplaySummary};
use crate::queue::{ForwardOptions, PendingQueue, QueueEntry};
use crate::store::Store;
use crate::transport::{HttpTransport, Transport};

/// Optimistic client for the tally remote.
#[derive(Debug)]
pub struct Client {
    config: ClientConfig,
    store: Arc<Store>,
    queue: Arc<PendingQueue>,
    connectivity: Arc<Connectivity>,
    forwarder: Arc<Forwarder>,
    monitor: Arc<OfflineMonitor>,
    handlers: Handlers,
}

impl Client {
    /// Creates a client talking HTTP to the remote named in `config`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = Arc::new(HttpTransport::new(&config)?);
        Ok(Self::with_transport(config, transport))
    }

    /// Creates a client with a custom transport (for testing).
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let store = Arc::new(Store::new(EventBus::new()));
        let queue = Arc::new(PendingQueue::new());
        let connectivity = Arc::new(Connectivity::new());
        let forwarder = Arc::new(Forwarder::new(
            Arc::clone(&store),
            Arc::clone(&queue),
            Arc::clone(&transport),
            Arc::clone(&connectivity),
        ));
        let monitor = Arc::new(OfflineMonitor::new(
            Arc::clone(&store),
            Arc::clone(&queue),
            Arc::clone(&forwarder),
            transport,
            Arc::clone(&connectivity),
            config.max_replay_batch,
        ));
        let handlers = Handlers::new(Arc::clone(&store));
        Client {
            config,
            store,
            queue,
            connectivity,
            forwarder,
            monitor,
            handlers,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Validates, handles, and stores one operation.
    ///
    /// Returns the predicted resources. The result is also stored under
    /// `kind:operationId` so it can be read back with [`Client::result_of`].
    ///
    /// The prediction is computed and stored while holding the store's
    /// writer, so concurrent dispatches and arriving remote results never
    /// interleave with it. A read of an uncached tab fails with `NotFound`
    /// but is still forwarded, so the cache is refreshed for the next read.
    pub fn perform(&self, mut operation: Operation) -> Result<Vec<Resource>> {
        operation.validate()?;

        let mut writer = self.store.writer();
        let prediction = match self.handlers.handle(&mut operation) {
            Ok(prediction) => prediction,
            Err(e) if e.is_not_found() && operation.payload.is_read() => {
                drop(writer);
                debug!(operation_id = %operation.operation_id, "nothing cached, forwarding read");
                self.forwarder.spawn(operation, ForwardOptions::new());
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        let data = prediction
            .resources
            .iter()
            .map(Resource::to_value)
            .collect::<tally_core::Result<Vec<_>>>()?;
        debug!(
            operation_id = %operation.operation_id,
            kind = operation.kind(),
            resources = data.len(),
            "performed"
        );
        writer.put(json!({
            "kind": operation.kind(),
            "id": operation.operation_id,
            "data": data,
        }));
        drop(writer);

        self.forwarder.spawn(operation, prediction.options);
        Ok(prediction.resources)
    }

    /// Decodes an operation from its wire form and performs it.
    pub fn perform_json(&self, value: Value) -> Result<Value> {
        let operation = Operation::parse(value)?;
        let resources = self.perform(operation)?;
        Ok(serde_json::to_value(resources)?)
    }

    /// Reads back the stored result of an operation.
    pub fn result_of(&self, kind: &str, operation_id: &str) -> Result<Option<Value>> {
        let record = self.store.get(&Reference::new(kind, operation_id))?;
        Ok(record.and_then(|mut record| record.get_mut("data").map(Value::take)))
    }

    /// Lists cached tabs and refreshes them from the remote.
    pub fn list_tabs(&self) -> Result<Vec<Tab>> {
        let resources = self.perform(Operation::with_new_id(OperationPayload::list_tabs()))?;
        Ok(resources.into_iter().filter_map(into_tab).collect())
    }

    /// Lists cached items of a tab and refreshes them from the remote.
    pub fn list_tab_items(&self, tab: &str) -> Result<Vec<Item>> {
        let resources =
            self.perform(Operation::with_new_id(OperationPayload::list_tab_items(tab)))?;
        Ok(resources.into_iter().filter_map(into_item).collect())
    }

    /// Opens a tab, optionally named.
    pub fn create_tab(&self, name: Option<&str>) -> Result<Tab> {
        let payload = match name {
            Some(name) => OperationPayload::create_named_tab(name),
            None => OperationPayload::create_tab(),
        };
        let resources = self.perform(Operation::with_new_id(payload))?;
        first(resources, into_tab, "created tab")
    }

    /// Adds `quantity` of `product` to a tab, returning the updated tab and new item.
    pub fn add_item_to_tab(&self, tab: &str, quantity: u32, product: Product) -> Result<(Tab, Item)> {
        let resources = self.perform(Operation::with_new_id(
            OperationPayload::add_item_to_tab(tab, quantity, product),
        ))?;
        let tab = first(resources.clone(), into_tab, "updated tab")?;
        let item = first(resources, into_item, "added item")?;
        Ok((tab, item))
    }

    /// Marks an item for removal.
    pub fn remove_item_from_tab(&self, tab: &str, item: &str) -> Result<Item> {
        let resources = self.perform(Operation::with_new_id(
            OperationPayload::remove_item_from_tab(tab, item),
        ))?;
        first(resources, into_item, "removed item")
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn events(&self) -> &EventBus {
        self.store.events()
    }

    /// Registers `listener` for invalidations of `reference`.
    pub fn on_invalidate<F>(&self, reference: Reference, listener: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.events().subscribe(Topic::Invalidate(reference), listener)
    }

    /// Registers `listener` for replay start/finish.
    pub fn on_syncing<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.events().subscribe(Topic::Syncing, listener)
    }

    /// Operations waiting to be replayed.
    pub fn pending(&self) -> Vec<QueueEntry> {
        self.queue.peek_all()
    }

    pub fn is_offline(&self) -> bool {
        self.connectivity.is_offline()
    }

    /// Waits for background forwards to finish.
    pub async fn settle(&self) -> Vec<ForwardOutcome> {
        self.forwarder.settle().await
    }

    /// Records a connectivity observation; see [`OfflineMonitor::report`].
    pub async fn report_connectivity(&self, offline: bool) -> Option<ReplaySummary> {
        self.monitor.report(offline).await
    }

    /// Applies a platform online/offline signal.
    pub async fn set_platform_online(&self, online: bool) -> Option<ReplaySummary> {
        self.monitor.set_platform_online(online).await
    }

    /// Probes the remote once.
    pub async fn check_connectivity(&self) -> Option<ReplaySummary> {
        self.monitor.check().await
    }

    /// Replays the pending queue now.
    pub async fn replay(&self) -> ReplaySummary {
        self.monitor.replay().await
    }

    /// Starts periodic liveness probing at the configured interval.
    pub fn start_monitor(&self) -> MonitorHandle {
        self.monitor.spawn(self.config.probe_interval())
    }
}

fn into_tab(resource: Resource) -> Option<Tab> {
    match resource {
        Resource::Tab(tab) => Some(tab),
        Resource::Item(_) => None,
    }
}

fn into_item(resource: Resource) -> Option<Item> {
    match resource {
        Resource::Item(item) => Some(item),
        Resource::Tab(_) => None,
    }
}

fn first<T>(resources: Vec<Resource>, pick: fn(Resource) -> Option<T>, what: &str) -> Result<T> {
    resources
        .into_iter()
        .find_map(pick)
        .ok_or_else(|| CoreError::NotFound(what.to_string()).into())
}
