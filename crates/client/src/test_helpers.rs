// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for client tests.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use serde_json::{json, Value};
use tally_core::{Operation, OperationPayload, Product};

use crate::forward::Forwarder;
use crate::offline::{Connectivity, OfflineMonitor};
use crate::queue::PendingQueue;
use crate::store::Store;
use crate::transport_tests::MockTransport;

/// A list-tabs operation with a fixed id.
pub fn make_test_op(n: u32) -> Operation {
    Operation::new(format!("op-{}", n), OperationPayload::list_tabs())
}

/// A create-tab operation for `tab`.
pub fn create_tab_op(tab: &str) -> Operation {
    Operation::new(
        format!("create-{}", tab),
        OperationPayload::CreateTab {
            id: Some(tab.to_string()),
            name: None,
        },
    )
}

/// An add-item operation for `tab`.
pub fn add_item_op(tab: &str, quantity: u32, name: &str, price: f64) -> Operation {
    Operation::with_new_id(OperationPayload::add_item_to_tab(
        tab,
        quantity,
        Product::new(name, price),
    ))
}

/// A remote tab record as the server would return it.
pub fn remote_tab(id: &str, status: &str) -> Value {
    json!({
        "kind": "Tab",
        "id": id,
        "name": format!("Tab {}", id),
        "balanceDue": 0.0,
        "status": status,
        "isPaid": false,
        "items": [],
        "createdAt": 1_700_000_000_000_i64
    })
}

/// Collaborators wired around a mock transport.
pub struct Harness {
    pub store: Arc<Store>,
    pub queue: Arc<PendingQueue>,
    pub connectivity: Arc<Connectivity>,
    pub transport: Arc<MockTransport>,
    pub forwarder: Arc<Forwarder>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_transport(MockTransport::new())
    }

    pub fn with_transport(transport: MockTransport) -> Self {
        let store = Arc::new(Store::default());
        let queue = Arc::new(PendingQueue::new());
        let connectivity = Arc::new(Connectivity::new());
        let transport = Arc::new(transport);
        let forwarder = Arc::new(Forwarder::new(
            Arc::clone(&store),
            Arc::clone(&queue),
            transport.clone(),
            Arc::clone(&connectivity),
        ));
        Harness {
            store,
            queue,
            connectivity,
            transport,
            forwarder,
        }
    }

    /// An offline monitor over the same collaborators.
    pub fn monitor(&self, max_replay_batch: usize) -> Arc<OfflineMonitor> {
        Arc::new(OfflineMonitor::new(
            Arc::clone(&self.store),
            Arc::clone(&self.queue),
            Arc::clone(&self.forwarder),
            self.transport.clone(),
            Arc::clone(&self.connectivity),
            max_replay_batch,
        ))
    }
}
