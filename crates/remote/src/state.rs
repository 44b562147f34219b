// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Server state management.
//!
//! Holds the authoritative tabs in memory for thread-safe access.

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::debug;

use tally_core::{
    id, Error, Item, ItemStatus, Operation, OperationPayload, Product, Result, Tab, TabStatus,
};

/// Shared server state containing the authoritative tabs.
#[derive(Clone)]
pub struct ServerState {
    inner: Arc<ServerStateInner>,
}

struct ServerStateInner {
    /// Tabs by id, in creation order.
    tabs: Mutex<IndexMap<String, Tab>>,
    /// Delay applied before handling each operation.
    latency: Duration,
}

impl ServerState {
    /// Creates an empty state.
    pub fn new(latency: Duration) -> Self {
        ServerState {
            inner: Arc::new(ServerStateInner {
                tabs: Mutex::new(IndexMap::new()),
                latency,
            }),
        }
    }

    /// Creates a state holding three open demo tabs, `1` to `3`.
    pub fn seeded(latency: Duration) -> Self {
        let tabs = ["1", "2", "3"]
            .into_iter()
            .map(|id| (id.to_string(), Tab::new(id, Tab::default_name(id), TabStatus::Open)))
            .collect();
        ServerState {
            inner: Arc::new(ServerStateInner {
                tabs: Mutex::new(tabs),
                latency,
            }),
        }
    }

    pub fn latency(&self) -> Duration {
        self.inner.latency
    }

    /// Returns a copy of a tab.
    #[cfg(test)]
    pub async fn tab(&self, id: &str) -> Option<Tab> {
        self.inner.tabs.lock().await.get(id).cloned()
    }

    pub async fn tab_count(&self) -> usize {
        self.inner.tabs.lock().await.len()
    }

    /// Applies an operation, returning its result in wire form.
    ///
    /// Creating operations are idempotent on their ids, so a replayed
    /// operation does not duplicate its tab or item.
    pub async fn apply(&self, operation: &Operation) -> Result<Value> {
        debug!(
            operation_id = %operation.operation_id,
            kind = operation.kind(),
            "apply"
        );
        let mut tabs = self.inner.tabs.lock().await;
        match &operation.payload {
            OperationPayload::ListTabs => to_value(&tabs.values().collect::<Vec<_>>()),
            OperationPayload::ListTabItems { tab } => match tabs.get(tab) {
                Some(tab) => to_value(&tab.items),
                None => Ok(Value::Array(Vec::new())),
            },
            OperationPayload::CreateTab { id, name } => {
                let id = id.clone().unwrap_or_else(id::new_id);
                let tab = tabs.entry(id.clone()).or_insert_with(|| {
                    let name = name.clone().unwrap_or_else(|| Tab::default_name(&id));
                    Tab::new(id.as_str(), name, TabStatus::Open)
                });
                to_value(&[&*tab])
            }
            OperationPayload::AddItemToTab {
                tab,
                id,
                quantity,
                product,
            } => {
                let tab = find_tab(&mut tabs, tab)?;
                add_item(tab, id.clone(), *quantity, product);
                to_value(&[&*tab])
            }
            OperationPayload::RemoveItemFromTab {
                tab,
                item,
                quantity,
            } => {
                let tab = find_tab(&mut tabs, tab)?;
                remove_item(tab, item, *quantity)?;
                to_value(&[&*tab])
            }
        }
    }
}

fn to_value<T: serde::Serialize + ?Sized>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

fn find_tab<'a>(tabs: &'a mut IndexMap<String, Tab>, id: &str) -> Result<&'a mut Tab> {
    tabs.get_mut(id)
        .ok_or_else(|| Error::NotFound(format!("tab {}", id)))
}

fn add_item(tab: &mut Tab, id: Option<String>, quantity: u32, product: &Product) {
    let id = id.unwrap_or_else(id::new_id);
    if tab.item(&id).is_some() {
        return;
    }
    let item = Item::new(
        id,
        product.name.clone(),
        product.price,
        quantity,
        ItemStatus::Active,
    );
    tab.balance_due += item.total();
    tab.items.push(item);
}

/// Takes `quantity` units off an item, the whole line when unset.
/// The item leaves the tab once nothing remains.
fn remove_item(tab: &mut Tab, item_id: &str, quantity: Option<u32>) -> Result<()> {
    let tab_id = tab.id.clone();
    let item = tab
        .item_mut(item_id)
        .ok_or_else(|| Error::NotFound(format!("item {} on tab {}", item_id, tab_id)))?;

    let removed = quantity.unwrap_or(item.quantity).min(item.quantity);
    item.quantity -= removed;
    let credit = f64::from(removed) * item.price;
    let emptied = item.quantity == 0;

    tab.balance_due -= credit;
    if emptied {
        tab.items.retain(|item| item.id != item_id);
    }
    Ok(())
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
