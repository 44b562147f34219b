// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Operation handlers.
//!
//! Each handler predicts the effect of an operation from the cache and says
//! how the operation should be forwarded. Handlers never wait on the remote;
//! the dispatcher stores the prediction and only then starts forwarding, so
//! an authoritative result can never be overwritten by its own prediction.

use std::sync::Arc;

use tally_core::{
    Error as CoreError, Item, ItemStatus, Operation, OperationPayload, Product, Reference,
    Resource, Tab, TabStatus,
};
use tracing::debug;

use crate::error::Result;
use crate::queue::ForwardOptions;
use crate::store::Store;

/// Predicted outcome of an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Resources as the remote is expected to leave them.
    pub resources: Vec<Resource>,
    /// How to forward the operation.
    pub options: ForwardOptions,
}

impl Prediction {
    fn new(resources: Vec<Resource>, options: ForwardOptions) -> Self {
        Prediction { resources, options }
    }
}

/// Routes operations to their handler.
#[derive(Debug, Clone)]
pub struct Handlers {
    store: Arc<Store>,
}

impl Handlers {
    pub fn new(store: Arc<Store>) -> Self {
        Handlers { store }
    }

    /// Runs the handler for the operation's kind.
    ///
    /// Ids missing from creating operations are assigned into `operation`,
    /// so the remote sees the same ids as the prediction.
    pub fn handle(&self, operation: &mut Operation) -> Result<Prediction> {
        let assigned = operation.payload.assign_id().unwrap_or_default();
        debug!(
            operation_id = %operation.operation_id,
            kind = operation.kind(),
            "handle"
        );
        match &operation.payload {
            OperationPayload::ListTabs => self.list_tabs(),
            OperationPayload::ListTabItems { tab } => self.list_tab_items(tab),
            OperationPayload::CreateTab { name, .. } => Ok(self.create_tab(assigned, name.clone())),
            OperationPayload::AddItemToTab {
                tab,
                quantity,
                product,
                ..
            } => self.add_item_to_tab(tab, assigned, *quantity, product),
            OperationPayload::RemoveItemFromTab {
                tab,
                item,
                quantity,
            } => self.remove_item_from_tab(tab, item, *quantity),
        }
    }

    fn list_tabs(&self) -> Result<Prediction> {
        let tabs = self.store.tabs()?;
        Ok(Prediction::new(
            tabs.into_iter().map(Resource::Tab).collect(),
            ForwardOptions::new(),
        ))
    }

    fn list_tab_items(&self, tab_id: &str) -> Result<Prediction> {
        let items = self.require_tab(tab_id)?.items;
        Ok(Prediction::new(
            items.into_iter().map(Resource::Item).collect(),
            ForwardOptions::new(),
        ))
    }

    fn create_tab(&self, id: String, name: Option<String>) -> Prediction {
        let name = name.unwrap_or_else(|| Tab::default_name(&id));
        let tab = Tab::new(id, name, TabStatus::Pending);
        Prediction::new(
            vec![Resource::Tab(tab)],
            ForwardOptions::invalidating([Reference::all_tabs()]),
        )
    }

    fn add_item_to_tab(
        &self,
        tab_id: &str,
        id: String,
        quantity: u32,
        product: &Product,
    ) -> Result<Prediction> {
        let mut tab = self.require_tab(tab_id)?;
        let item = Item::new(
            id,
            product.name.clone(),
            product.price,
            quantity,
            ItemStatus::Pending,
        );
        tab.balance_due += item.total();
        tab.items.push(item.clone());

        Ok(Prediction::new(
            vec![Resource::Tab(tab), Resource::Item(item)],
            ForwardOptions::invalidating([Reference::tab_items(tab_id)]),
        ))
    }

    fn remove_item_from_tab(
        &self,
        tab_id: &str,
        item_id: &str,
        quantity: Option<u32>,
    ) -> Result<Prediction> {
        let mut tab = self.require_tab(tab_id)?;
        let item = tab
            .item_mut(item_id)
            .ok_or_else(|| CoreError::NotFound(format!("item {} on tab {}", item_id, tab_id)))?;
        let options = ForwardOptions::invalidating([Reference::tab_items(tab_id)]);

        match quantity {
            Some(quantity) if quantity < item.quantity => {
                // Partial removal keeps the line
                item.quantity -= quantity;
                let item = item.clone();
                tab.balance_due -= f64::from(quantity) * item.price;
                Ok(Prediction::new(
                    vec![Resource::Tab(tab), Resource::Item(item)],
                    options,
                ))
            }
            _ => {
                // Soft removal; the remote decides the final outcome
                item.status = ItemStatus::Removing;
                Ok(Prediction::new(vec![Resource::Item(item.clone())], options))
            }
        }
    }

    fn require_tab(&self, tab_id: &str) -> Result<Tab> {
        self.store
            .tab(tab_id)?
            .ok_or_else(|| CoreError::NotFound(format!("tab {}", tab_id)).into())
    }
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
