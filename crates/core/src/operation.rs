// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Operations submitted by the client and forwarded to the remote.
//!
//! On the wire an operation is a single record discriminated by `kind`:
//!
//! ```json
//! {"kind": "addItemToTab", "operationId": "3f2a9c1d", "tab": "1",
//!  "quantity": 2, "product": {"name": "Coffee", "price": 3}}
//! ```
//!
//! `shouldForward` is optional and defaults to true.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::id;
use crate::reference::POINTER_PREFIX;

fn default_should_forward() -> bool {
    true
}

fn is_true(b: &bool) -> bool {
    *b
}

/// An operation against the remote resource store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Correlates the operation with its stored result.
    pub operation_id: String,
    /// When false the operation is applied locally only.
    #[serde(default = "default_should_forward", skip_serializing_if = "is_true")]
    pub should_forward: bool,
    /// The kind-specific payload.
    #[serde(flatten)]
    pub payload: OperationPayload,
}

/// A product as named in an add-item request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub price: f64,
}

impl Product {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Product {
            name: name.into(),
            price,
        }
    }
}

/// Kind-specific payload of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum OperationPayload {
    /// List every tab.
    ListTabs,

    /// List the items of one tab.
    ListTabItems { tab: String },

    /// Open a new tab.
    CreateTab {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },

    /// Add `quantity` units of a product to a tab.
    AddItemToTab {
        tab: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        quantity: u32,
        product: Product,
    },

    /// Remove an item from a tab. Without `quantity` the whole line goes.
    RemoveItemFromTab {
        tab: String,
        item: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        quantity: Option<u32>,
    },
}

impl OperationPayload {
    /// Creates a ListTabs payload.
    pub fn list_tabs() -> Self {
        OperationPayload::ListTabs
    }

    /// Creates a ListTabItems payload.
    pub fn list_tab_items(tab: impl Into<String>) -> Self {
        OperationPayload::ListTabItems { tab: tab.into() }
    }

    /// Creates a CreateTab payload with neither id nor name.
    pub fn create_tab() -> Self {
        OperationPayload::CreateTab {
            id: None,
            name: None,
        }
    }

    /// Creates a named CreateTab payload.
    pub fn create_named_tab(name: impl Into<String>) -> Self {
        OperationPayload::CreateTab {
            id: None,
            name: Some(name.into()),
        }
    }

    /// Creates an AddItemToTab payload.
    pub fn add_item_to_tab(tab: impl Into<String>, quantity: u32, product: Product) -> Self {
        OperationPayload::AddItemToTab {
            tab: tab.into(),
            id: None,
            quantity,
            product,
        }
    }

    /// Creates a RemoveItemFromTab payload removing the whole line.
    pub fn remove_item_from_tab(tab: impl Into<String>, item: impl Into<String>) -> Self {
        OperationPayload::RemoveItemFromTab {
            tab: tab.into(),
            item: item.into(),
            quantity: None,
        }
    }

    /// The wire name of this payload's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            OperationPayload::ListTabs => "listTabs",
            OperationPayload::ListTabItems { .. } => "listTabItems",
            OperationPayload::CreateTab { .. } => "createTab",
            OperationPayload::AddItemToTab { .. } => "addItemToTab",
            OperationPayload::RemoveItemFromTab { .. } => "removeItemFromTab",
        }
    }

    /// Returns the tab this payload targets, if any.
    pub fn tab_id(&self) -> Option<&str> {
        match self {
            OperationPayload::ListTabs | OperationPayload::CreateTab { .. } => None,
            OperationPayload::ListTabItems { tab }
            | OperationPayload::AddItemToTab { tab, .. }
            | OperationPayload::RemoveItemFromTab { tab, .. } => Some(tab),
        }
    }

    /// True for payloads that only read collections.
    pub fn is_read(&self) -> bool {
        matches!(
            self,
            OperationPayload::ListTabs | OperationPayload::ListTabItems { .. }
        )
    }

    /// Fills in a generated resource id for creating payloads that lack one.
    ///
    /// Returns the resource id for creating payloads, `None` otherwise.
    pub fn assign_id(&mut self) -> Option<String> {
        match self {
            OperationPayload::CreateTab { id, .. } | OperationPayload::AddItemToTab { id, .. } => {
                Some(id.get_or_insert_with(id::new_id).clone())
            }
            _ => None,
        }
    }
}

impl Operation {
    /// Creates an operation with the given id and payload.
    pub fn new(operation_id: impl Into<String>, payload: OperationPayload) -> Self {
        Operation {
            operation_id: operation_id.into(),
            should_forward: true,
            payload,
        }
    }

    /// Creates an operation with a freshly generated id.
    pub fn with_new_id(payload: OperationPayload) -> Self {
        Operation::new(id::new_id(), payload)
    }

    /// Marks the operation as local-only.
    pub fn local_only(mut self) -> Self {
        self.should_forward = false;
        self
    }

    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }

    /// Decodes and validates an operation from its wire form.
    pub fn parse(value: Value) -> Result<Self> {
        let operation: Operation =
            serde_json::from_value(value).map_err(|e| Error::Validation(e.to_string()))?;
        operation.validate()?;
        Ok(operation)
    }

    /// Checks the constraints the wire shape alone cannot express.
    ///
    /// Text fields must be non-empty and must not look like a `ref:` pointer;
    /// the cache would otherwise resolve them into other records on read.
    pub fn validate(&self) -> Result<()> {
        check_text("operationId", &self.operation_id)?;
        if let Some(tab) = self.payload.tab_id() {
            check_text("tab", tab)?;
        }
        match &self.payload {
            OperationPayload::CreateTab { id, name } => {
                check_optional_text("id", id.as_deref())?;
                check_optional_text("name", name.as_deref())
            }
            OperationPayload::AddItemToTab {
                id,
                quantity,
                product,
                ..
            } => {
                check_optional_text("id", id.as_deref())?;
                if *quantity == 0 {
                    return Err(Error::Validation("quantity must be positive".into()));
                }
                check_text("product name", &product.name)?;
                if !product.price.is_finite() || product.price < 0.0 {
                    return Err(Error::Validation(format!(
                        "invalid product price: {}",
                        product.price
                    )));
                }
                Ok(())
            }
            OperationPayload::RemoveItemFromTab { item, quantity, .. } => {
                check_text("item", item)?;
                if *quantity == Some(0) {
                    return Err(Error::Validation("quantity must be positive".into()));
                }
                Ok(())
            }
            OperationPayload::ListTabs | OperationPayload::ListTabItems { .. } => Ok(()),
        }
    }
}

fn check_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{} must not be empty", field)));
    }
    if value.starts_with(POINTER_PREFIX) {
        return Err(Error::Validation(format!(
            "{} must not start with '{}'",
            field, POINTER_PREFIX
        )));
    }
    Ok(())
}

fn check_optional_text(field: &str, value: Option<&str>) -> Result<()> {
    value.map_or(Ok(()), |value| check_text(field, value))
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;
