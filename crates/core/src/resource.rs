// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Resource types held in the client cache and returned by the remote.
//!
//! Every resource serializes as a record tagged with `kind` and carrying an
//! `id`; together they form its [`Reference`]. Resources only embed resources
//! of other kinds (a tab embeds items, an item embeds nothing), which keeps
//! the normalized graph acyclic.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::reference::Reference;

/// Field carrying the resource kind.
pub const KIND_FIELD: &str = "kind";
/// Field carrying the resource id.
pub const ID_FIELD: &str = "id";

pub const KIND_TAB: &str = "Tab";
pub const KIND_ITEM: &str = "Item";

/// Current time at the millisecond precision resources are stored with.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// Lifecycle status of a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TabStatus {
    /// Accepting items.
    Open,
    /// Settled and closed.
    Closed,
    /// Created locally, not yet confirmed by the remote.
    Pending,
}

impl TabStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TabStatus::Open => "OPEN",
            TabStatus::Closed => "CLOSED",
            TabStatus::Pending => "PENDING",
        }
    }
}

impl fmt::Display for TabStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of an item on a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    /// Confirmed by the remote.
    Active,
    /// Added locally, not yet confirmed.
    Pending,
    /// Removal requested locally; the remote decides the final outcome.
    Removing,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Active => "ACTIVE",
            ItemStatus::Pending => "PENDING",
            ItemStatus::Removing => "REMOVING",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A line on a tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename = "Item", rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
    pub status: ItemStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Item {
    /// Creates an item with the given status, stamped now.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        price: f64,
        quantity: u32,
        status: ItemStatus,
    ) -> Self {
        Item {
            id: id.into(),
            name: name.into(),
            price,
            quantity,
            status,
            created_at: now_millis(),
        }
    }

    /// Line total, `quantity * price`.
    pub fn total(&self) -> f64 {
        f64::from(self.quantity) * self.price
    }

    pub fn reference(&self) -> Reference {
        Reference::item(&self.id)
    }
}

/// A running bill holding items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename = "Tab", rename_all = "camelCase")]
pub struct Tab {
    pub id: String,
    pub name: String,
    pub balance_due: f64,
    pub status: TabStatus,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Tab {
    /// Creates an empty, unpaid tab with the given status, stamped now.
    pub fn new(id: impl Into<String>, name: impl Into<String>, status: TabStatus) -> Self {
        Tab {
            id: id.into(),
            name: name.into(),
            balance_due: 0.0,
            status,
            is_paid: false,
            items: Vec::new(),
            created_at: now_millis(),
        }
    }

    /// The name given to a tab created without one.
    pub fn default_name(id: &str) -> String {
        format!("Tab {}", id)
    }

    pub fn reference(&self) -> Reference {
        Reference::tab(&self.id)
    }

    pub fn item(&self, item_id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn item_mut(&mut self, item_id: &str) -> Option<&mut Item> {
        self.items.iter_mut().find(|item| item.id == item_id)
    }
}

/// Any resource kind known to the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    Tab(Tab),
    Item(Item),
}

impl Resource {
    pub fn kind(&self) -> &'static str {
        match self {
            Resource::Tab(_) => KIND_TAB,
            Resource::Item(_) => KIND_ITEM,
        }
    }

    pub fn reference(&self) -> Reference {
        match self {
            Resource::Tab(tab) => tab.reference(),
            Resource::Item(item) => item.reference(),
        }
    }

    pub fn as_tab(&self) -> Option<&Tab> {
        match self {
            Resource::Tab(tab) => Some(tab),
            Resource::Item(_) => None,
        }
    }

    pub fn as_item(&self) -> Option<&Item> {
        match self {
            Resource::Item(item) => Some(item),
            Resource::Tab(_) => None,
        }
    }

    /// Serializes the resource into its tagged record form.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Decodes a tagged record, dispatching on its `kind` field.
    pub fn from_value(value: Value) -> Result<Self> {
        let kind = value
            .get(KIND_FIELD)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::UnknownKind(String::new()))?;
        match kind.as_str() {
            KIND_TAB => Ok(Resource::Tab(serde_json::from_value(value)?)),
            KIND_ITEM => Ok(Resource::Item(serde_json::from_value(value)?)),
            _ => Err(Error::UnknownKind(kind)),
        }
    }

    /// Decodes a remote result that is either one record or a list of records.
    pub fn many_from_value(value: Value) -> Result<Vec<Self>> {
        match value {
            Value::Array(values) => values.into_iter().map(Resource::from_value).collect(),
            Value::Null => Ok(Vec::new()),
            value => Ok(vec![Resource::from_value(value)?]),
        }
    }
}

impl Serialize for Resource {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Resource::Tab(tab) => tab.serialize(serializer),
            Resource::Item(item) => item.serialize(serializer),
        }
    }
}

impl From<Tab> for Resource {
    fn from(tab: Tab) -> Self {
        Resource::Tab(tab)
    }
}

impl From<Item> for Resource {
    fn from(item: Item) -> Self {
        Resource::Item(item)
    }
}

#[cfg(test)]
#[path = "resource_tests.rs"]
mod tests;
