// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory resource store.
//!
//! Resources are normalized on write and hydrated on read. Writers and
//! readers never share memory with the store: `put` takes ownership of the
//! incoming graph and `get` returns a freshly built value.

use std::sync::{Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tally_core::normalize::{self, Record};
use tally_core::resource::KIND_TAB;
use tally_core::{Reference, Resource, Tab};
use tracing::debug;

use crate::error::Result;
use crate::events::{Event, EventBus, Subscription, Topic};

/// Reference-keyed cache of normalized resources.
#[derive(Debug)]
pub struct Store {
    records: Mutex<IndexMap<Reference, Record>>,
    writer: Mutex<()>,
    bus: EventBus,
}

impl Store {
    /// Creates an empty store publishing on `bus`.
    pub fn new(bus: EventBus) -> Self {
        Store {
            records: Mutex::new(IndexMap::new()),
            writer: Mutex::new(()),
            bus,
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.bus
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<Reference, Record>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores one resource or an array of resources.
    ///
    /// Nested resources are flattened into their own entries, overwriting any
    /// previous snapshot. An update event fires for every written reference,
    /// in write order, once all writes are done. Non-resource values are
    /// ignored. Always returns true.
    pub fn put(&self, resources: Value) -> bool {
        self.writer().put(resources)
    }

    /// Takes the store's single writer slot.
    ///
    /// Writes made through other writers wait until the returned guard is
    /// dropped, so a read-modify-write done while holding it is atomic.
    /// Update events for its writes fire on drop, after the slot is released.
    pub fn writer(&self) -> StoreWriter<'_> {
        StoreWriter {
            store: self,
            slot: Some(self.writer.lock().unwrap_or_else(PoisonError::into_inner)),
            written: Vec::new(),
        }
    }

    /// Stores typed resources.
    pub fn put_resources<I>(&self, resources: I) -> Result<bool>
    where
        I: IntoIterator<Item = Resource>,
    {
        let values = resources
            .into_iter()
            .map(|resource| resource.to_value())
            .collect::<tally_core::Result<Vec<_>>>()?;
        Ok(self.put(Value::Array(values)))
    }

    /// Reads a hydrated copy of the resource at `reference`.
    pub fn get(&self, reference: &Reference) -> Result<Option<Value>> {
        debug!(reference = %reference, "retrieve");
        let store = self.lock();
        Ok(normalize::hydrate(reference, |r| store.get(r).cloned())?)
    }

    /// Reads and decodes the resource at `reference`.
    pub fn get_as<T: DeserializeOwned>(&self, reference: &Reference) -> Result<Option<T>> {
        match self.get(reference)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Reads a cached tab with its items.
    pub fn tab(&self, id: &str) -> Result<Option<Tab>> {
        self.get_as(&Reference::tab(id))
    }

    /// Hydrated copies of every cached resource of `kind`, in first-write order.
    pub fn list_kind(&self, kind: &str) -> Result<Vec<Value>> {
        let store = self.lock();
        let mut values = Vec::new();
        for reference in store.keys().filter(|r| r.kind() == kind) {
            if let Some(value) = normalize::hydrate(reference, |r| store.get(r).cloned())? {
                values.push(value);
            }
        }
        Ok(values)
    }

    /// Every cached tab.
    pub fn tabs(&self) -> Result<Vec<Tab>> {
        self.list_kind(KIND_TAB)?
            .into_iter()
            .map(|value| Ok(serde_json::from_value(value)?))
            .collect()
    }

    pub fn contains(&self, reference: &Reference) -> bool {
        self.lock().contains_key(reference)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Registers `listener` for writes to `reference`.
    pub fn subscribe<F>(&self, reference: Reference, listener: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.bus.subscribe(Topic::Resource(reference), listener)
    }
}

/// Exclusive write access to a [`Store`], see [`Store::writer`].
pub struct StoreWriter<'a> {
    store: &'a Store,
    slot: Option<MutexGuard<'a, ()>>,
    written: Vec<Reference>,
}

impl StoreWriter<'_> {
    /// Writes like [`Store::put`], deferring update events to drop.
    pub fn put(&mut self, resources: Value) -> bool {
        let values = match resources {
            Value::Array(values) => values,
            value => vec![value],
        };
        let records = normalize::flatten(values);

        let mut store = self.store.lock();
        for (reference, record) in records {
            debug!(reference = %reference, "store");
            store.insert(reference.clone(), record);
            self.written.push(reference);
        }
        true
    }
}

impl Drop for StoreWriter<'_> {
    fn drop(&mut self) {
        // Listeners may write, so release the slot first
        self.slot.take();
        for reference in self.written.drain(..) {
            self.store.bus.emit(Event::Updated(reference));
        }
    }
}

impl std::fmt::Debug for StoreWriter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreWriter")
            .field("written", &self.written)
            .finish()
    }
}

impl Default for Store {
    fn default() -> Self {
        Store::new(EventBus::new())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
