// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Normalization and hydration of resource graphs.
//!
//! [`flatten`] rewrites a nested graph into flat records whose embedded
//! resources are replaced by `ref:kind:id` pointers. [`hydrate`] is the
//! inverse: it resolves pointers back into embedded records through a lookup.
//!
//! ```text
//! {kind: Tab, id: 1, items: [{kind: Item, id: a}, {kind: Item, id: b}]}
//!   ─flatten→ {kind: Tab, id: 1, items: ["ref:Item:a", "ref:Item:b"]}
//!             {kind: Item, id: a}
//!             {kind: Item, id: b}
//! ```

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::reference::Reference;
use crate::resource::{ID_FIELD, KIND_FIELD};

/// A normalized record: an object whose embedded resources are pointers.
pub type Record = Map<String, Value>;

/// Returns the reference of a value if it is a resource.
///
/// A value is a resource iff it is an object with a non-empty string `kind`
/// and a non-empty string `id`.
pub fn reference_of(value: &Value) -> Option<Reference> {
    let object = value.as_object()?;
    let kind = object.get(KIND_FIELD)?.as_str().filter(|s| !s.is_empty())?;
    let id = object.get(ID_FIELD)?.as_str().filter(|s| !s.is_empty())?;
    Some(Reference::new(kind, id))
}

pub fn is_resource(value: &Value) -> bool {
    reference_of(value).is_some()
}

/// Flattens a list of possibly nested resources into normalized records.
///
/// Traversal is depth-first over an explicit stack, visiting inputs and
/// array elements in order. The first occurrence of a reference wins; later
/// duplicates are dropped. Non-resource inputs are skipped.
pub fn flatten<I>(resources: I) -> Vec<(Reference, Record)>
where
    I: IntoIterator<Item = Value>,
{
    let mut stack: Vec<Value> = resources.into_iter().collect();
    stack.reverse();

    let mut seen = HashSet::new();
    let mut records = Vec::new();

    while let Some(value) = stack.pop() {
        let Some(reference) = reference_of(&value) else {
            continue;
        };
        if !seen.insert(reference.clone()) {
            continue;
        }
        let Value::Object(mut record) = value else {
            continue;
        };

        let mut children = Vec::new();
        for field in record.values_mut() {
            if let Some(child) = reference_of(field) {
                children.push(std::mem::replace(field, Value::String(child.pointer())));
            } else if let Value::Array(elements) = field {
                if !elements.iter().any(is_resource) {
                    continue;
                }
                for element in elements.iter_mut() {
                    if let Some(child) = reference_of(element) {
                        children.push(std::mem::replace(element, Value::String(child.pointer())));
                    }
                }
            }
        }
        stack.extend(children.into_iter().rev());
        records.push((reference, record));
    }

    records
}

/// Resolves `root` and every pointer reachable from it into a nested value.
///
/// `lookup` must return an owned copy of the stored record. Returns `None`
/// when `root` itself is absent; a dangling pointer below the root hydrates
/// to `null`. A pointer that re-enters a record already being hydrated on
/// the current path fails with [`Error::CyclicReference`].
pub fn hydrate<F>(root: &Reference, lookup: F) -> Result<Option<Value>>
where
    F: Fn(&Reference) -> Option<Record>,
{
    let mut path = Vec::new();
    resolve(root, &lookup, &mut path)
}

fn resolve<F>(reference: &Reference, lookup: &F, path: &mut Vec<Reference>) -> Result<Option<Value>>
where
    F: Fn(&Reference) -> Option<Record>,
{
    if path.contains(reference) {
        return Err(Error::CyclicReference(reference.to_string()));
    }
    let Some(mut record) = lookup(reference) else {
        return Ok(None);
    };

    path.push(reference.clone());
    for field in record.values_mut() {
        match field {
            Value::Array(elements) => {
                for element in elements.iter_mut() {
                    resolve_pointer(element, lookup, path)?;
                }
            }
            _ => resolve_pointer(field, lookup, path)?,
        }
    }
    path.pop();

    Ok(Some(Value::Object(record)))
}

fn resolve_pointer<F>(slot: &mut Value, lookup: &F, path: &mut Vec<Reference>) -> Result<()>
where
    F: Fn(&Reference) -> Option<Record>,
{
    let target = match slot {
        Value::String(s) => Reference::from_pointer(s),
        _ => None,
    };
    if let Some(target) = target {
        *slot = resolve(&target, lookup, path)?.unwrap_or(Value::Null);
    }
    Ok(())
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
