// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tally_core::{Item, ItemStatus, TabStatus};

fn tab_with_items() -> Value {
    json!({
        "kind": "Tab",
        "id": "1",
        "name": "Tab 1",
        "balanceDue": 6.0,
        "status": "OPEN",
        "isPaid": false,
        "items": [
            {"kind": "Item", "id": "a", "name": "Coffee", "price": 3.0, "quantity": 2, "status": "ACTIVE", "createdAt": 1},
        ],
        "createdAt": 1
    })
}

fn record_updates(store: &Store, references: &[Reference]) -> (Vec<Subscription>, Arc<Mutex<Vec<String>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let subs = references
        .iter()
        .map(|reference| {
            let seen = Arc::clone(&seen);
            store.subscribe(reference.clone(), move |event| {
                if let Event::Updated(r) = event {
                    seen.lock().unwrap().push(r.to_string());
                }
            })
        })
        .collect();
    (subs, seen)
}

#[test]
fn put_normalizes_embedded_resources() {
    let store = Store::default();
    assert!(store.put(tab_with_items()));

    assert_eq!(store.len(), 2);
    assert!(store.contains(&Reference::tab("1")));
    assert!(store.contains(&Reference::item("a")));
}

#[test]
fn get_hydrates_embedded_resources() {
    let store = Store::default();
    store.put(tab_with_items());

    assert_eq!(store.get(&Reference::tab("1")).unwrap(), Some(tab_with_items()));
}

#[test]
fn get_missing_is_none() {
    let store = Store::default();
    assert_eq!(store.get(&Reference::tab("nope")).unwrap(), None);
}

#[test]
fn child_updates_are_visible_through_parent() {
    let store = Store::default();
    store.put(tab_with_items());
    store.put(json!({"kind": "Item", "id": "a", "name": "Coffee", "price": 3.0, "quantity": 2, "status": "REMOVING", "createdAt": 1}));

    let tab = store.tab("1").unwrap().unwrap();
    assert_eq!(tab.items[0].status, ItemStatus::Removing);
}

#[test]
fn reads_are_isolated_from_the_store() {
    let store = Store::default();
    store.put(tab_with_items());

    let mut first = store.get(&Reference::tab("1")).unwrap().unwrap();
    first["name"] = json!("mutated");
    first["items"][0]["quantity"] = json!(99);

    assert_eq!(store.get(&Reference::tab("1")).unwrap(), Some(tab_with_items()));
}

#[test]
fn writes_are_isolated_from_the_caller() {
    let store = Store::default();
    let mut value = tab_with_items();
    store.put(value.clone());
    value["name"] = json!("mutated");

    let stored = store.get(&Reference::tab("1")).unwrap().unwrap();
    assert_eq!(stored["name"], "Tab 1");
}

#[test]
fn update_events_fire_in_write_order() {
    let store = Store::default();
    let (_subs, seen) = record_updates(&store, &[Reference::item("a"), Reference::tab("1")]);

    store.put(tab_with_items());

    assert_eq!(*seen.lock().unwrap(), vec!["Tab:1", "Item:a"]);
}

#[test]
fn listeners_observe_completed_writes() {
    let store = Arc::new(Store::default());
    let observed = Arc::new(Mutex::new(None));
    let reader = Arc::clone(&store);
    let sink = Arc::clone(&observed);
    let _sub = store.subscribe(Reference::tab("1"), move |_| {
        // The item is written after the tab; it must already be visible.
        *sink.lock().unwrap() = Some(reader.contains(&Reference::item("a")));
    });

    store.put(tab_with_items());
    assert_eq!(*observed.lock().unwrap(), Some(true));
}

#[test]
fn storing_identical_content_is_idempotent_but_notifies() {
    let store = Store::default();
    let (_subs, seen) = record_updates(&store, &[Reference::tab("1")]);

    store.put(tab_with_items());
    let before = store.get(&Reference::tab("1")).unwrap();
    store.put(tab_with_items());

    assert_eq!(store.get(&Reference::tab("1")).unwrap(), before);
    assert_eq!(store.len(), 2);
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[test]
fn last_write_wins() {
    let store = Store::default();
    store.put(json!({"kind": "Tab", "id": "1", "name": "first"}));
    store.put(json!({"kind": "Tab", "id": "1", "name": "second"}));

    let stored = store.get(&Reference::tab("1")).unwrap().unwrap();
    assert_eq!(stored["name"], "second");
}

#[test]
fn non_resources_are_ignored() {
    let store = Store::default();
    assert!(store.put(json!([{"name": "no identity"}, 3, null])));
    assert!(store.is_empty());
}

#[test]
fn put_resources_stores_typed_values() {
    let store = Store::default();
    let mut tab = Tab::new("7", "Patio", TabStatus::Open);
    tab.items.push(Item::new("x", "Tea", 2.0, 1, ItemStatus::Active));

    store.put_resources([Resource::from(tab.clone())]).unwrap();

    assert_eq!(store.tab("7").unwrap(), Some(tab));
    assert!(store.contains(&Reference::item("x")));
}

#[test]
fn list_kind_filters_and_keeps_first_write_order() {
    let store = Store::default();
    store.put(json!({"kind": "Tab", "id": "2", "name": "two"}));
    store.put(tab_with_items());
    store.put(json!({"kind": "Tab", "id": "2", "name": "two again"}));

    let tabs = store.list_kind("Tab").unwrap();
    let names: Vec<&str> = tabs.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["two again", "Tab 1"]);
    assert_eq!(store.list_kind("Item").unwrap().len(), 1);
}

#[test]
fn cyclic_graph_fails_to_hydrate() {
    let store = Store::default();
    store.put(json!({"kind": "A", "id": "1", "next": "ref:B:1"}));
    store.put(json!({"kind": "B", "id": "1", "next": "ref:A:1"}));

    let err = store.get(&Reference::new("A", "1")).unwrap_err();
    assert!(err.to_string().contains("cyclic reference"));
}

#[test]
fn writer_holds_off_other_writes_until_dropped() {
    let store = Arc::new(Store::default());
    let mut writer = store.writer();
    writer.put(json!({"kind": "Tab", "id": "1"}));

    let (done_tx, done_rx) = std::sync::mpsc::channel();
    let other = {
        let store = Arc::clone(&store);
        std::thread::spawn(move || {
            store.put(json!({"kind": "Tab", "id": "2"}));
            done_tx.send(()).unwrap();
        })
    };

    assert!(done_rx
        .recv_timeout(std::time::Duration::from_millis(100))
        .is_err());
    assert!(!store.contains(&Reference::tab("2")));

    drop(writer);
    other.join().unwrap();
    assert!(store.contains(&Reference::tab("2")));
}

#[test]
fn writer_defers_update_events_to_drop() {
    let store = Store::default();
    let (_subs, seen) = record_updates(&store, &[Reference::tab("1")]);

    let mut writer = store.writer();
    writer.put(json!({"kind": "Tab", "id": "1"}));
    assert!(seen.lock().unwrap().is_empty());
    assert!(store.contains(&Reference::tab("1")));

    drop(writer);
    assert_eq!(seen.lock().unwrap().len(), 1);
}
