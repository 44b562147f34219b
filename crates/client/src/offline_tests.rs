// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for connectivity tracking and queue replay.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use tally_core::Reference;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Notify;

use crate::events::{Event, Subscription, Topic};
use crate::forward::ForwardOutcome;
use crate::offline::ReplaySummary;
use crate::queue::ForwardOptions;
use crate::test_helpers::{create_tab_op, make_test_op, remote_tab, Harness};
use crate::transport_tests::MockTransport;

fn drain(rx: &mut UnboundedReceiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn syncing(harness: &Harness) -> (Subscription, UnboundedReceiver<Event>) {
    harness.store.events().subscribe_channel(Topic::Syncing)
}

/// Queues `create_tab_op(tab)` for each tab by forwarding while offline.
async fn queue_offline(harness: &Harness, tabs: &[&str]) {
    harness.connectivity.set_offline(true);
    for tab in tabs {
        let outcome = harness
            .forwarder
            .forward(
                create_tab_op(tab),
                ForwardOptions::invalidating([Reference::all_tabs()]),
            )
            .await;
        assert_eq!(outcome, ForwardOutcome::Queued);
    }
}

#[tokio::test]
async fn first_online_report_replays() {
    let harness = Harness::new();
    let monitor = harness.monitor(0);
    let (_sub, mut rx) = syncing(&harness);

    let summary = monitor.report(false).await;

    assert_eq!(summary, Some(ReplaySummary::default()));
    assert_eq!(drain(&mut rx), vec![Event::Syncing(true), Event::Syncing(false)]);
}

#[tokio::test]
async fn redundant_reports_are_ignored() {
    let harness = Harness::new();
    let monitor = harness.monitor(0);

    assert!(monitor.report(false).await.is_some());
    assert!(monitor.report(false).await.is_none());
    assert!(monitor.report(true).await.is_none());
    assert!(harness.connectivity.is_offline());
    assert!(monitor.report(true).await.is_none());
}

#[tokio::test]
async fn initial_offline_report_sets_flag() {
    let harness = Harness::new();
    let monitor = harness.monitor(0);

    assert!(monitor.report(true).await.is_none());
    assert!(harness.connectivity.is_offline());
}

#[tokio::test]
async fn reconnect_drains_queue_and_applies_results() {
    let harness = Harness::new();
    let monitor = harness.monitor(0);
    monitor.report(true).await;
    queue_offline(&harness, &["1", "2"]).await;
    assert_eq!(harness.queue.len(), 2);
    assert!(harness.store.is_empty());

    let (_sub, mut rx) = syncing(&harness);
    let (_inv, mut invalidations) = harness
        .store
        .events()
        .subscribe_channel(Topic::Invalidate(Reference::all_tabs()));
    harness.transport.accept(remote_tab("1", "OPEN"));
    harness.transport.accept(remote_tab("2", "OPEN"));

    let summary = monitor.report(false).await.unwrap();

    assert_eq!(
        summary,
        ReplaySummary {
            replayed: 2,
            stored: 2,
            remaining: 0,
            interrupted: false,
        }
    );
    assert!(harness.queue.is_empty());
    assert!(!harness.connectivity.is_offline());
    assert_eq!(harness.transport.sent_ids(), vec!["create-1", "create-2"]);
    assert!(harness.store.tab("1").unwrap().is_some());
    assert!(harness.store.tab("2").unwrap().is_some());
    assert_eq!(drain(&mut rx), vec![Event::Syncing(true), Event::Syncing(false)]);
    // Shared target is confirmed once; no optimistic re-emission
    assert_eq!(
        drain(&mut invalidations),
        vec![Event::Invalidated {
            reference: Reference::all_tabs(),
            confirmed: true,
        }]
    );
}

#[tokio::test]
async fn interrupted_replay_keeps_rest_and_goes_offline() {
    let harness = Harness::new();
    let monitor = harness.monitor(0);
    monitor.report(true).await;
    queue_offline(&harness, &["1", "2", "3"]).await;

    harness.transport.accept(remote_tab("1", "OPEN"));
    harness.transport.fail_once();
    let (_sub, mut rx) = syncing(&harness);

    let summary = monitor.report(false).await.unwrap();

    assert_eq!(summary.replayed, 1);
    assert_eq!(summary.remaining, 2);
    assert!(summary.interrupted);
    assert!(harness.connectivity.is_offline());
    assert!(harness.store.tab("1").unwrap().is_some());
    assert_eq!(drain(&mut rx), vec![Event::Syncing(true), Event::Syncing(false)]);

    // Next transition replays the rest
    let summary = monitor.report(false).await.unwrap();
    assert_eq!(summary.replayed, 2);
    assert!(harness.queue.is_empty());
}

#[tokio::test]
async fn rejected_entries_leave_the_queue() {
    let harness = Harness::new();
    let monitor = harness.monitor(0);
    monitor.report(true).await;
    queue_offline(&harness, &["1"]).await;
    harness.transport.reject(404);

    let summary = monitor.report(false).await.unwrap();

    assert_eq!(summary.replayed, 1);
    assert_eq!(summary.stored, 0);
    assert!(harness.queue.is_empty());
}

#[tokio::test]
async fn replay_batch_is_limited() {
    let harness = Harness::new();
    let monitor = harness.monitor(2);
    monitor.report(true).await;
    queue_offline(&harness, &["1", "2", "3"]).await;

    let summary = monitor.report(false).await.unwrap();

    assert_eq!(summary.replayed, 2);
    assert_eq!(summary.remaining, 1);
    assert_eq!(harness.queue.peek_all()[0].operation.operation_id, "create-3");
}

#[tokio::test]
async fn entries_queued_during_replay_survive() {
    let gate = Arc::new(Notify::new());
    let harness = Harness::with_transport(MockTransport::gated(Arc::clone(&gate)));
    let monitor = harness.monitor(0);
    monitor.report(true).await;
    queue_offline(&harness, &["1"]).await;

    let (_sub, mut rx) = syncing(&harness);

    let replaying = {
        let monitor = Arc::clone(&monitor);
        tokio::spawn(async move { monitor.report(false).await })
    };
    // Replay has taken its snapshot and is parked on the gate
    assert_eq!(rx.recv().await, Some(Event::Syncing(true)));
    harness.queue.enqueue(make_test_op(9), ForwardOptions::new());
    gate.notify_one();

    let summary = replaying.await.unwrap().unwrap();

    assert_eq!(summary.replayed, 1);
    assert_eq!(summary.remaining, 1);
    assert_eq!(harness.queue.peek_all()[0].operation.operation_id, "op-9");
}

#[tokio::test]
async fn platform_signal_and_probe_combine() {
    let harness = Harness::new();
    let monitor = harness.monitor(0);
    monitor.report(false).await;

    assert!(monitor.set_platform_online(false).await.is_none());
    assert!(harness.connectivity.is_offline());

    // Platform back, remote still down
    harness.transport.set_unreachable(true);
    assert!(monitor.set_platform_online(true).await.is_none());
    assert!(harness.connectivity.is_offline());

    harness.transport.set_unreachable(false);
    assert!(monitor.check().await.is_some());
    assert!(!harness.connectivity.is_offline());
}

#[tokio::test]
async fn probe_ignored_while_platform_offline() {
    let harness = Harness::new();
    let monitor = harness.monitor(0);
    monitor.report(false).await;
    monitor.set_platform_online(false).await;

    assert!(monitor.check().await.is_none());
    assert!(harness.connectivity.is_offline());
}

#[tokio::test(start_paused = true)]
async fn spawned_monitor_probes_until_dropped() {
    let harness = Harness::new();
    let monitor = harness.monitor(0);
    let (_sub, mut rx) = syncing(&harness);

    let handle = monitor.spawn(Duration::from_secs(1));
    assert_eq!(rx.recv().await, Some(Event::Syncing(true)));
    assert_eq!(rx.recv().await, Some(Event::Syncing(false)));

    harness.transport.set_unreachable(true);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(harness.connectivity.is_offline());

    drop(handle);
    harness.transport.set_unreachable(false);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(harness.connectivity.is_offline());
}
