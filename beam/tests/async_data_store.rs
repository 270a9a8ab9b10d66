// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! End-to-end coverage of the write-back cache: stores never touch the
//! backend synchronously, loads observe a consistent merged view, and
//! head/tail snapshot limits span the buffer/backend boundary.

mod common;

use beam::{
    AsyncDataStore, DataStore, LocalDataStore, Query, Scheduler, SequencedValue, SnapshotLimit,
};
use common::{Entry, IncrementalTimeClient, entry_at};
use pretty_assertions::assert_eq;
use std::sync::Arc;

type TestLocalDataStore = LocalDataStore<String, Entry>;

fn expect_query(
    scheduler: &Scheduler,
    store: &AsyncDataStore<TestLocalDataStore>,
    index: &str,
    limit: SnapshotLimit,
    expected: &[SequencedValue<Entry>],
) {
    let query = Query::new(index.to_string()).with_snapshot_limit(limit);
    let loaded = scheduler.block_on(store.load(&query)).unwrap();
    assert_eq!(loaded, expected);
}

fn stripped(entry: &beam::SequencedIndexedValue<Entry, String>) -> SequencedValue<Entry> {
    SequencedValue::new(entry.value.value, entry.sequence)
}

#[test]
fn store_and_load() {
    let scheduler = Scheduler::with_workers(2).unwrap();
    let store = AsyncDataStore::new(TestLocalDataStore::new(), &scheduler);
    scheduler.block_on(store.open()).unwrap();
    let mut clock = IncrementalTimeClient::new();
    let entry_a = entry_at("hello", 100, clock.get_time(), 5);
    let entry_b = entry_at("hello", 200, clock.get_time(), 6);
    let entry_c = entry_at("hello", 300, clock.get_time(), 7);
    for entry in [&entry_a, &entry_b, &entry_c] {
        store.store(entry.clone()).unwrap();
    }
    let (a, b, c) = (stripped(&entry_a), stripped(&entry_b), stripped(&entry_c));

    expect_query(&scheduler, &store, "hello", SnapshotLimit::Unlimited, &[a, b, c]);
    expect_query(&scheduler, &store, "hello", SnapshotLimit::Head(0), &[]);
    expect_query(&scheduler, &store, "hello", SnapshotLimit::Head(1), &[a]);
    expect_query(&scheduler, &store, "hello", SnapshotLimit::Head(2), &[a, b]);
    expect_query(&scheduler, &store, "hello", SnapshotLimit::Head(3), &[a, b, c]);
    expect_query(&scheduler, &store, "hello", SnapshotLimit::Head(4), &[a, b, c]);
    expect_query(&scheduler, &store, "hello", SnapshotLimit::Tail(0), &[]);
    expect_query(&scheduler, &store, "hello", SnapshotLimit::Tail(1), &[c]);
    expect_query(&scheduler, &store, "hello", SnapshotLimit::Tail(2), &[b, c]);
    expect_query(&scheduler, &store, "hello", SnapshotLimit::Tail(3), &[a, b, c]);
    expect_query(&scheduler, &store, "hello", SnapshotLimit::Tail(4), &[a, b, c]);

    scheduler.block_on(store.close()).unwrap();
}

#[test]
fn head_spanning_load() {
    let scheduler = Scheduler::with_workers(2).unwrap();
    let backend = Arc::new(TestLocalDataStore::new());
    let store = AsyncDataStore::new(Arc::clone(&backend), &scheduler);
    scheduler.block_on(store.open()).unwrap();
    let mut clock = IncrementalTimeClient::new();
    // Sequences 5 and 6 are already persisted; 7 and 8 sit in the buffer.
    let entry_a = entry_at("hello", 100, clock.get_time(), 5);
    let entry_b = entry_at("hello", 101, clock.get_time(), 6);
    scheduler
        .block_on(backend.store(vec![entry_a.clone(), entry_b.clone()]))
        .unwrap();
    let entry_c = entry_at("hello", 102, clock.get_time(), 7);
    let entry_d = entry_at("hello", 103, clock.get_time(), 8);
    store.store(entry_c.clone()).unwrap();
    store.store(entry_d.clone()).unwrap();
    let (a, b, c, d) = (
        stripped(&entry_a),
        stripped(&entry_b),
        stripped(&entry_c),
        stripped(&entry_d),
    );

    expect_query(&scheduler, &store, "hello", SnapshotLimit::Head(1), &[a]);
    expect_query(&scheduler, &store, "hello", SnapshotLimit::Head(2), &[a, b]);
    // Head(3) needs more than the backend holds: the load must keep
    // fetching past the backend's two entries and fill from the buffer.
    expect_query(&scheduler, &store, "hello", SnapshotLimit::Head(3), &[a, b, c]);
    expect_query(&scheduler, &store, "hello", SnapshotLimit::Head(4), &[a, b, c, d]);
    expect_query(&scheduler, &store, "hello", SnapshotLimit::Unlimited, &[a, b, c, d]);

    scheduler.block_on(store.close()).unwrap();
}

#[test]
fn tail_spanning_load() {
    let scheduler = Scheduler::with_workers(2).unwrap();
    let backend = Arc::new(TestLocalDataStore::new());
    let store = AsyncDataStore::new(Arc::clone(&backend), &scheduler);
    scheduler.block_on(store.open()).unwrap();
    let mut clock = IncrementalTimeClient::new();
    let entry_a = entry_at("hello", 100, clock.get_time(), 5);
    let entry_b = entry_at("hello", 101, clock.get_time(), 6);
    scheduler
        .block_on(backend.store(vec![entry_a.clone(), entry_b.clone()]))
        .unwrap();
    let entry_c = entry_at("hello", 102, clock.get_time(), 7);
    let entry_d = entry_at("hello", 103, clock.get_time(), 8);
    store.store(entry_c.clone()).unwrap();
    store.store(entry_d.clone()).unwrap();
    let (a, b, c, d) = (
        stripped(&entry_a),
        stripped(&entry_b),
        stripped(&entry_c),
        stripped(&entry_d),
    );

    expect_query(&scheduler, &store, "hello", SnapshotLimit::Tail(1), &[d]);
    expect_query(&scheduler, &store, "hello", SnapshotLimit::Tail(2), &[c, d]);
    // Tail(3) spans the boundary: two buffered values plus the newest
    // backend entry.
    expect_query(&scheduler, &store, "hello", SnapshotLimit::Tail(3), &[b, c, d]);
    expect_query(&scheduler, &store, "hello", SnapshotLimit::Tail(4), &[a, b, c, d]);

    scheduler.block_on(store.close()).unwrap();
}

#[test]
fn flush_reaches_the_backend_after_quiescence() {
    let scheduler = Scheduler::with_workers(2).unwrap();
    let backend = Arc::new(TestLocalDataStore::new());
    let store: AsyncDataStore<TestLocalDataStore> =
        AsyncDataStore::new(Arc::clone(&backend), &scheduler);
    scheduler.block_on(store.open()).unwrap();
    let mut clock = IncrementalTimeClient::new();
    for sequence in 5..8 {
        store
            .store(entry_at(
                "hello",
                i32::try_from(sequence).unwrap() * 100,
                clock.get_time(),
                sequence,
            ))
            .unwrap();
    }
    scheduler.block_on(store.close()).unwrap();
    assert_eq!(store.pending_count(), 0);
    assert_eq!(backend.len(), 3);
    // The backend alone now answers the same query.
    let loaded = scheduler
        .block_on(backend.load(&Query::new("hello".to_string())))
        .unwrap();
    assert_eq!(
        loaded.iter().map(|entry| entry.value.value).collect::<Vec<_>>(),
        vec![500, 600, 700]
    );
}

#[test]
fn indexes_do_not_interfere() {
    let scheduler = Scheduler::with_workers(2).unwrap();
    let store = AsyncDataStore::new(TestLocalDataStore::new(), &scheduler);
    scheduler.block_on(store.open()).unwrap();
    let mut clock = IncrementalTimeClient::new();
    let hello = entry_at("hello", 1, clock.get_time(), 5);
    let world = entry_at("world", 2, clock.get_time(), 5);
    store.store(hello.clone()).unwrap();
    store.store(world.clone()).unwrap();
    expect_query(
        &scheduler,
        &store,
        "hello",
        SnapshotLimit::Unlimited,
        &[stripped(&hello)],
    );
    expect_query(
        &scheduler,
        &store,
        "world",
        SnapshotLimit::Unlimited,
        &[stripped(&world)],
    );
    scheduler.block_on(store.close()).unwrap();
}
