// Copyright (c) 2025 R3BL LLC. Licensed under Apache License, Version 2.0.

//! Time-series query storage: sequenced/indexed value types, the
//! [`DataStore`] backend boundary, and the write-back caches
//! ([`AsyncDataStore`], [`BufferedDataStore`]) that decouple client writes
//! from backend I/O while preserving per-index sequenced ordering.

pub mod async_data_store;
pub mod buffered_data_store;
pub mod data_store;
pub mod local_data_store;
pub mod query;
pub mod range;
mod reservoir;
pub mod sequence;
pub mod snapshot_limit;
pub mod testing;

pub use async_data_store::{AsyncDataStore, FlushPolicy};
pub use buffered_data_store::BufferedDataStore;
pub use data_store::DataStore;
pub use local_data_store::LocalDataStore;
pub use query::Query;
pub use range::{Range, RangeBound};
pub use sequence::{
    IndexedValue, Sequence, SequencedIndexedValue, SequencedValue, Timestamped,
    sequenced_indexed_value,
};
pub use snapshot_limit::SnapshotLimit;
