//! In-memory caches: the refreshable dataset snapshot and the on-demand
//! singleflight page cache.

mod dataset;
mod singleflight;

pub use dataset::{
    DatasetCache, DatasetSource, PartitionView, RefreshOutcome, RefreshStatus, Snapshot,
};
pub use singleflight::SingleFlightCache;
