//! Identifier normalization and fuzzy ranking over in-memory corpora.

mod merge;
mod normalize;
mod rank;

pub use merge::{MAX_RESULTS, interleave, search, split_terms};
pub use normalize::{DEFAULT_MEMO_CAPACITY, Normalizer, normalize};
pub use rank::{rank, similarity};

/// Default similarity threshold for searches that don't specify one.
pub const DEFAULT_THRESHOLD: f64 = 0.5;
