//! Error types for the upstream text fetcher.

use std::time::Duration;

/// A failed upstream fetch.
///
/// `Clone` so a single failed load can be handed to every waiter of a
/// shared in-flight request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("timed out after {after:?} fetching {url}")]
    Timeout { url: String, after: Duration },
    #[error("upstream returned {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },
}

impl FetchError {
    /// Whether retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Network { .. } => true,
            Self::Status { status, .. } => matches!(status, 408 | 429 | 500..=599),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
