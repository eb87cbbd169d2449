//! Error taxonomy shared by the caches, the catalog and the web layer.

use crate::fetch::FetchError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// Upstream data was reachable but unusable.
    #[error("failed to parse {source_name}: {reason}")]
    Parse { source_name: String, reason: String },
    /// A read arrived before the dataset was populated for the first time.
    #[error("{dataset} is not yet available")]
    NotInitialized { dataset: &'static str },
    /// A partition or axis key outside the static enumeration.
    #[error("invalid {kind} '{value}'")]
    InvalidKey { kind: &'static str, value: String },
    /// A background load panicked or was cancelled.
    #[error("background load failed: {reason}")]
    Task { reason: String },
}

impl From<tokio::task::JoinError> for CoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task {
            reason: err.to_string(),
        }
    }
}

impl CoreError {
    pub(crate) fn parse(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}
