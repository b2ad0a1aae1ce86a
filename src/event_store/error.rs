//! Error types for the event store.

use std::fmt::{Display, Formatter};

/// Errors surfaced by write operations on the event container.
///
/// Read paths never produce these: a missing or unreadable container
/// degrades to an empty result instead.
#[derive(Debug, Clone)]
pub enum StoreError {
    /// Filesystem failure while persisting the container.
    Persistence { message: String },
    /// The container or a record could not be encoded as JSON.
    Serialization { message: String },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Persistence { message } => write!(f, "persistence failure: {}", message),
            Self::Serialization { message } => write!(f, "serialization failure: {}", message),
        }
    }
}

impl std::error::Error for StoreError {}
