//! Durable store for inbound GitHub webhook events.
//!
//! A single JSON container file holds every event as received, plus a
//! store-assigned `createdAt` timestamp. The store stays schema-less;
//! typed projection happens at the query-engine boundary.

pub mod error;
pub mod file_store;

pub use error::StoreError;
pub use file_store::{ContainerStatus, FileEventStore};
