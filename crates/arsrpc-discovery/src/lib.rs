//! Endpoint discovery for arsrpc clients.
//!
//! A [`Watcher`] follows one directory path on a coordination service and
//! turns each change of its children into a batch of [`EndpointUpdate`]s.
//! The directory itself sits behind the [`DirectoryClient`] trait;
//! [`MemoryDirectory`] is an in-process implementation.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use arsrpc_discovery::{EndpointSet, MemoryDirectory, Watcher};
//!
//! # #[tokio::main]
//! # async fn main() -> arsrpc_common::Result<()> {
//! let directory = MemoryDirectory::new();
//! directory.set_children("/services/orders", ["10.0.0.1:9000"]);
//!
//! let watcher = Watcher::new(Arc::new(directory.clone()), "/services/orders");
//! let mut endpoints = EndpointSet::new();
//! loop {
//!     let updates = watcher.next().await?;
//!     endpoints.apply(&updates);
//! }
//! # }
//! ```

pub mod diff;
pub mod directory;
pub mod endpoint_set;
pub mod update;
pub mod watcher;

pub use diff::{diff, normalize};
pub use directory::{DirectoryClient, MemoryDirectory};
pub use endpoint_set::EndpointSet;
pub use update::{EndpointUpdate, Operation};
pub use watcher::Watcher;
