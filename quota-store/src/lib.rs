//! External object-store client abstraction and multi-cluster dispatch
//! (§6, §5). This core speaks no wire protocol of its own; it depends only
//! on [`ObjectStore`] and [`ClusterManager`], so tests run entirely against
//! [`InMemoryStore`] / [`StaticClusterManager`] with no network.

mod client;
mod cluster;
mod memory;

pub use client::{ObjectStore, Stored, WatchEvent};
pub use cluster::{ClusterManager, StaticClusterManager};
pub use memory::InMemoryStore;
