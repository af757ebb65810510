//! Shared types for the quota core.
//!
//! Every reconciler crate (`quota-reconcile`, `quota-aggregate`,
//! `quota-policy`) depends on this crate for its error taxonomy, its
//! status-condition bookkeeping, and the small set of cross-cutting object
//! identifiers (`ObjectRef`, `ObjectKey`, `GroupKind`, `LabelSelector`).

pub mod condition;
pub mod config;
pub mod error;
pub mod model;
pub mod types;

pub use condition::{Condition, ConditionStatus, Conditions};
pub use config::Config;
pub use error::{jittered_backoff, QuotaError, Result};
pub use types::{GroupKind, LabelSelector, ObjectKey, ObjectRef};
