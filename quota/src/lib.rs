//! Facade crate wiring the resource-type registry, validators, the
//! pure reconcilers, the bucket/summary aggregator, and the policy
//! auto-creation controller into a single importable surface.
//!
//! Every sub-crate under `quota-*` is re-exported as a public module, so a
//! consumer can either depend on `quota` alone or pick individual
//! sub-crates directly — both resolve to the same types. [`runtime`] is the
//! one piece of glue this crate adds on top of the sub-crates: it drives
//! `quota-policy`'s render/compile output against a real [`quota_store::ObjectStore`].

pub mod runtime;
mod tracing_setup;

pub use quota_aggregate;
pub use quota_core;
pub use quota_events;
pub use quota_expr;
pub use quota_policy;
pub use quota_reconcile;
pub use quota_registry;
pub use quota_store;
pub use quota_template;
pub use quota_validate;

pub use tracing_setup::{init_tracing, LogFormat};

/// Re-exports the pieces most consumers touch, so `use quota::prelude::*`
/// is enough to implement a reconcile loop against this core.
pub mod prelude {
    pub use quota_aggregate::{
        aggregate_summary, bucket_name, current_allocated, decide as decide_bucket_verdict, summary_name,
        total_limit, BucketNamespaceResolver, ClaimRequestView, DefaultBucketNamespaceResolver, Verdict,
    };
    pub use quota_core::condition::{Condition, ConditionStatus, Conditions};
    pub use quota_core::config::Config;
    pub use quota_core::error::{QuotaError, Result as QuotaResult};
    pub use quota_core::model::*;
    pub use quota_core::types::{GroupKind, LabelSelector, ObjectKey, ObjectRef};
    pub use quota_events::{DynamicInformerManager, Requester, TriggerEvent, TriggerObject, TriggerSource};
    pub use quota_policy::{
        claim_context, grant_context, reconcile_claim_policy, reconcile_grant_policy, ChildRef, CompiledClaimPolicy,
        CompiledGrantPolicy, Materialization, PolicyEntry, RenderedMeta, TriggerPolicyIndex,
    };
    pub use quota_reconcile::{
        reconcile_bucket_for_request, reconcile_claim, reconcile_grant, reconcile_registration, reconcile_summary_for,
        shard_for, SingleFlightQueue, StoredBucket, StoredClaim, StoredGrant, StoredSummary,
    };
    pub use quota_registry::{ClaimAllowedError, ResourceTypeRegistry};
    pub use quota_store::{ClusterManager, InMemoryStore, ObjectStore, StaticClusterManager, Stored, WatchEvent};

    pub use crate::runtime::{apply_materialization, delete_children, handle_claim_trigger_event, handle_grant_trigger_event};
}
