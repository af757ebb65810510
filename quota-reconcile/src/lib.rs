//! Per-key single-flight work queue and the status reconcilers for
//! Registration, Grant, Claim, Bucket, and Summary objects (§5, §4.E,
//! §4.F, §4.G, §4.H, §4.I).
//!
//! The Registration/Grant/Claim reconcilers are pure functions over an
//! already-loaded spec, status, and registry snapshot: each decides what
//! the new condition set should be, and, for the grant reconciler, which
//! buckets need pre-creating. The bucket and summary reconcilers are the
//! storage-wired layer those pure functions' doc comments point to: they
//! load what `quota-aggregate`'s verdict rule and totals need from an
//! [`quota_store::ObjectStore`], run the pure arithmetic, and write the
//! result back under optimistic-concurrency retry.

mod bucket;
mod claim;
mod grant;
mod queue;
mod registration;
mod summary;

pub use bucket::{reconcile_bucket_for_request, StoredBucket, StoredClaim, StoredGrant, Verdict};
pub use claim::reconcile as reconcile_claim;
pub use grant::{reconcile as reconcile_grant, GrantReconcileOutcome};
pub use queue::{shard_for, SingleFlightQueue};
pub use registration::reconcile as reconcile_registration;
pub use summary::{reconcile_summary_for, StoredSummary};
