//! Deterministic object naming (§6), the bucket aggregator's verdict rule
//! (§4.H), and the summary aggregator's totals (§4.I) — the arithmetic core
//! of the quota system, deliberately kept free of storage I/O so it can be
//! exercised with plain values. `quota-reconcile` supplies the storage
//! reads/writes and per-bucket serialization around these functions.

pub mod bucket;
pub mod naming;
pub mod summary;

pub use bucket::{apply_verdict, current_allocated, decide, total_limit, BucketStatus, ClaimRequestView, ContributingClaimRef, GrantView as BucketGrantView, Verdict};
pub use naming::{bucket_name, canonical_json, summary_name, BucketNamespaceResolver, DefaultBucketNamespaceResolver};
pub use summary::{aggregate as aggregate_summary, ContributingRef, GrantView as SummaryGrantView, ClaimView, SummaryTotals};
