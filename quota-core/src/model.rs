//! The domain entities of §3: the typed specs that validators, reconcilers,
//! and the template renderer operate on. Storage representation (how these
//! map onto an actual object store's wire format) is left to `quota-store`;
//! this module only fixes the shape every other crate agrees on.

use crate::types::{GroupKind, LabelSelector, ObjectRef};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `ResourceRegistration.spec` (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRegistrationSpec {
    pub resource_type: String,
    pub consumer_type: GroupKind,
    pub claiming_resources: Vec<GroupKind>,
}

/// One `{amount, dimensionSelector}` entry of an allowance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketAllowance {
    pub amount: i64,
    pub dimension_selector: LabelSelector,
}

/// `{resourceType, buckets}` within a Grant's `allowances`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allowance {
    pub resource_type: String,
    pub buckets: Vec<BucketAllowance>,
}

/// `ResourceGrant.spec` (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceGrantSpec {
    pub consumer_ref: ObjectRef,
    pub allowances: Vec<Allowance>,
}

/// One entry of a claim's `requests` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequest {
    pub resource_type: String,
    pub amount: i64,
    pub dimensions: BTreeMap<String, String>,
}

/// `ResourceClaim.spec` (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceClaimSpec {
    pub consumer_ref: ObjectRef,
    pub resource_ref: ObjectRef,
    pub requests: Vec<ResourceRequest>,
}

/// Per-request allocation verdict, keyed by `resourceType` in
/// `claim.status.allocations`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationStatus {
    Pending,
    Granted,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub resource_type: String,
    pub status: AllocationStatus,
}

/// `AllowanceBucket.spec`/`status` identity fields (§3); the counter fields
/// (`allocated`, `contributingClaimRefs`) live in `quota-aggregate` since
/// they are derived and mutated only by the bucket aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketIdentity {
    pub consumer_ref: ObjectRef,
    pub resource_type: String,
    pub dimensions: BTreeMap<String, String>,
}

/// An object-meta template: every field may be a literal or a mixed
/// literal/expression template string (§4.C). `name` and `generate_name`
/// are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ObjectMetaTemplate {
    pub name: Option<String>,
    pub generate_name: Option<String>,
    pub namespace: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

/// A templated `{apiGroup, kind, name}` reference; `api_group`/`kind` are
/// always literal (they select a registration, not a runtime value), `name`
/// may be templated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRefTemplate {
    pub api_group: String,
    pub kind: String,
    pub name: String,
}

/// A templated request entry; `resource_type` and `amount` are literal,
/// dimension values may be templated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestTemplate {
    pub resource_type: String,
    pub amount: i64,
    pub dimensions: BTreeMap<String, String>,
}

/// `ClaimCreationPolicy.spec.target` (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimTemplate {
    pub metadata: ObjectMetaTemplate,
    pub consumer_ref: ObjectRefTemplate,
    pub resource_ref: ObjectRefTemplate,
    pub requests: Vec<RequestTemplate>,
}

/// A templated bucket allowance; `amount` is literal, `dimension_selector`
/// values may be templated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketAllowanceTemplate {
    pub amount: i64,
    pub dimension_selector: BTreeMap<String, String>,
}

/// A templated allowance; `resource_type` is literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllowanceTemplate {
    pub resource_type: String,
    pub buckets: Vec<BucketAllowanceTemplate>,
}

/// `GrantCreationPolicy.spec.target` (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantTemplate {
    pub metadata: ObjectMetaTemplate,
    pub consumer_ref: ObjectRefTemplate,
    pub allowances: Vec<AllowanceTemplate>,
}

/// `{apiGroup, kind, conditions}` — what a policy watches for and gates on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyTrigger {
    pub api_group: String,
    pub kind: String,
    pub conditions: Vec<String>,
}

/// `ClaimCreationPolicy.spec` (§3, §4.J).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimCreationPolicySpec {
    pub trigger: PolicyTrigger,
    pub target: ClaimTemplate,
}

/// `GrantCreationPolicy.spec` (§3, §4.J).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrantCreationPolicySpec {
    pub trigger: PolicyTrigger,
    pub target: GrantTemplate,
}

/// Free variables permitted in a claim-policy template (§3).
pub const CLAIM_POLICY_VARS: &[&str] = &["trigger", "user", "requestInfo"];
/// Free variables permitted in a grant-policy template (§3): grants have no
/// admission-time requester, so only `trigger` is in scope.
pub const GRANT_POLICY_VARS: &[&str] = &["trigger"];
