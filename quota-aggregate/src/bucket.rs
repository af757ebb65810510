use quota_core::model::Allowance;
use quota_core::ObjectRef;
use std::collections::BTreeMap;

/// The slice of an Active grant the verdict rule needs: its consumer and
/// its allowances. `quota-reconcile` projects this from the full
/// `ResourceGrant` it loaded from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct GrantView {
    pub consumer_ref: ObjectRef,
    pub allowances: Vec<Allowance>,
}

/// The slice of a claim's request the verdict rule needs, plus whether it
/// currently holds a Granted verdict (so it can be summed into
/// `currentAllocated` for every *other* request targeting the same
/// bucket).
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimRequestView {
    pub claim_name: String,
    pub resource_type: String,
    pub amount: i64,
    pub dimensions: BTreeMap<String, String>,
    pub currently_granted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Granted,
    Denied { reason: String },
}

/// One claim's recorded contribution to a bucket's `allocated` counter
/// (§3 AllowanceBucket.status.contributingClaimRefs).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributingClaimRef {
    pub name: String,
    pub generation: i64,
}

/// `AllowanceBucket.status` (§3, §4.H step 5): the derived counter the
/// bucket aggregator owns exclusively.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BucketStatus {
    pub allocated: i64,
    pub contributing_claim_refs: Vec<ContributingClaimRef>,
}

/// Folds a freshly-decided verdict for `(claim_name, generation)` into a
/// bucket's status (§4.H step 5).
///
/// A Granted verdict adds `request_amount` to `allocated` and records the
/// claim (a claim that was already recorded only has its generation
/// refreshed, since its amount is already counted). A Denied verdict
/// drops any stale entry for this claim and subtracts its prior
/// contribution — this only fires for a claim that had previously
/// contributed and whose grant has since shrunk, per §4.H's state
/// machine; an ordinary first-time denial never had an entry to remove.
pub fn apply_verdict(status: &mut BucketStatus, claim_name: &str, generation: i64, request_amount: i64, verdict: &Verdict) {
    let existing = status.contributing_claim_refs.iter().position(|r| r.name == claim_name);
    match (verdict, existing) {
        (Verdict::Granted, None) => {
            status.allocated += request_amount;
            status.contributing_claim_refs.push(ContributingClaimRef {
                name: claim_name.to_string(),
                generation,
            });
        }
        (Verdict::Granted, Some(idx)) => {
            status.contributing_claim_refs[idx].generation = generation;
        }
        (Verdict::Denied { .. }, Some(idx)) => {
            status.allocated -= request_amount;
            status.contributing_claim_refs.remove(idx);
        }
        (Verdict::Denied { .. }, None) => {}
    }
}

/// `totalLimit(bucket)` (§4.H step 2): sum of `bucket.amount` across every
/// Active grant matching `consumer_ref`, for every allowance bucket of
/// `resource_type` whose `dimensionSelector` selects `dimensions`.
///
/// `grants` must already be filtered to Active grants in the bucket's
/// namespace; this function only applies the consumer/resource-type/
/// selector filter, since "Active" and "namespace" are storage-layer
/// concerns the reconciler resolves before calling in.
pub fn total_limit(
    consumer_ref: &ObjectRef,
    resource_type: &str,
    dimensions: &BTreeMap<String, String>,
    grants: &[GrantView],
) -> i64 {
    grants
        .iter()
        .filter(|g| &g.consumer_ref == consumer_ref)
        .flat_map(|g| g.allowances.iter())
        .filter(|a| a.resource_type == resource_type)
        .flat_map(|a| a.buckets.iter())
        .filter(|b| b.dimension_selector.selects(dimensions))
        .map(|b| b.amount)
        .sum()
}

/// `currentAllocated(bucket)` (§4.H step 3): sum of `request.amount` for
/// every currently-Granted request matching `(resource_type, dimensions)`,
/// excluding the claim under decision.
///
/// `claim_requests` must already be the single matching request per claim
/// for this bucket's `(resource_type, dimensions)` slice — a claim with
/// several requests contributes at most the one relevant to this bucket.
pub fn current_allocated(excluding_claim: &str, resource_type: &str, dimensions: &BTreeMap<String, String>, claim_requests: &[ClaimRequestView]) -> i64 {
    claim_requests
        .iter()
        .filter(|c| {
            c.currently_granted
                && c.claim_name != excluding_claim
                && c.resource_type == resource_type
                && &c.dimensions == dimensions
        })
        .map(|c| c.amount)
        .sum()
}

/// The verdict rule itself (§4.H step 4): fits iff
/// `current_allocated + request_amount <= total_limit`. A zero `total_limit`
/// (no grant matched at all) still falls out of this inequality and is
/// reported with the spec's "no capacity" wording; any other shortfall is
/// reported with the concrete numbers so the operator can see the margin.
pub fn decide(request_amount: i64, current_allocated: i64, total_limit: i64) -> Verdict {
    if current_allocated + request_amount <= total_limit {
        return Verdict::Granted;
    }
    if total_limit == 0 {
        Verdict::Denied {
            reason: "no capacity".to_string(),
        }
    } else {
        Verdict::Denied {
            reason: format!(
                "insufficient capacity: requested {request_amount}, already allocated {current_allocated}, limit {total_limit}"
            ),
        }
    }
}
