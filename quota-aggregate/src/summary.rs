use quota_core::model::Allowance;
use quota_core::ObjectRef;

/// The slice of an Active grant the summary aggregator needs (§4.I step 1).
#[derive(Debug, Clone, PartialEq)]
pub struct GrantView {
    pub name: String,
    pub generation: i64,
    pub consumer_ref: ObjectRef,
    pub allowances: Vec<Allowance>,
}

/// The slice of a Granted claim the summary aggregator needs (§4.I step 2).
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimView {
    pub name: String,
    pub generation: i64,
    pub consumer_ref: ObjectRef,
    pub resource_type: String,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributingRef {
    pub name: String,
    pub generation: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryTotals {
    pub total_limit: i64,
    pub total_allocated: i64,
    pub available: i64,
    pub contributing_grant_refs: Vec<ContributingRef>,
    pub contributing_claim_refs: Vec<ContributingRef>,
}

/// Computes a `ResourceQuotaSummary`'s totals for `(consumer_ref,
/// resource_type)` from the grants and claims already filtered to the
/// summary's namespace (§4.I). `grants` must already be Active-filtered and
/// `claims` already Granted-filtered — "Active"/"Granted" are status-field
/// reads the reconciler performs before calling in, not arithmetic this
/// pure function repeats.
pub fn aggregate(
    consumer_ref: &ObjectRef,
    resource_type: &str,
    grants: &[GrantView],
    claims: &[ClaimView],
) -> SummaryTotals {
    let mut total_limit = 0;
    let mut contributing_grant_refs = Vec::new();
    for grant in grants.iter().filter(|g| &g.consumer_ref == consumer_ref) {
        let matching_allowances: Vec<_> = grant.allowances.iter().filter(|a| a.resource_type == resource_type).collect();
        if matching_allowances.is_empty() {
            continue;
        }
        let grant_amount: i64 = matching_allowances.iter().flat_map(|a| a.buckets.iter()).map(|b| b.amount).sum();
        total_limit += grant_amount;
        contributing_grant_refs.push(ContributingRef {
            name: grant.name.clone(),
            generation: grant.generation,
        });
    }

    let mut total_allocated = 0;
    let mut contributing_claim_refs = Vec::new();
    for claim in claims
        .iter()
        .filter(|c| &c.consumer_ref == consumer_ref && c.resource_type == resource_type)
    {
        total_allocated += claim.amount;
        contributing_claim_refs.push(ContributingRef {
            name: claim.name.clone(),
            generation: claim.generation,
        });
    }

    SummaryTotals {
        total_limit,
        total_allocated,
        available: total_limit - total_allocated,
        contributing_grant_refs,
        contributing_claim_refs,
    }
}
