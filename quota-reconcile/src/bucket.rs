//! The bucket aggregator's storage-wired half (§4.H): loads the grants and
//! racing claims a bucket decision needs, runs `quota-aggregate`'s verdict
//! rule, and writes the result back — the bucket's own `status.allocated`/
//! `contributingClaimRefs` and the claim's `status.allocations[resourceType]`
//! — with the optimistic-concurrency retry §4.H's "race control" calls for.

use quota_aggregate::bucket::{apply_verdict, current_allocated, decide, total_limit, BucketStatus, ClaimRequestView, GrantView};
use quota_aggregate::bucket_name;
use quota_core::error::jittered_backoff;
use quota_core::model::{Allocation, AllocationStatus, BucketIdentity, ResourceClaimSpec, ResourceGrantSpec};
use quota_core::{Conditions, QuotaError};
use quota_store::ObjectStore;

pub use quota_aggregate::bucket::Verdict;

/// The full persisted `ResourceGrant` object (§3) this reconciler needs:
/// spec plus the `Active` condition it filters by. Distinct from the
/// bare-spec store `quota`'s policy wiring uses for materialization.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredGrant {
    pub spec: ResourceGrantSpec,
    pub conditions: Conditions,
}

/// The full persisted `ResourceClaim` object (§3): spec plus the
/// per-request allocation verdicts this reconciler owns exclusively.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredClaim {
    pub spec: ResourceClaimSpec,
    pub conditions: Conditions,
    pub allocations: Vec<Allocation>,
}

/// The full persisted `AllowanceBucket` object (§3): identity plus the
/// derived counter `quota-aggregate::bucket` computes.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredBucket {
    pub identity: BucketIdentity,
    pub status: BucketStatus,
}

pub(crate) const STATUS_RETRY_ATTEMPTS: usize = 5;
const FIELD_MANAGER: &str = "bucket-aggregator";

/// Decides one `(claim, request)` against its bucket and writes both the
/// bucket's counter and the claim's allocation verdict (§4.H steps 2-5).
///
/// `request_index` selects which of the claim's `spec.requests` this call
/// decides. A request already Granted in the claim's current allocations
/// is returned without touching storage at all: per §4.H's state machine,
/// a Granted verdict is revisited only by a shrink in this claim's own
/// spec/generation, never by the aggregator revisiting it on its own.
pub async fn reconcile_bucket_for_request<G, C, B>(
    grant_store: &G,
    claim_store: &C,
    bucket_store: &B,
    namespace: &str,
    claim_name: &str,
    request_index: usize,
) -> Result<Verdict, QuotaError>
where
    G: ObjectStore<StoredGrant> + ?Sized,
    C: ObjectStore<StoredClaim> + ?Sized,
    B: ObjectStore<StoredBucket> + ?Sized,
{
    let claim = claim_store
        .get(namespace, claim_name)
        .await?
        .ok_or_else(|| QuotaError::NotFound(format!("{namespace}/{claim_name}")))?;
    let request = claim
        .value
        .spec
        .requests
        .get(request_index)
        .cloned()
        .ok_or_else(|| QuotaError::Internal(format!("request index {request_index} out of range for {namespace}/{claim_name}")))?;

    if claim
        .value
        .allocations
        .iter()
        .any(|a| a.resource_type == request.resource_type && a.status == AllocationStatus::Granted)
    {
        return Ok(Verdict::Granted);
    }

    let consumer_ref = claim.value.spec.consumer_ref.clone();
    let identity = BucketIdentity {
        consumer_ref: consumer_ref.clone(),
        resource_type: request.resource_type.clone(),
        dimensions: request.dimensions.clone(),
    };
    let bucket_id = bucket_name(namespace, &request.resource_type, &request.dimensions);

    let grants: Vec<GrantView> = grant_store
        .list(namespace)
        .await?
        .into_iter()
        .filter(|g| g.value.conditions.is_true("Active"))
        .map(|g| GrantView {
            consumer_ref: g.value.spec.consumer_ref,
            allowances: g.value.spec.allowances,
        })
        .collect();

    let other_claims: Vec<ClaimRequestView> = claim_store
        .list(namespace)
        .await?
        .into_iter()
        .filter(|c| c.name != claim_name)
        .filter_map(|c| {
            let matching = c.value.spec.requests.iter().find(|r| r.resource_type == request.resource_type)?.clone();
            let currently_granted = c
                .value
                .allocations
                .iter()
                .any(|a| a.resource_type == matching.resource_type && a.status == AllocationStatus::Granted);
            Some(ClaimRequestView {
                claim_name: c.name,
                resource_type: matching.resource_type,
                amount: matching.amount,
                dimensions: matching.dimensions,
                currently_granted,
            })
        })
        .collect();

    let limit = total_limit(&consumer_ref, &request.resource_type, &request.dimensions, &grants);
    let allocated = current_allocated(claim_name, &request.resource_type, &request.dimensions, &other_claims);
    let verdict = decide(request.amount, allocated, limit);

    write_bucket_status(
        bucket_store,
        namespace,
        &bucket_id,
        &identity,
        claim_name,
        claim.generation,
        request.amount,
        &verdict,
    )
    .await?;
    write_claim_allocation(claim_store, namespace, claim_name, &request.resource_type, &verdict).await?;

    Ok(verdict)
}

async fn write_bucket_status<B>(
    store: &B,
    namespace: &str,
    name: &str,
    identity: &BucketIdentity,
    claim_name: &str,
    claim_generation: i64,
    request_amount: i64,
    verdict: &Verdict,
) -> Result<(), QuotaError>
where
    B: ObjectStore<StoredBucket> + ?Sized,
{
    for attempt in 0..STATUS_RETRY_ATTEMPTS {
        let (resource_version, mut stored) = match store.get(namespace, name).await? {
            Some(s) => (s.resource_version, s.value),
            None => match store
                .create(
                    namespace,
                    name,
                    StoredBucket {
                        identity: identity.clone(),
                        status: BucketStatus::default(),
                    },
                )
                .await
            {
                Ok(created) => (created.resource_version, created.value),
                Err(QuotaError::Conflict(_)) => continue,
                Err(err) => return Err(err),
            },
        };
        apply_verdict(&mut stored.status, claim_name, claim_generation, request_amount, verdict);
        match store.status_update(namespace, name, &resource_version, FIELD_MANAGER, stored).await {
            Ok(_) => return Ok(()),
            Err(QuotaError::Conflict(_)) => {
                if attempt + 1 < STATUS_RETRY_ATTEMPTS {
                    tokio::time::sleep(jittered_backoff()).await;
                }
                continue;
            }
            Err(err) => return Err(err),
        }
    }
    Err(QuotaError::Transient(format!("exhausted retries writing bucket {namespace}/{name}")))
}

async fn write_claim_allocation<C>(
    store: &C,
    namespace: &str,
    claim_name: &str,
    resource_type: &str,
    verdict: &Verdict,
) -> Result<(), QuotaError>
where
    C: ObjectStore<StoredClaim> + ?Sized,
{
    let status = match verdict {
        Verdict::Granted => AllocationStatus::Granted,
        Verdict::Denied { .. } => AllocationStatus::Denied,
    };

    for attempt in 0..STATUS_RETRY_ATTEMPTS {
        let current = store
            .get(namespace, claim_name)
            .await?
            .ok_or_else(|| QuotaError::NotFound(format!("{namespace}/{claim_name}")))?;
        let mut value = current.value;
        match value.allocations.iter_mut().find(|a| a.resource_type == resource_type) {
            Some(existing) => existing.status = status,
            None => value.allocations.push(Allocation {
                resource_type: resource_type.to_string(),
                status,
            }),
        }
        match store.status_update(namespace, claim_name, &current.resource_version, FIELD_MANAGER, value).await {
            Ok(_) => return Ok(()),
            Err(QuotaError::Conflict(_)) => {
                if attempt + 1 < STATUS_RETRY_ATTEMPTS {
                    tokio::time::sleep(jittered_backoff()).await;
                }
                continue;
            }
            Err(err) => return Err(err),
        }
    }
    Err(QuotaError::Transient(format!(
        "exhausted retries writing claim {namespace}/{claim_name} allocations"
    )))
}
