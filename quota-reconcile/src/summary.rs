//! The summary aggregator's storage-wired half (§4.I): recomputes one
//! `ResourceQuotaSummary`'s totals from the Active grants and Granted
//! claims for a `(consumerRef, resourceType)` pair and writes the result.

use crate::bucket::{StoredClaim, StoredGrant, STATUS_RETRY_ATTEMPTS};
use chrono::Utc;
use quota_aggregate::summary::{aggregate, ClaimView, GrantView, SummaryTotals};
use quota_aggregate::summary_name;
use quota_core::error::jittered_backoff;
use quota_core::model::AllocationStatus;
use quota_core::{ConditionStatus, Conditions, ObjectRef, QuotaError};
use quota_store::ObjectStore;

/// The full persisted `ResourceQuotaSummary` object (§3).
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSummary {
    pub consumer_ref: ObjectRef,
    pub resource_type: String,
    pub totals: SummaryTotals,
    pub conditions: Conditions,
}

const FIELD_MANAGER: &str = "summary-aggregator";

/// Recomputes and persists the summary for `(consumer_ref, resource_type)`
/// in `namespace` (§4.I).
///
/// Returns `Err(QuotaError::UnavailableDependency)` — not a permanent
/// failure — when no Active grant yet contributes to this resource type;
/// the caller should requeue after `err.requeue_after()`'s ~5s delay
/// rather than treat this as a terminal condition.
pub async fn reconcile_summary_for<G, C, S>(
    grant_store: &G,
    claim_store: &C,
    summary_store: &S,
    namespace: &str,
    consumer_ref: &ObjectRef,
    resource_type: &str,
) -> Result<SummaryTotals, QuotaError>
where
    G: ObjectStore<StoredGrant> + ?Sized,
    C: ObjectStore<StoredClaim> + ?Sized,
    S: ObjectStore<StoredSummary> + ?Sized,
{
    let grants: Vec<GrantView> = grant_store
        .list(namespace)
        .await?
        .into_iter()
        .filter(|g| g.value.conditions.is_true("Active"))
        .map(|g| GrantView {
            name: g.name,
            generation: g.generation,
            consumer_ref: g.value.spec.consumer_ref,
            allowances: g.value.spec.allowances,
        })
        .collect();

    let claims: Vec<ClaimView> = claim_store
        .list(namespace)
        .await?
        .into_iter()
        .flat_map(|c| {
            let name = c.name.clone();
            let generation = c.generation;
            let consumer = c.value.spec.consumer_ref.clone();
            let allocations = c.value.allocations.clone();
            c.value
                .spec
                .requests
                .into_iter()
                .filter(move |r| {
                    allocations
                        .iter()
                        .any(|a| a.resource_type == r.resource_type && a.status == AllocationStatus::Granted)
                })
                .map(move |r| ClaimView {
                    name: name.clone(),
                    generation,
                    consumer_ref: consumer.clone(),
                    resource_type: r.resource_type,
                    amount: r.amount,
                })
                .collect::<Vec<_>>()
        })
        .collect();

    let totals = aggregate(consumer_ref, resource_type, &grants, &claims);
    if totals.contributing_grant_refs.is_empty() {
        return Err(QuotaError::UnavailableDependency(format!(
            "no Active grant yet contributes {resource_type} for {consumer_ref:?} in {namespace}"
        )));
    }

    let name = summary_name(namespace, resource_type, consumer_ref);
    write_summary(summary_store, namespace, &name, consumer_ref, resource_type, &totals).await?;
    Ok(totals)
}

async fn write_summary<S>(
    store: &S,
    namespace: &str,
    name: &str,
    consumer_ref: &ObjectRef,
    resource_type: &str,
    totals: &SummaryTotals,
) -> Result<(), QuotaError>
where
    S: ObjectStore<StoredSummary> + ?Sized,
{
    for attempt in 0..STATUS_RETRY_ATTEMPTS {
        let (resource_version, mut value) = match store.get(namespace, name).await? {
            Some(s) => (s.resource_version, s.value),
            None => {
                let fresh = StoredSummary {
                    consumer_ref: consumer_ref.clone(),
                    resource_type: resource_type.to_string(),
                    totals: SummaryTotals {
                        total_limit: 0,
                        total_allocated: 0,
                        available: 0,
                        contributing_grant_refs: vec![],
                        contributing_claim_refs: vec![],
                    },
                    conditions: Conditions::new(),
                };
                match store.create(namespace, name, fresh).await {
                    Ok(created) => (created.resource_version, created.value),
                    Err(QuotaError::Conflict(_)) => continue,
                    Err(err) => return Err(err),
                }
            }
        };

        let totals_changed = value.totals != *totals;
        value.totals = totals.clone();
        let condition_changed = value.conditions.set(
            "Ready",
            ConditionStatus::True,
            "CalculationComplete",
            "quota summary recalculated",
            0,
            Utc::now(),
        );
        if !totals_changed && !condition_changed {
            return Ok(());
        }

        match store.status_update(namespace, name, &resource_version, FIELD_MANAGER, value).await {
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
    Err(QuotaError::Transient(format!("exhausted retries writing summary {namespace}/{name}")))
}
