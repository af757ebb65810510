use chrono::{DateTime, Utc};
use quota_core::model::{Allocation, AllocationStatus, ResourceClaimSpec, ResourceRequest};
use quota_core::{ConditionStatus, Conditions};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestState {
    Granted,
    Denied,
    Pending,
}

fn classify(request: &ResourceRequest, allocations: &[Allocation]) -> RequestState {
    match allocations.iter().find(|a| a.resource_type == request.resource_type) {
        Some(Allocation { status: AllocationStatus::Granted, .. }) => RequestState::Granted,
        Some(Allocation { status: AllocationStatus::Denied, .. }) => RequestState::Denied,
        // Pending and "not yet decided at all" (the bucket aggregator
        // hasn't written an entry yet) are reported identically: there is
        // nothing actionable to distinguish them on until it resolves.
        Some(Allocation { status: AllocationStatus::Pending, .. }) | None => RequestState::Pending,
    }
}

/// Collapses per-request allocation verdicts into the claim's overall
/// `Granted` condition (§4.G). Never reads or writes `status.allocations`
/// itself — that belongs exclusively to the bucket aggregator. Returns
/// whether `conditions` changed and a status write is needed.
pub fn reconcile(
    spec: &ResourceClaimSpec,
    allocations: &[Allocation],
    generation: i64,
    conditions: &mut Conditions,
    now: DateTime<Utc>,
) -> bool {
    let states: Vec<RequestState> = spec.requests.iter().map(|r| classify(r, allocations)).collect();

    if states.iter().all(|s| *s == RequestState::Granted) {
        conditions.set(
            "Granted",
            ConditionStatus::True,
            "Granted",
            "all requests granted",
            generation,
            now,
        )
    } else if states.iter().any(|s| *s == RequestState::Denied) {
        conditions.set(
            "Granted",
            ConditionStatus::False,
            "Denied",
            "one or more requests were denied",
            generation,
            now,
        )
    } else {
        let pending = states.iter().filter(|s| **s == RequestState::Pending).count();
        conditions.set(
            "Granted",
            ConditionStatus::False,
            "Pending",
            format!("{pending} of {} requests still pending", states.len()),
            generation,
            now,
        )
    }
}
