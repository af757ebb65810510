use chrono::{DateTime, Utc};
use quota_core::model::{ClaimCreationPolicySpec, GrantCreationPolicySpec};
use quota_core::{ConditionStatus, Conditions};
use quota_registry::ResourceTypeRegistry;
use quota_validate::{aggregate_message, validate_claim_policy, validate_grant_policy, ValidationMode};

/// Validates a `ClaimCreationPolicy` under both static and API-state checks
/// and sets `Ready=True` iff it passes (§4.J). Returns whether `conditions`
/// changed and therefore needs a status write.
pub fn reconcile_claim_policy(
    spec: &ClaimCreationPolicySpec,
    generation: i64,
    conditions: &mut Conditions,
    registry: &ResourceTypeRegistry,
    now: DateTime<Utc>,
) -> bool {
    let errors = validate_claim_policy(spec, ValidationMode::ApiState, Some(registry));
    set_ready(conditions, errors, generation, now)
}

/// Validates a `GrantCreationPolicy`, mirroring [`reconcile_claim_policy`].
pub fn reconcile_grant_policy(
    spec: &GrantCreationPolicySpec,
    generation: i64,
    conditions: &mut Conditions,
    registry: &ResourceTypeRegistry,
    now: DateTime<Utc>,
) -> bool {
    let errors = validate_grant_policy(spec, ValidationMode::ApiState, Some(registry));
    set_ready(conditions, errors, generation, now)
}

fn set_ready(
    conditions: &mut Conditions,
    errors: Vec<quota_validate::FieldError>,
    generation: i64,
    now: DateTime<Utc>,
) -> bool {
    if errors.is_empty() {
        conditions.set("Ready", ConditionStatus::True, "Ready", "policy template validated", generation, now)
    } else {
        conditions.set(
            "Ready",
            ConditionStatus::False,
            "ValidationFailed",
            aggregate_message(&errors),
            generation,
            now,
        )
    }
}
