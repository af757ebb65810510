use chrono::{DateTime, Utc};
use quota_core::model::{BucketIdentity, ResourceGrantSpec};
use quota_core::{ConditionStatus, Conditions};
use quota_registry::ResourceTypeRegistry;
use quota_validate::{aggregate_message, validate_grant, ValidationMode};
use std::collections::{BTreeMap, BTreeSet};

/// Result of running the grant reconciler's status transition (§4.F).
pub struct GrantReconcileOutcome {
    /// Whether `conditions` changed and a status write is needed.
    pub status_changed: bool,
    /// Dimensionless bucket identities to pre-create with `allocated=0`,
    /// populated only the reconciliation the grant first becomes Active.
    /// Create-if-absent IO against the store, like all storage access in
    /// this crate, is left to the caller.
    pub buckets_to_precreate: Vec<BucketIdentity>,
}

/// Runs grant validation and sets `Active=True/False` with an
/// `observedGeneration = grant.generation` condition, then, on first
/// becoming Active, reports the one-per-`(consumerRef, allowance.resourceType)`
/// dimensionless buckets that must be pre-created (§4.F).
pub fn reconcile(
    spec: &ResourceGrantSpec,
    generation: i64,
    conditions: &mut Conditions,
    registry: &ResourceTypeRegistry,
    now: DateTime<Utc>,
) -> GrantReconcileOutcome {
    let was_active = conditions.is_true("Active");
    let errors = validate_grant(spec, ValidationMode::ApiState, Some(registry));
    let status_changed = if errors.is_empty() {
        conditions.set("Active", ConditionStatus::True, "Active", "grant validated", generation, now)
    } else {
        conditions.set(
            "Active",
            ConditionStatus::False,
            "ValidationFailed",
            aggregate_message(&errors),
            generation,
            now,
        )
    };

    let newly_active = !was_active && conditions.is_true("Active");
    let buckets_to_precreate = if newly_active {
        dimensionless_bucket_identities(spec)
    } else {
        Vec::new()
    };

    GrantReconcileOutcome {
        status_changed,
        buckets_to_precreate,
    }
}

fn dimensionless_bucket_identities(spec: &ResourceGrantSpec) -> Vec<BucketIdentity> {
    let mut seen = BTreeSet::new();
    spec.allowances
        .iter()
        .filter(|allowance| seen.insert(allowance.resource_type.clone()))
        .map(|allowance| BucketIdentity {
            consumer_ref: spec.consumer_ref.clone(),
            resource_type: allowance.resource_type.clone(),
            dimensions: BTreeMap::new(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quota_core::model::{Allowance, BucketAllowance};
    use quota_core::{GroupKind, LabelSelector, ObjectRef};
    use quota_registry::{RegistrationEntry, RegistrationEvent};

    fn consumer() -> ObjectRef {
        ObjectRef {
            api_group: "group.example".into(),
            kind: "Organization".into(),
            name: "acme".into(),
        }
    }

    fn synced_registry() -> ResourceTypeRegistry {
        let registry = ResourceTypeRegistry::new();
        registry.apply_event(RegistrationEvent::Upsert {
            resource_type: "group.example/Project".into(),
            entry: RegistrationEntry {
                registration_name: "project-registration".into(),
                consumer_type: GroupKind::new("group.example", "Organization"),
                claiming_resources: vec![],
            },
        });
        registry.apply_event(RegistrationEvent::Synced);
        registry
    }

    fn spec() -> ResourceGrantSpec {
        ResourceGrantSpec {
            consumer_ref: consumer(),
            allowances: vec![Allowance {
                resource_type: "group.example/Project".into(),
                buckets: vec![BucketAllowance {
                    amount: 5,
                    dimension_selector: LabelSelector::empty(),
                }],
            }],
        }
    }

    #[test]
    fn becoming_active_precreates_one_bucket_per_resource_type() {
        let registry = synced_registry();
        let mut conditions = Conditions::new();
        let outcome = reconcile(&spec(), 1, &mut conditions, &registry, Utc::now());
        assert!(outcome.status_changed);
        assert!(conditions.is_true("Active"));
        assert_eq!(outcome.buckets_to_precreate.len(), 1);
        assert_eq!(outcome.buckets_to_precreate[0].resource_type, "group.example/Project");
        assert!(outcome.buckets_to_precreate[0].dimensions.is_empty());
    }

    #[test]
    fn already_active_grant_does_not_precreate_again() {
        let registry = synced_registry();
        let mut conditions = Conditions::new();
        reconcile(&spec(), 1, &mut conditions, &registry, Utc::now());
        let outcome = reconcile(&spec(), 1, &mut conditions, &registry, Utc::now());
        assert!(!outcome.status_changed);
        assert!(outcome.buckets_to_precreate.is_empty());
    }

    #[test]
    fn invalid_grant_is_not_active() {
        let mut bad = spec();
        bad.allowances[0].buckets[0].amount = -1;
        let registry = synced_registry();
        let mut conditions = Conditions::new();
        let outcome = reconcile(&bad, 1, &mut conditions, &registry, Utc::now());
        assert!(outcome.status_changed);
        assert!(!conditions.is_true("Active"));
        assert!(outcome.buckets_to_precreate.is_empty());
    }

    #[test]
    fn duplicate_resource_types_across_allowances_precreate_once() {
        let mut spec = spec();
        spec.allowances.push(spec.allowances[0].clone());
        let registry = synced_registry();
        let mut conditions = Conditions::new();
        let outcome = reconcile(&spec, 1, &mut conditions, &registry, Utc::now());
        assert_eq!(outcome.buckets_to_precreate.len(), 1);
    }
}
