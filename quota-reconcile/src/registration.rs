use chrono::{DateTime, Utc};
use quota_core::model::ResourceRegistrationSpec;
use quota_core::{ConditionStatus, Conditions};
use quota_registry::ResourceTypeRegistry;
use quota_validate::{aggregate_message, validate_registration, ValidationMode};

/// Runs the registration reconciler's single-shot `Active` transition
/// (§4.E). A no-op once `Active=True` has already been observed, so
/// repeated re-enqueues never re-validate or rewrite status. Returns
/// whether `conditions` changed and therefore needs a status write.
///
/// `name` is the registration object's own name (see
/// `quota_validate::validate_registration`).
pub fn reconcile(
    spec: &ResourceRegistrationSpec,
    name: &str,
    generation: i64,
    conditions: &mut Conditions,
    registry: &ResourceTypeRegistry,
    now: DateTime<Utc>,
) -> bool {
    if conditions.is_true("Active") {
        return false;
    }

    let errors = validate_registration(spec, name, ValidationMode::ApiState, Some(registry));
    if errors.is_empty() {
        conditions.set(
            "Active",
            ConditionStatus::True,
            "Active",
            "registration validated",
            generation,
            now,
        )
    } else {
        conditions.set(
            "Active",
            ConditionStatus::False,
            "ValidationFailed",
            aggregate_message(&errors),
            generation,
            now,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quota_core::GroupKind;

    fn spec() -> ResourceRegistrationSpec {
        ResourceRegistrationSpec {
            resource_type: "group.example/Project".into(),
            consumer_type: GroupKind::new("group.example", "Organization"),
            claiming_resources: vec![],
        }
    }

    #[test]
    fn valid_spec_becomes_active() {
        let registry = ResourceTypeRegistry::new();
        let mut conditions = Conditions::new();
        let changed = reconcile(&spec(), "project-registration", 1, &mut conditions, &registry, Utc::now());
        assert!(changed);
        assert!(conditions.is_true("Active"));
    }

    #[test]
    fn already_active_is_a_no_op() {
        let registry = ResourceTypeRegistry::new();
        let mut conditions = Conditions::new();
        reconcile(&spec(), "project-registration", 1, &mut conditions, &registry, Utc::now());
        let changed_again = reconcile(&spec(), "project-registration", 1, &mut conditions, &registry, Utc::now());
        assert!(!changed_again);
    }

    #[test]
    fn duplicate_claiming_resources_records_validation_failure() {
        let mut bad = spec();
        bad.claiming_resources = vec![
            GroupKind::new("g", "A"),
            GroupKind::new("g", "A"),
        ];
        let registry = ResourceTypeRegistry::new();
        let mut conditions = Conditions::new();
        let changed = reconcile(&bad, "project-registration", 1, &mut conditions, &registry, Utc::now());
        assert!(changed);
        let active = conditions.get("Active").unwrap();
        assert_eq!(active.reason, "ValidationFailed");
        assert!(active.message.contains("duplicate"));
    }

    #[test]
    fn resource_type_taken_by_another_registration_records_validation_failure() {
        let registry = ResourceTypeRegistry::new();
        registry.apply_event(quota_registry::RegistrationEvent::Upsert {
            resource_type: "group.example/Project".into(),
            entry: quota_registry::RegistrationEntry {
                registration_name: "other-registration".into(),
                consumer_type: GroupKind::new("group.example", "Organization"),
                claiming_resources: vec![],
            },
        });
        registry.apply_event(quota_registry::RegistrationEvent::Synced);

        let mut conditions = Conditions::new();
        let changed = reconcile(&spec(), "project-registration", 1, &mut conditions, &registry, Utc::now());
        assert!(changed);
        let active = conditions.get("Active").unwrap();
        assert_eq!(active.reason, "ValidationFailed");
        assert!(active.message.contains("already registered"));
    }
}
