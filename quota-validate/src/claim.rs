use crate::error::{FieldError, ValidationMode};
use quota_core::model::{ResourceClaimSpec, ResourceRequest};
use quota_registry::{ClaimAllowedError, ResourceTypeRegistry};
use std::collections::HashMap;

/// Validate a `ResourceClaim.spec` (§4.D).
pub fn validate(
    spec: &ResourceClaimSpec,
    mode: ValidationMode,
    registry: Option<&ResourceTypeRegistry>,
) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if spec.resource_ref.kind.is_empty() {
        errors.push(FieldError::new("spec.resourceRef.kind", "is required"));
    }
    if spec.resource_ref.name.is_empty() {
        errors.push(FieldError::new("spec.resourceRef.name", "is required"));
    }

    check_duplicate_resource_types(spec, &mut errors);

    for (index, request) in spec.requests.iter().enumerate() {
        if request.amount <= 0 {
            errors.push(FieldError::new(format!("spec.requests[{index}].amount"), "must be positive"));
        }

        if mode == ValidationMode::ApiState {
            if let Some(registry) = registry {
                check_request_against_registry(spec, index, request, registry, &mut errors);
            }
        }
    }
    errors
}

fn check_duplicate_resource_types(spec: &ResourceClaimSpec, errors: &mut Vec<FieldError>) {
    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    for (index, request) in spec.requests.iter().enumerate() {
        match first_seen.get(request.resource_type.as_str()) {
            Some(&first) => errors.push(FieldError::new(
                format!("spec.requests[{index}].resourceType"),
                format!("duplicate of spec.requests[{first}]: {}", request.resource_type),
            )),
            None => {
                first_seen.insert(&request.resource_type, index);
            }
        }
    }
}

/// Resolves the request's resource type against the registry, and when the
/// claim's `resourceRef` is complete, whether it's an allowed claimer.
fn check_request_against_registry(
    spec: &ResourceClaimSpec,
    index: usize,
    request: &ResourceRequest,
    registry: &ResourceTypeRegistry,
    errors: &mut Vec<FieldError>,
) {
    if !registry.has_synced() {
        return;
    }
    let resource_ref_complete = !spec.resource_ref.kind.is_empty() && !spec.resource_ref.name.is_empty();
    if !resource_ref_complete {
        if !registry.is_registered(&request.resource_type) {
            errors.push(FieldError::new(
                format!("spec.requests[{index}].resourceType"),
                format!("{} not available for quota management", request.resource_type),
            ));
        }
        return;
    }

    let claimer = spec.resource_ref.group_kind();
    match registry.is_claiming_resource_allowed(&request.resource_type, &spec.consumer_ref.group_kind(), &claimer) {
        Ok((true, _)) => {}
        Ok((false, allowed)) => {
            let allowed_list = allowed
                .iter()
                .map(|gk| gk.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            errors.push(FieldError::new(
                "spec.resourceRef",
                format!(
                    "{} may not claim {}; allowed claiming resources: [{}]",
                    claimer, request.resource_type, allowed_list
                ),
            ));
        }
        Err(ClaimAllowedError::NotRegistered(rt)) => {
            errors.push(FieldError::new(
                format!("spec.requests[{index}].resourceType"),
                format!("{rt} not available for quota management"),
            ));
        }
        Err(err @ ClaimAllowedError::ConsumerKindMismatch { .. }) => {
            errors.push(FieldError::new("spec.consumerRef", err.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quota_core::{GroupKind, ObjectRef};
    use quota_registry::{RegistrationEntry, RegistrationEvent};
    use std::collections::BTreeMap;

    fn gk(g: &str, k: &str) -> GroupKind {
        GroupKind::new(g, k)
    }

    fn oref(g: &str, k: &str, n: &str) -> ObjectRef {
        ObjectRef {
            api_group: g.into(),
            kind: k.into(),
            name: n.into(),
        }
    }

    fn spec_with(requests: Vec<ResourceRequest>) -> ResourceClaimSpec {
        ResourceClaimSpec {
            consumer_ref: oref("group.example", "Organization", "acme"),
            resource_ref: oref("group.example", "Project", "p42"),
            requests,
        }
    }

    fn req(rt: &str, amount: i64) -> ResourceRequest {
        ResourceRequest {
            resource_type: rt.into(),
            amount,
            dimensions: BTreeMap::new(),
        }
    }

    #[test]
    fn missing_resource_ref_fields_are_required() {
        let mut spec = spec_with(vec![req("rt", 1)]);
        spec.resource_ref = oref("g", "", "");
        let errors = validate(&spec, ValidationMode::Static, None);
        assert!(errors.iter().any(|e| e.field == "spec.resourceRef.kind"));
        assert!(errors.iter().any(|e| e.field == "spec.resourceRef.name"));
    }

    #[test]
    fn duplicate_resource_type_rejected() {
        let spec = spec_with(vec![req("rt", 1), req("rt", 2)]);
        let errors = validate(&spec, ValidationMode::Static, None);
        assert!(errors.iter().any(|e| e.field == "spec.requests[1].resourceType"));
    }

    #[test]
    fn nonpositive_amount_rejected() {
        let spec = spec_with(vec![req("rt", 0)]);
        let errors = validate(&spec, ValidationMode::Static, None);
        assert!(errors.iter().any(|e| e.field == "spec.requests[0].amount"));
    }

    #[test]
    fn forbidden_claimer_enumerates_allowed_list() {
        let registry = ResourceTypeRegistry::new();
        registry.apply_event(RegistrationEvent::Upsert {
            resource_type: "group.example/Project".into(),
            entry: RegistrationEntry {
                registration_name: "project-registration".into(),
                consumer_type: gk("group.example", "Organization"),
                claiming_resources: vec![gk("group.example", "Allowed")],
            },
        });
        registry.apply_event(RegistrationEvent::Synced);

        let spec = spec_with(vec![req("group.example/Project", 1)]);
        let errors = validate(&spec, ValidationMode::ApiState, Some(&registry));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "spec.resourceRef");
        assert!(errors[0].message.contains("Allowed"));
    }

    #[test]
    fn allowed_claimer_passes() {
        let registry = ResourceTypeRegistry::new();
        registry.apply_event(RegistrationEvent::Upsert {
            resource_type: "group.example/Project".into(),
            entry: RegistrationEntry {
                registration_name: "project-registration".into(),
                consumer_type: gk("group.example", "Organization"),
                claiming_resources: vec![gk("group.example", "Project")],
            },
        });
        registry.apply_event(RegistrationEvent::Synced);

        let spec = spec_with(vec![req("group.example/Project", 1)]);
        assert!(validate(&spec, ValidationMode::ApiState, Some(&registry)).is_empty());
    }
}
