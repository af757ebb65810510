use crate::error::{FieldError, ValidationMode};
use quota_core::model::ResourceRegistrationSpec;
use quota_core::GroupKind;
use quota_registry::ResourceTypeRegistry;
use std::collections::HashMap;

/// Validate a `ResourceRegistration.spec` (§4.D).
///
/// `name` is the registration object's own name, used to tell "this
/// `resourceType` is already mine" apart from a genuine conflict with
/// another registration.
///
/// `Static` mode checks `claimingResources` for duplicates. `ApiState` mode
/// additionally asks the registry cache whether `resourceType` is already
/// claimed by a different registration (§3: resourceType is globally unique
/// across all registrations, regardless of consumerType).
pub fn validate(
    spec: &ResourceRegistrationSpec,
    name: &str,
    mode: ValidationMode,
    registry: Option<&ResourceTypeRegistry>,
) -> Vec<FieldError> {
    let mut errors = Vec::new();
    check_duplicate_claiming_resources(spec, &mut errors);

    if mode == ValidationMode::ApiState {
        if let Some(registry) = registry {
            check_resource_type_not_taken(spec, name, registry, &mut errors);
        }
    }
    errors
}

fn check_duplicate_claiming_resources(spec: &ResourceRegistrationSpec, errors: &mut Vec<FieldError>) {
    let mut first_seen: HashMap<&GroupKind, usize> = HashMap::new();
    for (index, gk) in spec.claiming_resources.iter().enumerate() {
        match first_seen.get(gk) {
            Some(&first) => errors.push(FieldError::new(
                format!("spec.claimingResources[{index}]"),
                format!("duplicate of spec.claimingResources[{first}]: {gk}"),
            )),
            None => {
                first_seen.insert(gk, index);
            }
        }
    }
}

fn check_resource_type_not_taken(
    spec: &ResourceRegistrationSpec,
    name: &str,
    registry: &ResourceTypeRegistry,
    errors: &mut Vec<FieldError>,
) {
    if !registry.has_synced() {
        return;
    }
    if let Some(existing) = registry.get(&spec.resource_type) {
        if existing.registration_name != name {
            errors.push(FieldError::new(
                "spec.resourceType",
                format!(
                    "{} is already registered by {}",
                    spec.resource_type, existing.registration_name
                ),
            ));
        }
    }
}
