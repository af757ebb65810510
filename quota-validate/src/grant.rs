use crate::error::{FieldError, ValidationMode};
use quota_core::model::ResourceGrantSpec;
use quota_registry::ResourceTypeRegistry;

/// Validate a `ResourceGrant.spec` (§4.D): every `allowance.resourceType`
/// must resolve to an Active registration, and bucket amounts are
/// non-negative.
pub fn validate(
    spec: &ResourceGrantSpec,
    mode: ValidationMode,
    registry: Option<&ResourceTypeRegistry>,
) -> Vec<FieldError> {
    let mut errors = Vec::new();

    for (ai, allowance) in spec.allowances.iter().enumerate() {
        for (bi, bucket) in allowance.buckets.iter().enumerate() {
            if bucket.amount < 0 {
                errors.push(FieldError::new(
                    format!("spec.allowances[{ai}].buckets[{bi}].amount"),
                    "must be non-negative",
                ));
            }
        }

        if mode == ValidationMode::ApiState {
            if let Some(registry) = registry {
                if registry.has_synced() && !registry.is_registered(&allowance.resource_type) {
                    errors.push(FieldError::new(
                        format!("spec.allowances[{ai}].resourceType"),
                        format!("{} not available for quota management", allowance.resource_type),
                    ));
                }
            }
        }
    }
    errors
}
