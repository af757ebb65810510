use crate::error::{FieldError, ValidationMode};
use quota_core::model::{
    ClaimCreationPolicySpec, GrantCreationPolicySpec, ObjectMetaTemplate, PolicyTrigger, CLAIM_POLICY_VARS,
    GRANT_POLICY_VARS,
};
use quota_registry::ResourceTypeRegistry;
use quota_template::{CompiledField, FieldGrammar, Segment};

/// Validate a `ClaimCreationPolicy.spec` (§4.D, §4.J).
pub fn validate_claim_policy(
    spec: &ClaimCreationPolicySpec,
    mode: ValidationMode,
    registry: Option<&ResourceTypeRegistry>,
) -> Vec<FieldError> {
    let mut errors = Vec::new();
    validate_trigger(&spec.trigger, CLAIM_POLICY_VARS, &mut errors);
    validate_object_meta_template(&spec.target.metadata, CLAIM_POLICY_VARS, &mut errors);
    validate_name_field(
        "spec.target.consumerRef.name",
        &spec.target.consumer_ref.name,
        CLAIM_POLICY_VARS,
        &mut errors,
    );
    validate_name_field(
        "spec.target.resourceRef.name",
        &spec.target.resource_ref.name,
        CLAIM_POLICY_VARS,
        &mut errors,
    );

    for (index, request) in spec.target.requests.iter().enumerate() {
        if request.amount <= 0 {
            errors.push(FieldError::new(
                format!("spec.target.requests[{index}].amount"),
                "must be positive",
            ));
        }
        for (key, value) in &request.dimensions {
            validate_expr_field(
                &format!("spec.target.requests[{index}].dimensions[{key}]"),
                value,
                CLAIM_POLICY_VARS,
                &mut errors,
            );
        }
        if mode == ValidationMode::ApiState {
            if let Some(registry) = registry {
                check_resource_type_active(
                    &format!("spec.target.requests[{index}].resourceType"),
                    &request.resource_type,
                    registry,
                    &mut errors,
                );
            }
        }
    }
    errors
}

/// Validate a `GrantCreationPolicy.spec` (§4.D, §4.J).
pub fn validate_grant_policy(
    spec: &GrantCreationPolicySpec,
    mode: ValidationMode,
    registry: Option<&ResourceTypeRegistry>,
) -> Vec<FieldError> {
    let mut errors = Vec::new();
    validate_trigger(&spec.trigger, GRANT_POLICY_VARS, &mut errors);
    validate_object_meta_template(&spec.target.metadata, GRANT_POLICY_VARS, &mut errors);
    validate_name_field(
        "spec.target.consumerRef.name",
        &spec.target.consumer_ref.name,
        GRANT_POLICY_VARS,
        &mut errors,
    );

    for (ai, allowance) in spec.target.allowances.iter().enumerate() {
        for (bi, bucket) in allowance.buckets.iter().enumerate() {
            if bucket.amount < 0 {
                errors.push(FieldError::new(
                    format!("spec.target.allowances[{ai}].buckets[{bi}].amount"),
                    "must be non-negative",
                ));
            }
            for (key, value) in &bucket.dimension_selector {
                validate_expr_field(
                    &format!("spec.target.allowances[{ai}].buckets[{bi}].dimensionSelector[{key}]"),
                    value,
                    GRANT_POLICY_VARS,
                    &mut errors,
                );
            }
        }
        if mode == ValidationMode::ApiState {
            if let Some(registry) = registry {
                check_resource_type_active(
                    &format!("spec.target.allowances[{ai}].resourceType"),
                    &allowance.resource_type,
                    registry,
                    &mut errors,
                );
            }
        }
    }
    errors
}

fn validate_trigger(trigger: &PolicyTrigger, allowed_vars: &[&str], errors: &mut Vec<FieldError>) {
    for (index, condition) in trigger.conditions.iter().enumerate() {
        if let Err(err) = quota_expr::compile_bool(condition, allowed_vars) {
            errors.push(FieldError::new(format!("spec.trigger.conditions[{index}]"), err.to_string()));
        }
    }
}

fn validate_object_meta_template(meta: &ObjectMetaTemplate, allowed_vars: &[&str], errors: &mut Vec<FieldError>) {
    match (&meta.name, &meta.generate_name) {
        (Some(_), Some(_)) => errors.push(FieldError::new(
            "spec.target.metadata",
            "name and generateName are mutually exclusive",
        )),
        (None, None) => errors.push(FieldError::new(
            "spec.target.metadata",
            "one of name or generateName is required",
        )),
        (Some(name), None) => validate_template_field(
            "spec.target.metadata.name",
            name,
            FieldGrammar::Dns1123Subdomain,
            allowed_vars,
            errors,
        ),
        (None, Some(generate_name)) => validate_template_field(
            "spec.target.metadata.generateName",
            generate_name,
            FieldGrammar::GenerateNamePrefix,
            allowed_vars,
            errors,
        ),
    }

    validate_template_field(
        "spec.target.metadata.namespace",
        &meta.namespace,
        FieldGrammar::Dns1123Label,
        allowed_vars,
        errors,
    );

    for (key, value) in &meta.labels {
        validate_expr_field(&format!("spec.target.metadata.labels[{key}]"), value, allowed_vars, errors);
    }
    for (key, value) in &meta.annotations {
        validate_expr_field(&format!("spec.target.metadata.annotations[{key}]"), value, allowed_vars, errors);
    }
}

fn validate_name_field(field: &str, raw: &str, allowed_vars: &[&str], errors: &mut Vec<FieldError>) {
    validate_template_field(field, raw, FieldGrammar::Dns1123Subdomain, allowed_vars, errors);
}

/// Classify-and-compile `raw` against `grammar` (§4.C): a literal field is
/// validated against the grammar immediately; a templated field only has
/// its expressions compiled here — the rendered shape can only be checked
/// once a concrete trigger object is available (at render time).
fn validate_template_field(
    field: &str,
    raw: &str,
    grammar: FieldGrammar,
    allowed_vars: &[&str],
    errors: &mut Vec<FieldError>,
) {
    if let Err(err) = CompiledField::compile(raw, grammar, allowed_vars) {
        errors.push(FieldError::new(field, err.to_string()));
    }
}

/// Validates only the embedded expressions of a field with no fixed
/// grammar (label/annotation/dimension values) — every segment must
/// compile and type-check as a string.
fn validate_expr_field(field: &str, raw: &str, allowed_vars: &[&str], errors: &mut Vec<FieldError>) {
    match quota_template::split(raw) {
        Ok(segments) => {
            for segment in segments {
                if let Segment::Expr(src) = segment {
                    if let Err(err) = quota_expr::compile_string(&src, allowed_vars) {
                        errors.push(FieldError::new(field, format!("{src:?}: {err}")));
                    }
                }
            }
        }
        Err(err) => errors.push(FieldError::new(field, err.to_string())),
    }
}

fn check_resource_type_active(
    field: &str,
    resource_type: &str,
    registry: &ResourceTypeRegistry,
    errors: &mut Vec<FieldError>,
) {
    if registry.has_synced() && !registry.is_registered(resource_type) {
        errors.push(FieldError::new(field, format!("{resource_type} not available for quota management")));
    }
}
