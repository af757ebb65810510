/// A single field-path-qualified validation failure (§4.D). Validators
/// collect every failure rather than stopping at the first.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Whether a validator consults the registry cache or API state, or runs
/// purely against the object's own fields (§4.D, §9 "dry-run vs full
/// validation"). The dry-run path must never issue storage reads, so
/// `Static` mode is the only mode admission dry-run may select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    Static,
    ApiState,
}

/// Aggregates field errors into the single message a status condition
/// carries (§4.E: `reason=ValidationFailed, message=<aggregate>`).
pub fn aggregate_message(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
