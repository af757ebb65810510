/// The shape a rendered (or literal) field value must satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldGrammar {
    /// RFC 1123 DNS subdomain: lowercase alphanumerics, `-` and `.`,
    /// starting and ending with an alphanumeric, max 253 chars.
    Dns1123Subdomain,
    /// RFC 1123 DNS subdomain prefix ending in `-` (for `generateName`).
    GenerateNamePrefix,
    /// A single DNS-1123 label segment (used for qualified label names'
    /// value part): lowercase alphanumerics and `-`, max 63 chars.
    Dns1123Label,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
#[error("value {value:?} does not satisfy {grammar:?}: {reason}")]
pub struct GrammarError {
    pub grammar: FieldGrammar,
    pub value: String,
    pub reason: String,
}

pub fn validate(grammar: FieldGrammar, value: &str) -> Result<(), GrammarError> {
    let reason = match grammar {
        FieldGrammar::Dns1123Subdomain => check_subdomain(value, false),
        FieldGrammar::GenerateNamePrefix => check_subdomain(value, true),
        FieldGrammar::Dns1123Label => check_label(value),
    };
    match reason {
        None => Ok(()),
        Some(reason) => Err(GrammarError {
            grammar,
            value: value.to_string(),
            reason,
        }),
    }
}

fn check_subdomain(value: &str, allow_trailing_dash: bool) -> Option<String> {
    if value.is_empty() {
        return Some("must not be empty".to_string());
    }
    if value.len() > 253 {
        return Some("must be no more than 253 characters".to_string());
    }
    // `generateName` is a subdomain prefix that is itself allowed to end in
    // `-`; validate the rest as an ordinary subdomain.
    let core = if allow_trailing_dash {
        value.strip_suffix('-').unwrap_or(value)
    } else {
        value
    };
    if core.is_empty() {
        return None;
    }
    for label in core.split('.') {
        if let Some(reason) = check_label_inner(label, false) {
            return Some(reason);
        }
    }
    None
}

fn check_label(value: &str) -> Option<String> {
    if value.len() > 63 {
        return Some("must be no more than 63 characters".to_string());
    }
    check_label_inner(value, false)
}

fn check_label_inner(label: &str, allow_trailing_dash: bool) -> Option<String> {
    if label.is_empty() {
        return Some("must not contain empty labels".to_string());
    }
    let bytes = label.as_bytes();
    let is_alnum_lower = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    if !is_alnum_lower(bytes[0]) {
        return Some("must start with a lowercase alphanumeric character".to_string());
    }
    let last = bytes[bytes.len() - 1];
    if !is_alnum_lower(last) && !(allow_trailing_dash && last == b'-') {
        return Some("must end with a lowercase alphanumeric character".to_string());
    }
    for &b in bytes {
        if !(is_alnum_lower(b) || b == b'-') {
            return Some(format!(
                "must consist of lowercase alphanumeric characters or '-', found '{}'",
                b as char
            ));
        }
    }
    None
}
