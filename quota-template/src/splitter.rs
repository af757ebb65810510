/// A parsed template: an alternating sequence of literal text and
/// embedded-expression source strings.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    Expr(String),
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum SplitError {
    #[error("unmatched '{{{{' with no closing '}}}}'")]
    UnmatchedOpenBrace,
}

/// Split a mixed literal/expression string on `{{ ... }}` (§4.C).
///
/// - Braces nested inside a quoted string literal inside the expression do
///   not terminate it; escape sequences within quotes are respected.
/// - `{{}}` and `{{   }}` (whitespace-only) are literal — emitted verbatim,
///   not evaluated as an expression.
/// - `{{{ ... }}}` (three or more consecutive braces) is literal: the
///   extra braces fall outside expression recognition entirely.
/// - An unterminated `{{` is a syntax error.
pub fn split(template: &str) -> Result<Vec<Segment>, SplitError> {
    let chars: Vec<char> = template.chars().collect();
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        let is_open = chars[i] == '{' && chars.get(i + 1) == Some(&'{');
        let is_triple = is_open && chars.get(i + 2) == Some(&'{');

        if is_open && !is_triple {
            let (expr_src, consumed) = scan_expression(&chars, i, i + 2)?;
            if expr_src.trim().is_empty() {
                // {{}} / {{ }} — literal, verbatim.
                literal.push_str(&chars[i..i + consumed].iter().collect::<String>());
            } else {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Expr(expr_src));
            }
            i += consumed;
        } else if is_triple {
            // Consume the whole run of consecutive '{' as literal so a
            // later "{{" inside the same run isn't re-scanned as a fresh
            // expression opener.
            while i < chars.len() && chars[i] == '{' {
                literal.push(chars[i]);
                i += 1;
            }
        } else {
            literal.push(chars[i]);
            i += 1;
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}

/// Scans from just after `{{` (at `start`, with the `{{` itself starting
/// at `open`) to the matching `}}`, respecting quoted string literals.
/// Returns the raw expression source and the total number of characters
/// consumed starting from `open`.
fn scan_expression(chars: &[char], open: usize, start: usize) -> Result<(String, usize), SplitError> {
    let mut i = start;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match c {
            '"' | '\'' => {
                quote = Some(c);
                i += 1;
            }
            '}' if chars.get(i + 1) == Some(&'}') => {
                let expr_src: String = chars[start..i].iter().collect();
                return Ok((expr_src, (i + 2) - open));
            }
            _ => i += 1,
        }
    }
    Err(SplitError::UnmatchedOpenBrace)
}
