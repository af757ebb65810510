use crate::ast::{BinOp, Expr, UnaryOp};
use crate::error::CompileError;
use crate::value::Type;

pub const MAX_EXPR_LEN: usize = 1024;

const FORBIDDEN_TERMS: &[&str] = &["exec", "eval", "system", "import", "file", "network", "subprocess"];

pub fn check_length(src: &str) -> Result<(), CompileError> {
    if src.encode_utf16().count() > MAX_EXPR_LEN {
        return Err(CompileError::TooLong { max: MAX_EXPR_LEN });
    }
    Ok(())
}

pub fn check_forbidden_terms(expr: &Expr) -> Result<(), CompileError> {
    let mut found = None;
    expr.walk_idents(&mut |name| {
        if found.is_none() && FORBIDDEN_TERMS.contains(&name) {
            found = Some(name.to_string());
        }
    });
    expr.walk_calls(&mut |name| {
        if found.is_none() && FORBIDDEN_TERMS.contains(&name) {
            found = Some(name.to_string());
        }
    });
    match found {
        Some(name) => Err(CompileError::ForbiddenTerm(name)),
        None => Ok(()),
    }
}

pub fn check_free_vars(expr: &Expr, allowed: &[&str]) -> Result<(), CompileError> {
    let mut bad = None;
    expr.walk_idents(&mut |name| {
        if bad.is_none() && !allowed.contains(&name) {
            bad = Some(name.to_string());
        }
    });
    match bad {
        Some(name) => Err(CompileError::UndeclaredVariable(name)),
        None => Ok(()),
    }
}

/// Statically infer the result type where possible. Member/index access and
/// bare identifier reads are `Dynamic` — their shape is only known once the
/// runtime context is supplied, so the checker defers to evaluation-time
/// enforcement rather than rejecting them (§4.B: environment exposes only
/// the declared free variables, but their internal structure is opaque).
pub fn infer_type(expr: &Expr) -> Type {
    match expr {
        Expr::Null => Type::Dynamic,
        Expr::Bool(_) => Type::Bool,
        Expr::Int(_) => Type::Int,
        Expr::Str(_) => Type::String,
        Expr::Ident(_) | Expr::Member(_, _) | Expr::Index(_, _) | Expr::List(_) => Type::Dynamic,
        Expr::Call(name, _) => match name.as_str() {
            "has" => Type::Bool,
            "size" => Type::Int,
            "string" => Type::String,
            _ => Type::Dynamic,
        },
        Expr::Unary(UnaryOp::Not, _) => Type::Bool,
        Expr::Unary(UnaryOp::Neg, inner) => infer_type(inner),
        Expr::Binary(op, l, r) => match op {
            BinOp::And | BinOp::Or | BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                Type::Bool
            }
            BinOp::Add => match (infer_type(l), infer_type(r)) {
                (Type::String, _) | (_, Type::String) => Type::String,
                (Type::Int, Type::Int) => Type::Int,
                _ => Type::Dynamic,
            },
            BinOp::Sub | BinOp::Mul | BinOp::Div => Type::Int,
        },
    }
}

/// Assert that `expr`'s statically-known type is compatible with
/// `expected`. `Dynamic` is always accepted (checked again at evaluation).
pub fn assert_type(expr: &Expr, expected: Type) -> Result<(), CompileError> {
    let actual = infer_type(expr);
    match actual {
        Type::Dynamic => Ok(()),
        t if t == expected => Ok(()),
        actual => Err(CompileError::Type { expected, actual }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn flags_forbidden_identifier() {
        let e = parse("exec == true").unwrap();
        assert!(matches!(check_forbidden_terms(&e), Err(CompileError::ForbiddenTerm(_))));
    }

    #[test]
    fn flags_forbidden_call() {
        let e = parse("system(trigger.name)").unwrap();
        assert!(matches!(check_forbidden_terms(&e), Err(CompileError::ForbiddenTerm(_))));
    }

    #[test]
    fn flags_undeclared_variable() {
        let e = parse("secret.token == \"x\"").unwrap();
        assert!(check_free_vars(&e, &["trigger"]).is_err());
    }

    #[test]
    fn allows_declared_variable() {
        let e = parse("trigger.metadata.name == \"x\"").unwrap();
        assert!(check_free_vars(&e, &["trigger"]).is_ok());
    }

    #[test]
    fn infers_bool_for_comparison() {
        let e = parse("1 == 2").unwrap();
        assert_eq!(infer_type(&e), Type::Bool);
    }

    #[test]
    fn infers_dynamic_for_member_access() {
        let e = parse("trigger.metadata.name").unwrap();
        assert_eq!(infer_type(&e), Type::Dynamic);
    }

    #[test]
    fn rejects_non_bool_literal_for_bool_context() {
        let e = parse("\"x\"").unwrap();
        assert!(assert_type(&e, Type::Bool).is_err());
    }
}
