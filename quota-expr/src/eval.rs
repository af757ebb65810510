use crate::ast::{BinOp, Expr, UnaryOp};
use crate::error::EvalError;
use crate::value::Value;
use std::collections::BTreeMap;

/// The evaluation-time context: free variables by name, e.g.
/// `{ trigger, user, requestInfo }` (§4.B).
#[derive(Debug, Clone, Default)]
pub struct Context {
    vars: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.vars.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }
}

/// Pure evaluation: no I/O, deterministic given the same `expr` and `ctx`.
pub fn eval(expr: &Expr, ctx: &Context) -> Result<Value, EvalError> {
    match expr {
        Expr::Null => Ok(Value::Null),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Int(n) => Ok(Value::Int(*n)),
        Expr::Str(s) => Ok(Value::String(s.clone())),
        Expr::List(items) => {
            let vals: Result<Vec<_>, _> = items.iter().map(|i| eval(i, ctx)).collect();
            Ok(Value::List(vals?))
        }
        Expr::Ident(name) => ctx
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UndefinedVariable(name.clone())),
        Expr::Member(base, field) => {
            let base_val = eval(base, ctx)?;
            field_access(&base_val, field)
        }
        Expr::Index(base, idx) => {
            let base_val = eval(base, ctx)?;
            let idx_val = eval(idx, ctx)?;
            index_access(&base_val, &idx_val)
        }
        Expr::Call(name, args) => eval_call(name, args, ctx),
        Expr::Unary(UnaryOp::Not, inner) => {
            let v = eval(inner, ctx)?;
            match v {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                other => Err(EvalError::ResultType {
                    expected: crate::value::Type::Bool,
                    actual: other.type_of(),
                }),
            }
        }
        Expr::Unary(UnaryOp::Neg, inner) => {
            let v = eval(inner, ctx)?;
            match v {
                Value::Int(n) => Ok(Value::Int(-n)),
                other => Err(EvalError::ResultType {
                    expected: crate::value::Type::Int,
                    actual: other.type_of(),
                }),
            }
        }
        Expr::Binary(op, l, r) => eval_binary(*op, l, r, ctx),
    }
}

fn field_access(base: &Value, field: &str) -> Result<Value, EvalError> {
    match base {
        Value::Map(m) => m
            .get(field)
            .cloned()
            .ok_or_else(|| EvalError::NoSuchField {
                field: field.to_string(),
            }),
        _ => Err(EvalError::NotIndexable),
    }
}

fn index_access(base: &Value, idx: &Value) -> Result<Value, EvalError> {
    match (base, idx) {
        (Value::List(items), Value::Int(i)) => {
            let i = *i;
            if i < 0 || i as usize >= items.len() {
                return Err(EvalError::IndexOutOfBounds);
            }
            Ok(items[i as usize].clone())
        }
        (Value::Map(m), Value::String(k)) => {
            m.get(k).cloned().ok_or_else(|| EvalError::NoSuchField { field: k.clone() })
        }
        _ => Err(EvalError::NotIndexable),
    }
}

fn eval_call(name: &str, args: &[Expr], ctx: &Context) -> Result<Value, EvalError> {
    match name {
        "has" => {
            if args.len() != 1 {
                return Err(EvalError::ArityMismatch {
                    function: "has".into(),
                    expected: 1,
                    actual: args.len(),
                });
            }
            // `has(x.y)` asks "does the field exist" rather than "is it truthy".
            let present = match &args[0] {
                Expr::Member(base, field) => {
                    let base_val = eval(base, ctx)?;
                    matches!(&base_val, Value::Map(m) if m.contains_key(field))
                }
                Expr::Ident(name) => ctx.get(name).is_some(),
                other => eval(other, ctx).is_ok(),
            };
            Ok(Value::Bool(present))
        }
        "size" => {
            if args.len() != 1 {
                return Err(EvalError::ArityMismatch {
                    function: "size".into(),
                    expected: 1,
                    actual: args.len(),
                });
            }
            let v = eval(&args[0], ctx)?;
            let n = match &v {
                Value::String(s) => s.chars().count() as i64,
                Value::List(items) => items.len() as i64,
                Value::Map(m) => m.len() as i64,
                _ => return Err(EvalError::NotIndexable),
            };
            Ok(Value::Int(n))
        }
        "string" => {
            if args.len() != 1 {
                return Err(EvalError::ArityMismatch {
                    function: "string".into(),
                    expected: 1,
                    actual: args.len(),
                });
            }
            let v = eval(&args[0], ctx)?;
            Ok(Value::String(v.coerce_to_string()))
        }
        other => Err(EvalError::UnknownFunction(other.to_string())),
    }
}

fn eval_binary(op: BinOp, l: &Expr, r: &Expr, ctx: &Context) -> Result<Value, EvalError> {
    match op {
        BinOp::And => {
            let lv = expect_bool(eval(l, ctx)?)?;
            if !lv {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(expect_bool(eval(r, ctx)?)?))
        }
        BinOp::Or => {
            let lv = expect_bool(eval(l, ctx)?)?;
            if lv {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(expect_bool(eval(r, ctx)?)?))
        }
        BinOp::Eq => Ok(Value::Bool(eval(l, ctx)? == eval(r, ctx)?)),
        BinOp::Ne => Ok(Value::Bool(eval(l, ctx)? != eval(r, ctx)?)),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let lv = eval(l, ctx)?;
            let rv = eval(r, ctx)?;
            let ordering = match (&lv, &rv) {
                (Value::Int(a), Value::Int(b)) => a.cmp(b),
                (Value::String(a), Value::String(b)) => a.cmp(b),
                _ => return Err(EvalError::OperatorType { op: "relational" }),
            };
            let result = match op {
                BinOp::Lt => ordering.is_lt(),
                BinOp::Le => ordering.is_le(),
                BinOp::Gt => ordering.is_gt(),
                BinOp::Ge => ordering.is_ge(),
                _ => unreachable!(),
            };
            Ok(Value::Bool(result))
        }
        BinOp::Add => {
            let lv = eval(l, ctx)?;
            let rv = eval(r, ctx)?;
            match (&lv, &rv) {
                (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
                (Value::String(_), _) | (_, Value::String(_)) => {
                    Ok(Value::String(format!("{}{}", lv.coerce_to_string(), rv.coerce_to_string())))
                }
                _ => Err(EvalError::OperatorType { op: "+" }),
            }
        }
        BinOp::Sub => arith(eval(l, ctx)?, eval(r, ctx)?, "-", |a, b| Ok(a - b)),
        BinOp::Mul => arith(eval(l, ctx)?, eval(r, ctx)?, "*", |a, b| Ok(a * b)),
        BinOp::Div => arith(eval(l, ctx)?, eval(r, ctx)?, "/", |a, b| {
            if b == 0 {
                Err(EvalError::DivisionByZero)
            } else {
                Ok(a / b)
            }
        }),
    }
}

fn expect_bool(v: Value) -> Result<bool, EvalError> {
    v.as_bool().ok_or(EvalError::OperatorType { op: "&&/||" })
}

fn arith(
    l: Value,
    r: Value,
    op: &'static str,
    f: impl FnOnce(i64, i64) -> Result<i64, EvalError>,
) -> Result<Value, EvalError> {
    match (l, r) {
        (Value::Int(a), Value::Int(b)) => f(a, b).map(Value::Int),
        _ => Err(EvalError::OperatorType { op }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn trigger_map() -> Value {
        let mut meta = BTreeMap::new();
        meta.insert("name".to_string(), Value::String("p42".into()));
        meta.insert("namespace".to_string(), Value::String("acme".into()));
        let mut trigger = BTreeMap::new();
        trigger.insert("metadata".to_string(), Value::Map(meta));
        Value::Map(trigger)
    }

    #[test]
    fn member_chain_resolves() {
        let e = parse("trigger.metadata.namespace == \"acme\"").unwrap();
        let ctx = Context::new().with("trigger", trigger_map());
        assert_eq!(eval(&e, &ctx).unwrap(), Value::Bool(true));
    }

    #[test]
    fn has_checks_field_presence_not_truthiness() {
        let e = parse("has(trigger.metadata.missing)").unwrap();
        let ctx = Context::new().with("trigger", trigger_map());
        assert_eq!(eval(&e, &ctx).unwrap(), Value::Bool(false));
    }

    #[test]
    fn string_concatenation() {
        let e = parse("trigger.metadata.name + \"-claim\"").unwrap();
        let ctx = Context::new().with("trigger", trigger_map());
        assert_eq!(eval(&e, &ctx).unwrap(), Value::String("p42-claim".into()));
    }

    #[test]
    fn and_short_circuits() {
        let e = parse("false && undefined_var").unwrap();
        let ctx = Context::new();
        assert_eq!(eval(&e, &ctx).unwrap(), Value::Bool(false));
    }

    #[test]
    fn division_by_zero_is_an_eval_error() {
        let e = parse("1 / 0").unwrap();
        assert_eq!(eval(&e, &Context::new()), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn undefined_variable_is_an_eval_error() {
        let e = parse("nope == 1").unwrap();
        assert!(matches!(eval(&e, &Context::new()), Err(EvalError::UndefinedVariable(_))));
    }
}
