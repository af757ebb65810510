//! Pure, side-effect-free expression compiler and evaluator (§4.B).
//!
//! A safe subset of CEL: boolean operators, arithmetic, string
//! concatenation, member access, list/map indexing, and `has()`. Two entry
//! points compile an expression string into a [`Compiled`] closure-like
//! value that asserts a specific result type; [`Compiled::eval`] then
//! evaluates it against a runtime [`Context`] with no I/O.

mod ast;
mod checker;
mod error;
mod eval;
mod lexer;
mod parser;
mod value;

pub use ast::Expr;
pub use error::{CompileError, EvalError};
pub use eval::Context;
pub use value::{Type, Value};

/// A compiled expression, closed over its AST. Thread-safe and reusable —
/// compiling is a one-time cost, evaluation is cheap and pure.
#[derive(Debug, Clone)]
pub struct Compiled {
    expr: Expr,
    result_type: Type,
}

impl Compiled {
    /// Evaluate against `ctx`, re-checking the result type at runtime for
    /// `Dynamic`-rooted expressions that couldn't be proven statically.
    pub fn eval(&self, ctx: &Context) -> Result<Value, EvalError> {
        let v = eval::eval(&self.expr, ctx)?;
        if self.result_type != Type::Dynamic && v.type_of() != Type::Dynamic && v.type_of() != self.result_type {
            return Err(EvalError::ResultType {
                expected: self.result_type,
                actual: v.type_of(),
            });
        }
        Ok(v)
    }

    pub fn eval_bool(&self, ctx: &Context) -> Result<bool, EvalError> {
        match self.eval(ctx)? {
            Value::Bool(b) => Ok(b),
            other => Err(EvalError::ResultType {
                expected: Type::Bool,
                actual: other.type_of(),
            }),
        }
    }

    pub fn eval_string(&self, ctx: &Context) -> Result<String, EvalError> {
        match self.eval(ctx)? {
            Value::String(s) => Ok(s),
            other => Err(EvalError::ResultType {
                expected: Type::String,
                actual: other.type_of(),
            }),
        }
    }
}

fn compile(src: &str, allowed_vars: &[&str], expected: Type) -> Result<Compiled, CompileError> {
    checker::check_length(src)?;
    let expr = parser::parse(src).map_err(CompileError::Parse)?;
    checker::check_forbidden_terms(&expr)?;
    checker::check_free_vars(&expr, allowed_vars)?;
    checker::assert_type(&expr, expected)?;
    let result_type = checker::infer_type(&expr);
    Ok(Compiled { expr, result_type })
}

/// Compile `expr`, asserting it returns a boolean (§4.B).
pub fn compile_bool(expr: &str, allowed_vars: &[&str]) -> Result<Compiled, CompileError> {
    compile(expr, allowed_vars, Type::Bool)
}

/// Compile `expr`, asserting it returns a string (§4.B).
pub fn compile_string(expr: &str, allowed_vars: &[&str]) -> Result<Compiled, CompileError> {
    compile(expr, allowed_vars, Type::String)
}
