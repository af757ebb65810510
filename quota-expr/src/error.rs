use crate::value::Type;

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum CompileError {
    #[error("parse error: {0}")]
    Parse(String),
    #[error("type error: expected {expected:?}, got {actual:?}")]
    Type { expected: Type, actual: Type },
    #[error("undeclared variable: {0}")]
    UndeclaredVariable(String),
    #[error("forbidden term: {0}")]
    ForbiddenTerm(String),
    #[error("expression exceeds maximum length of {max} code units")]
    TooLong { max: usize },
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum EvalError {
    #[error("undefined variable: {0}")]
    UndefinedVariable(String),
    #[error("no such field {field} on value")]
    NoSuchField { field: String },
    #[error("cannot index into value")]
    NotIndexable,
    #[error("index out of bounds")]
    IndexOutOfBounds,
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("wrong argument count for {function}: expected {expected}, got {actual}")]
    ArityMismatch {
        function: String,
        expected: usize,
        actual: usize,
    },
    #[error("type mismatch in operator {op}")]
    OperatorType { op: &'static str },
    #[error("runtime result has wrong type: expected {expected:?}, got {actual:?}")]
    ResultType { expected: Type, actual: Type },
    #[error("division by zero")]
    DivisionByZero,
}
