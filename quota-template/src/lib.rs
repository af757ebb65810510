//! Mixed literal/expression string templates (§4.C).
//!
//! A templated field is either `Literal` (no `{{` anywhere) or `Template`
//! (one or more embedded expressions). [`Field::compile`] classifies and
//! compiles a field against a grammar and an allowed-variable set;
//! [`CompiledField::render`] evaluates it against a runtime context.

mod grammar;
mod splitter;

pub use grammar::{validate as validate_grammar, FieldGrammar, GrammarError};
pub use splitter::{split, Segment, SplitError};

use quota_expr::{compile_string, Compiled, Context};
use thiserror::Error;

/// A field whose static shape has been classified and whose embedded
/// expressions have been compiled.
#[derive(Debug, Clone)]
pub struct CompiledField {
    grammar: FieldGrammar,
    parts: Vec<CompiledPart>,
}

#[derive(Debug, Clone)]
enum CompiledPart {
    Literal(String),
    Expr(Compiled),
}

#[derive(Debug, Error, PartialEq)]
pub enum TemplateError {
    #[error(transparent)]
    Split(#[from] SplitError),
    #[error("expression {index} ({src:?}) failed to compile: {source}")]
    Expr {
        index: usize,
        src: String,
        #[source]
        source: quota_expr::CompileError,
    },
    #[error(transparent)]
    Grammar(#[from] GrammarError),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("expression {index} failed to evaluate: {source}")]
    Eval {
        index: usize,
        #[source]
        source: quota_expr::EvalError,
    },
    #[error(transparent)]
    Grammar(#[from] GrammarError),
}

impl CompiledField {
    /// Classify and compile `raw` against `grammar`, using `allowed_vars`
    /// for every embedded expression.
    ///
    /// A field with no `{{` is validated directly against `grammar` as a
    /// literal (no expressions to compile). A templated field has each
    /// expression compiled as string-typed (templates always concatenate
    /// to a string); the final grammar check happens at render time, since
    /// it depends on the rendered value.
    pub fn compile(raw: &str, grammar: FieldGrammar, allowed_vars: &[&str]) -> Result<Self, TemplateError> {
        let segments = split(raw)?;
        let is_template = segments.iter().any(|s| matches!(s, Segment::Expr(_)));

        if !is_template {
            validate_grammar(grammar, raw)?;
            return Ok(Self {
                grammar,
                parts: vec![CompiledPart::Literal(raw.to_string())],
            });
        }

        let mut parts = Vec::with_capacity(segments.len());
        for (index, seg) in segments.into_iter().enumerate() {
            match seg {
                Segment::Literal(s) => parts.push(CompiledPart::Literal(s)),
                Segment::Expr(src) => {
                    let compiled = compile_string(&src, allowed_vars).map_err(|source| TemplateError::Expr {
                        index,
                        src: src.clone(),
                        source,
                    })?;
                    parts.push(CompiledPart::Expr(compiled));
                }
            }
        }
        Ok(Self { grammar, parts })
    }

    pub fn is_template(&self) -> bool {
        !matches!(self.parts.as_slice(), [CompiledPart::Literal(_)])
    }

    /// Render by concatenating literal segments with evaluated expression
    /// values (coerced to string), then re-validating the result shape.
    pub fn render(&self, ctx: &Context) -> Result<String, RenderError> {
        let mut out = String::new();
        for (index, part) in self.parts.iter().enumerate() {
            match part {
                CompiledPart::Literal(s) => out.push_str(s),
                CompiledPart::Expr(e) => {
                    let v = e.eval_string(ctx).map_err(|source| RenderError::Eval { index, source })?;
                    out.push_str(&v);
                }
            }
        }
        validate_grammar(self.grammar, &out)?;
        Ok(out)
    }
}
