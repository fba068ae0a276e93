use kotoha_utils::span::Span;
use thiserror::Error;

/// Rejections raised while lowering the AST to executable form.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SemanticError {
    #[error("`{name}` is already defined in this scope")]
    Redefinition { name: String, span: Span },
    /// A placeholder or valueless definition at the head of a phrase
    /// chain, where no previous result exists to pipe in.
    #[error("no preceding value to fill this phrase")]
    NoValue { span: Span },
    #[error("a definition binds exactly one value")]
    MalformedAggregation { span: Span },
    #[error("slot marker outside a lambda body")]
    StraySlot { span: Span },
}

impl SemanticError {
    pub fn span(&self) -> Span {
        match self {
            | SemanticError::Redefinition { span, .. } => *span,
            | SemanticError::NoValue { span } => *span,
            | SemanticError::MalformedAggregation { span } => *span,
            | SemanticError::StraySlot { span } => *span,
        }
    }
}

/// Failures of particle-wise argument resolution; see `resolve`.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ResolveError {
    #[error(
        "no argument for parameter tagged `{particle}`; callee takes `{expected}`, caller supplied `{supplied}`"
    )]
    Unbound { particle: String, expected: String, supplied: String },
    #[error("fewer arguments than parameters; cannot expand `{particle}`")]
    Expansion { particle: String },
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum RuntimeError {
    #[error("`{name}` is not defined")]
    Undefined { name: String },
    #[error("`{name}` is not callable")]
    NotCallable { name: String },
    #[error("cannot resolve arguments for `{name}`: {err}")]
    Resolve {
        name: String,
        #[source]
        err: ResolveError,
    },
    #[error("expected {expected}, got {found}")]
    TypeMismatch { expected: String, found: String },
    #[error("operator `{op}` is not defined")]
    UnknownOperator { op: String },
    #[error("`{field}` is not a property of this value")]
    NoProperty { field: String },
    #[error("division by zero")]
    DivisionByZero,
}
