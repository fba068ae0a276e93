use kotoha_utils::span::Span;
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq)]
pub enum LexError {
    /// Located at the opening quote, not at end of input.
    #[error("unterminated string literal")]
    UnterminatedString { span: Span },
    #[error("unterminated comment")]
    UnterminatedComment { span: Span },
    #[error("unrecognized character `{ch}`")]
    Unrecognized { ch: char, span: Span },
    #[error("malformed number `{text}`")]
    MalformedNumber { text: String, span: Span },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            | LexError::UnterminatedString { span } => *span,
            | LexError::UnterminatedComment { span } => *span,
            | LexError::Unrecognized { span, .. } => *span,
            | LexError::MalformedNumber { span, .. } => *span,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum SyntaxError {
    /// The input stopped mid-construct; interactive hosts treat this as
    /// "keep reading" rather than a hard failure.
    #[error("unexpected end of input; expected {expected}")]
    UnexpectedEof { expected: String, span: Span },
    #[error("expected {expected}, found `{found}`")]
    Unexpected { expected: String, found: String, span: Span },
    #[error(transparent)]
    Lex(#[from] LexError),
}

impl SyntaxError {
    pub fn span(&self) -> Span {
        match self {
            | SyntaxError::UnexpectedEof { span, .. } => *span,
            | SyntaxError::Unexpected { span, .. } => *span,
            | SyntaxError::Lex(err) => err.span(),
        }
    }

    /// Whether the failure is "ran out of input" as opposed to a
    /// malformed token; callers re-prompt on the former.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, SyntaxError::UnexpectedEof { .. })
    }
}
