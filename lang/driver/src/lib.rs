//! Front-to-back entry points: source text in, executable form out,
//! executable form plus a global scope in, value out.

use kotoha_dynamics::err::{RuntimeError, SemanticError};
use kotoha_dynamics::syntax::{ExecutableForm, GlobalScope, Value};
use kotoha_surface::err::{LexError, SyntaxError};
use kotoha_surface::{Lexer, Parser};
use kotoha_utils::span::{Cursor2, FileInfo};
use thiserror::Error;

/// A compilation failure, located as `name:line:column`.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CompileError {
    #[error("{name}:{at}: {err}")]
    Lex { name: String, at: Cursor2, err: LexError },
    #[error("{name}:{at}: {err}")]
    Syntax { name: String, at: Cursor2, err: SyntaxError },
    #[error("{name}:{at}: {err}")]
    Semantic { name: String, at: Cursor2, err: SemanticError },
}

impl CompileError {
    /// Whether the source simply stopped mid-construct; interactive
    /// hosts keep reading instead of reporting.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, CompileError::Syntax { err, .. } if err.is_incomplete())
    }

    pub fn location(&self) -> Cursor2 {
        match self {
            | CompileError::Lex { at, .. } => *at,
            | CompileError::Syntax { at, .. } => *at,
            | CompileError::Semantic { at, .. } => *at,
        }
    }
}

/// Lex, parse and generate; the result can be executed any number of
/// times against any global scope.
pub fn compile(
    source: &str,
    source_name: &str,
) -> Result<ExecutableForm, CompileError> {
    let info = FileInfo::new(source, source_name);
    log::debug!("compiling {source_name} ({} chars)", source.chars().count());
    let mut parser = Parser::new(Lexer::new(source));
    let prog = parser.parse_program().map_err(|err| match err {
        | SyntaxError::Lex(err) => CompileError::Lex {
            name: source_name.to_string(),
            at: info.trans(err.span().start),
            err,
        },
        | err => CompileError::Syntax {
            name: source_name.to_string(),
            at: info.trans(err.span().start),
            err,
        },
    })?;
    kotoha_dynamics::generate(&prog).map_err(|err| CompileError::Semantic {
        name: source_name.to_string(),
        at: info.trans(err.span().start),
        err,
    })
}

pub fn execute(
    form: &ExecutableForm,
    globals: &mut GlobalScope,
) -> Result<Value, RuntimeError> {
    kotoha_dynamics::execute(form, globals)
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Compile and run in one step.
pub fn run(
    source: &str,
    source_name: &str,
    globals: &mut GlobalScope,
) -> Result<Value, Error> {
    let form = compile(source, source_name)?;
    Ok(execute(&form, globals)?)
}
