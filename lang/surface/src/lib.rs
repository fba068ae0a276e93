//! Surface syntax: tokens, lexer, AST and the backtracking parser.

pub mod ast;
pub mod err;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::*;
pub use err::*;
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::*;
