//! Run-time side of the pipeline: values, the callable capability,
//! scopes, the code generator, particle argument resolution, the
//! tail-call rewrite and the evaluator.

pub mod err;
pub mod eval;
pub mod gen;
pub mod resolve;
pub mod syntax;
pub mod tailcall;

mod fmt;
mod impls;

pub use err::*;
pub use eval::{eval, execute, Flow};
pub use gen::generate;
pub use syntax::*;
