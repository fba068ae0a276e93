pub mod span;
pub use span::*;
