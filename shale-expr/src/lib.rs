#![forbid(unsafe_code)]

pub mod expr;
pub use expr::*;

// Note: For API simplicity these are also exported out of `expr`.
pub mod format;
pub mod literal;
pub use literal::Literal;
