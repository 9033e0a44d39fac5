//! Error types and result definitions for the shale mutation engine.
//!
//! This crate provides a unified error type ([`Error`]) and result type alias
//! ([`Result<T>`]) used throughout all shale crates. All operations that could
//! fail return `Result<T>`, where the error variant contains detailed
//! information about what went wrong.
//!
//! # Error Philosophy
//!
//! Shale uses a single error enum rather than crate-specific error types.
//! This approach:
//! - Simplifies error handling across crate boundaries
//! - Allows errors to propagate naturally with the `?` operator
//! - Enables structured error matching for programmatic handling
//!
//! Errors raised by collaborator engines (storage reads, expression
//! evaluation) propagate unmodified; nothing in this workspace retries or
//! suppresses them.
#![forbid(unsafe_code)]

pub mod error;
pub mod result;

pub use error::Error;
pub use result::Result;
