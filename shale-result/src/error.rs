use std::io;

use thiserror::Error;

/// Unified error type for all shale operations.
///
/// Mutation planning surfaces every validation failure during `prepare`,
/// strictly before any row is read, so a malformed mutation never partially
/// executes. Variants therefore split into three groups: user-input errors
/// (bad commands, unknown columns), programming errors on the interpreter
/// lifecycle, and internal-invariant violations that indicate a bug in a
/// collaborator engine.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during storage operations.
    ///
    /// The planner itself performs no I/O; this variant exists so storage
    /// implementations behind the [`Storage`] seam can propagate disk
    /// failures through the shared result type.
    ///
    /// [`Storage`]: https://docs.rs/shale-storage
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Arrow library error during columnar data operations.
    ///
    /// Raised when building record batches, casting arrays, or running
    /// compute kernels over batch columns. Usually indicates a data format
    /// incompatibility between an expression result and its target column.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Invalid user input or API parameter.
    ///
    /// The message string describes what was invalid and why. These errors
    /// are recoverable: fix the input and retry.
    #[error("Invalid argument: {0}")]
    InvalidArgumentError(String),

    /// A referenced table, column, or set does not exist.
    #[error("Storage entity not found")]
    NotFound,

    /// A mutation command kind the planner does not support.
    ///
    /// The staging pass matches command tags exhaustively; anything other
    /// than DELETE or UPDATE lands here.
    #[error("Unknown mutation command: {0}")]
    UnknownCommand(String),

    /// An UPDATE targets a column absent from the table's physical columns.
    #[error("There is no column {0} in table")]
    NoSuchColumn(String),

    /// An UPDATE targets a materialized (computed) column.
    ///
    /// Materialized columns derive their values from other columns and are
    /// not directly settable.
    #[error("Cannot UPDATE materialized column {0}")]
    CannotUpdateColumn(String),

    /// `prepare` was invoked twice on the same interpreter instance.
    ///
    /// The mutation plan is built exactly once per interpreter; a second
    /// `prepare` is a programming error in the caller, not a recoverable
    /// condition.
    #[error("Mutation interpreter is already prepared. It is a bug.")]
    AlreadyPrepared,

    /// `prepare` was invoked with no commands.
    #[error("Empty mutation commands list")]
    EmptyCommandList,

    /// Internal-invariant violation.
    ///
    /// Indicates a bug in this workspace or in a collaborator engine (for
    /// example, a count() aggregate returning more than one row). These
    /// should never occur during normal operation.
    #[error("Logical error: {0}")]
    LogicalError(String),

    /// A configured size limit was exceeded while materializing a deferred
    /// set under [`OverflowPolicy::Raise`].
    ///
    /// [`OverflowPolicy::Raise`]: https://docs.rs/shale-eval
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),
}
