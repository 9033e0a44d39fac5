//! Expression-engine collaborator interface for the shale mutation engine.
//!
//! The planner synthesizes expression trees (`shale-expr`) but delegates
//! everything about their meaning to an [`ExpressionEngine`]: result-type
//! inference for zero-I/O validation, per-batch evaluation during pipeline
//! execution, and materialization of deferred IN-sets under configured
//! [`TransferLimits`].
#![forbid(unsafe_code)]

pub mod limits;

pub use limits::{OverflowPolicy, TransferLimits};

use arrow::array::{ArrayRef, RecordBatch};
use arrow::datatypes::{DataType, Schema};
use shale_expr::{ScalarExpr, SetId};
use shale_result::Result;

/// Evaluation surface an expression engine offers to the mutation planner.
///
/// Implementations must be deterministic: the array returned by
/// [`evaluate`](Self::evaluate) carries exactly the type reported by
/// [`expression_type`](Self::expression_type) for the batch's schema.
pub trait ExpressionEngine: Send + Sync {
    /// Infer the result type of `expr` against `input`, failing on unknown
    /// columns or ill-typed nodes. Performs no I/O.
    fn expression_type(&self, expr: &ScalarExpr, input: &Schema) -> Result<DataType>;

    /// Evaluate `expr` over one batch, producing one array of the batch's
    /// row count.
    fn evaluate(&self, expr: &ScalarExpr, batch: &RecordBatch) -> Result<ArrayRef>;

    /// Force a deferred set into existence, honoring `limits`. Idempotent:
    /// materializing an already-built set is a no-op.
    fn materialize_set(&self, id: &SetId, limits: &TransferLimits) -> Result<()>;
}
