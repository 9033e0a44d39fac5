//! Storage collaborator interface for the shale mutation engine.
//!
//! The mutation planner never talks to physical storage directly; it
//! consumes the seam defined here: physical column metadata
//! ([`TableColumns`]), a declarative read query ([`SelectQuery`]), read
//! settings ([`ReadSettings`]), and a pull-based row-batch stream
//! ([`BatchStream`]). Concrete engines implement [`Storage`].
#![forbid(unsafe_code)]

pub mod columns;
pub mod query;
pub mod settings;
pub mod stream;

pub use columns::{ColumnMeta, TableColumns};
pub use query::{SelectProjection, SelectQuery, COUNT_COLUMN_NAME};
pub use settings::ReadSettings;
pub use stream::{BatchStream, BoxedBatchStream, EmptyStream};

use arrow::datatypes::SchemaRef;
use shale_result::Result;

/// A read query planned against storage but not yet executed.
///
/// Planning resolves the projection and filter against the table layout and
/// fixes the output header; only [`ReadPlan::execute`] touches rows. A
/// dry-run caller inspects [`ReadPlan::schema`] and drops the plan.
pub trait ReadPlan {
    /// Header of the stream this plan would produce.
    fn schema(&self) -> SchemaRef;

    /// Run the read and return the lazy batch stream.
    fn execute(self: Box<Self>) -> Result<BoxedBatchStream>;
}

/// Read-side surface a storage engine offers to the mutation planner.
pub trait Storage: Send + Sync {
    /// Physical column metadata, ordinary and materialized.
    fn columns(&self) -> &TableColumns;

    /// Plan a read query under the given settings.
    fn plan_read(&self, query: SelectQuery, settings: &ReadSettings) -> Result<Box<dyn ReadPlan>>;
}
