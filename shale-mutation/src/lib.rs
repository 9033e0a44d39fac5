//! Mutation planner/executor for a column-oriented storage engine.
//!
//! Compiles an ordered list of row-level DELETE/UPDATE commands into the
//! fewest possible sequential passes over the table, then drives a lazy
//! row-batch pipeline that reads, filters, recomputes, and re-projects
//! data.
//!
//! Planning happens entirely before any row is read: commands are
//! partitioned into stages, output-column sets flow forward through the
//! stage list, filter/update expressions and required-input sets flow
//! backward, and stage 0 becomes a read-and-filter query against storage.
//! Later stages become streaming operators over the stage-0 stream. The
//! same plan powers both [`MutationInterpreter::validate`] (dry run,
//! header-only, zero I/O) and [`MutationInterpreter::execute`].
//!
//! Each UPDATE observes rows as affected by all prior commands, not the
//! original table; the staging rule exists to preserve exactly that.
#![forbid(unsafe_code)]

pub mod command;
pub mod context;
pub mod interpreter;
pub mod pipeline;
pub mod stage;

mod chain;
mod estimate;
mod propagate;
mod select;
mod stager;
mod validate;

pub use command::{MutationCommand, UpdateCommand};
pub use context::MutationContext;
pub use interpreter::MutationInterpreter;
pub use stage::{ComputedColumn, ExpressionStep, MutationStage};
