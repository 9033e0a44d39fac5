//! Stages and expression steps of a mutation plan.

use std::collections::BTreeSet;

use shale_expr::{ScalarExpr, SetId};

use crate::command::UpdateCommand;

/// One column an [`ExpressionStep`] computes, by synthesized name.
#[derive(Clone, Debug)]
pub struct ComputedColumn {
    pub name: String,
    pub expr: ScalarExpr,
}

/// One computation unit within a stage's expression chain.
///
/// Applied to a batch in three phases: append every `computed` column,
/// overwrite each `replaced` target with its computed source, then — if
/// `required_output` is non-empty — prune the batch to exactly those
/// columns in that order. An empty `required_output` passes all columns
/// through.
#[derive(Clone, Debug, Default)]
pub struct ExpressionStep {
    pub computed: Vec<ComputedColumn>,
    /// `(target column, computed source column)` pairs, applied in place.
    pub replaced: Vec<(String, String)>,
    pub required_output: Vec<String>,
}

/// A sequential unit of the mutation plan.
///
/// Stage 0 is realized as a read query against storage and only ever
/// carries deletes; later stages become streaming operator chains over
/// the stage-0 stream.
#[derive(Clone, Debug, Default)]
pub struct MutationStage {
    /// Delete predicates in insertion order. `None` is the whole-table
    /// delete.
    pub deletes: Vec<Option<ScalarExpr>>,
    /// At most one update per stage.
    pub update: Option<UpdateCommand>,
    /// Columns this stage hands to the next one. Always a superset of the
    /// previous stage's set.
    pub output_columns: BTreeSet<String>,
    /// Filter/compute/prune steps, built backward from the last stage.
    pub chain: Vec<ExpressionStep>,
    /// Synthesized helper-column name per delete, in stage order. The
    /// first `delete_filter_columns.len()` chain steps are filters.
    pub delete_filter_columns: Vec<String>,
    /// Deferred IN-sets the chain consumes, in first-reference order.
    /// Materialized before the stage's first step runs.
    pub pending_sets: Vec<SetId>,
}
