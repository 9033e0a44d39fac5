//! Mutation command model.

use std::collections::BTreeMap;

use shale_expr::{Literal, ScalarExpr};

/// One UPDATE instruction: a row predicate plus per-column replacement
/// expressions.
///
/// Assignments are keyed by target column name, so keys are unique by
/// construction and iterate in a deterministic order.
#[derive(Clone, Debug)]
pub struct UpdateCommand {
    pub predicate: ScalarExpr,
    pub assignments: BTreeMap<String, ScalarExpr>,
}

/// One mutation command, in the order the user issued it.
///
/// A closed tagged union: the planner matches tags exhaustively, and the
/// staging pass rejects anything it does not plan with
/// [`Error::UnknownCommand`].
///
/// [`Error::UnknownCommand`]: shale_result::Error::UnknownCommand
#[derive(Clone, Debug)]
pub enum MutationCommand {
    /// Row-level delete. A missing predicate is the degenerate
    /// whole-table form: every row is affected.
    Delete { predicate: Option<ScalarExpr> },
    /// Row-level update.
    Update(UpdateCommand),
    /// Recompute a materialized column. Part of the wider command
    /// vocabulary but not handled by this planner.
    MaterializeColumn { column: String },
}

impl MutationCommand {
    pub fn delete(predicate: ScalarExpr) -> Self {
        MutationCommand::Delete {
            predicate: Some(predicate),
        }
    }

    /// The degenerate DELETE that affects every row.
    pub fn delete_all() -> Self {
        MutationCommand::Delete { predicate: None }
    }

    pub fn update<K>(
        predicate: ScalarExpr,
        assignments: impl IntoIterator<Item = (K, ScalarExpr)>,
    ) -> Self
    where
        K: Into<String>,
    {
        MutationCommand::Update(UpdateCommand {
            predicate,
            assignments: assignments
                .into_iter()
                .map(|(column, expr)| (column.into(), expr))
                .collect(),
        })
    }

    /// The row predicate of this command, if it has one. Commands without
    /// a predicate affect all rows.
    pub fn predicate(&self) -> Option<&ScalarExpr> {
        match self {
            MutationCommand::Delete { predicate } => predicate.as_ref(),
            MutationCommand::Update(update) => Some(&update.predicate),
            MutationCommand::MaterializeColumn { .. } => None,
        }
    }

    /// Human-readable command tag for error messages.
    pub fn tag(&self) -> &'static str {
        match self {
            MutationCommand::Delete { .. } => "DELETE",
            MutationCommand::Update(_) => "UPDATE",
            MutationCommand::MaterializeColumn { .. } => "MATERIALIZE COLUMN",
        }
    }
}

/// Filter that retains the rows a delete does NOT affect: `NOT(pred)`,
/// or constant FALSE for the whole-table form.
pub(crate) fn delete_filter(predicate: Option<&ScalarExpr>) -> ScalarExpr {
    match predicate {
        Some(predicate) => ScalarExpr::not(predicate.clone()),
        None => ScalarExpr::Literal(Literal::Boolean(false)),
    }
}
