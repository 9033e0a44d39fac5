//! Stage 0 as a read-and-filter query against storage.

use shale_expr::ScalarExpr;
use shale_storage::SelectQuery;

use crate::command::delete_filter;
use crate::stage::MutationStage;

/// Turn stage 0 into a storage read projecting exactly its output columns,
/// filtered by the AND of its negated delete predicates (a lone delete's
/// filter is used directly).
pub(crate) fn build_first_stage_query(stage: &MutationStage) -> SelectQuery {
    let mut query = SelectQuery::columns(stage.output_columns.iter().cloned().collect());
    if !stage.deletes.is_empty() {
        let filters: Vec<ScalarExpr> = stage
            .deletes
            .iter()
            .map(|predicate| delete_filter(predicate.as_ref()))
            .collect();
        if let Some(filter) = ScalarExpr::and_all(filters) {
            query = query.with_filter(filter);
        }
    }
    query
}
