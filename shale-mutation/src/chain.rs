//! Backward synthesis of per-stage expression chains.

use rustc_hash::FxHashSet;
use shale_expr::ScalarExpr;
use shale_result::{Error, Result};
use shale_storage::TableColumns;

use crate::command::delete_filter;
use crate::stage::{ComputedColumn, ExpressionStep, MutationStage};

/// Build the expression chain for every stage except the first, walking
/// backward so each stage's required-input columns widen the previous
/// stage's output set.
pub(crate) fn build_expression_chains(
    stages: &mut [MutationStage],
    columns: &TableColumns,
) -> Result<()> {
    for i in (1..stages.len()).rev() {
        let (head, tail) = stages.split_at_mut(i);
        let stage = &mut tail[0];
        build_stage_chain(stage, columns)?;

        // Everything the chain reads must arrive from upstream: the stage's
        // own output set plus every column its synthesized expressions
        // reference.
        let mut required: FxHashSet<String> = stage.output_columns.iter().cloned().collect();
        for step in &stage.chain {
            for computed in &step.computed {
                computed.expr.collect_columns(&mut required);
            }
        }
        head[i - 1].output_columns.extend(required);
    }

    // Stage 0's filters run inside the storage read, not behind a
    // set-creating stream wrapper, so its sets are recorded here and
    // materialized by the caller before the read plan executes.
    let mut sets = Vec::new();
    for predicate in &stages[0].deletes {
        delete_filter(predicate.as_ref()).collect_sets(&mut sets);
    }
    stages[0].pending_sets = sets;
    Ok(())
}

/// Synthesize one stage's filter/compute/prune steps.
fn build_stage_chain(stage: &mut MutationStage, columns: &TableColumns) -> Result<()> {
    let mut chain = Vec::new();
    let mut filter_names = Vec::new();
    let mut pending_sets = Vec::new();

    // Filters apply sequentially, one step per delete: each must
    // independently gate the steps after it.
    for predicate in &stage.deletes {
        let filter = delete_filter(predicate.as_ref());
        filter.collect_sets(&mut pending_sets);
        filter_names.push(filter.result_name());
        chain.push(ExpressionStep {
            computed: vec![ComputedColumn {
                name: filter.result_name(),
                expr: filter,
            }],
            replaced: Vec::new(),
            required_output: Vec::new(),
        });
    }

    if let Some(update) = &stage.update {
        let mut computed = Vec::new();
        let mut replaced = Vec::new();
        for (column, replacement) in &update.assignments {
            let declared = columns.data_type(column).cloned().ok_or_else(|| {
                Error::LogicalError(format!(
                    "update target {column} disappeared after validation"
                ))
            })?;
            // Rows not matching the predicate keep their original value;
            // the cast restores the column's declared type after any
            // widening the replacement expression produced.
            let synthesized = ScalarExpr::cast(
                ScalarExpr::if_then_else(
                    update.predicate.clone(),
                    replacement.clone(),
                    ScalarExpr::column(column),
                ),
                declared,
            );
            synthesized.collect_sets(&mut pending_sets);
            let name = synthesized.result_name();
            replaced.push((column.clone(), name.clone()));
            computed.push(ComputedColumn {
                name,
                expr: synthesized,
            });
        }
        chain.push(ExpressionStep {
            computed,
            replaced,
            required_output: Vec::new(),
        });
    }

    // Final pruning step: exactly the stage's output columns survive, so
    // no synthesized helper ever leaks downstream.
    chain.push(ExpressionStep {
        computed: Vec::new(),
        replaced: Vec::new(),
        required_output: stage.output_columns.iter().cloned().collect(),
    });

    stage.chain = chain;
    stage.delete_filter_columns = filter_names;
    stage.pending_sets = pending_sets;
    Ok(())
}

#[cfg(test)]
mod tests {
    use arrow::datatypes::DataType;
    use shale_expr::{CompareOp, SetId};
    use shale_storage::ColumnMeta;

    use super::*;
    use crate::command::MutationCommand;
    use crate::propagate::propagate_output_columns;
    use crate::stager::stage_commands;

    fn columns() -> TableColumns {
        TableColumns::new(
            vec![
                ColumnMeta::new("a", DataType::Int64),
                ColumnMeta::new("b", DataType::Int64),
            ],
            vec![],
        )
    }

    fn pred(col: &str) -> ScalarExpr {
        ScalarExpr::compare(
            ScalarExpr::column(col),
            CompareOp::Gt,
            ScalarExpr::literal(100),
        )
    }

    fn plan(commands: &[MutationCommand]) -> Vec<MutationStage> {
        let columns = columns();
        let mut stages = stage_commands(commands).unwrap();
        propagate_output_columns(&mut stages, &columns);
        build_expression_chains(&mut stages, &columns).unwrap();
        stages
    }

    #[test]
    fn update_chain_synthesizes_cast_if_and_prunes() {
        let update = MutationCommand::update(
            pred("b"),
            vec![(
                "a",
                ScalarExpr::binary(
                    ScalarExpr::column("a"),
                    shale_expr::BinaryOp::Add,
                    ScalarExpr::literal(1),
                ),
            )],
        );
        let stages = plan(&[update]);
        let stage = &stages[1];
        assert_eq!(stage.chain.len(), 2);

        let compute = &stage.chain[0];
        assert_eq!(compute.computed.len(), 1);
        assert_eq!(
            compute.computed[0].name,
            "CAST(IF((b > 100), (a + 1), a) AS Int64)"
        );
        assert_eq!(compute.replaced, vec![("a".to_string(), compute.computed[0].name.clone())]);

        let prune = &stage.chain[1];
        assert!(prune.computed.is_empty());
        // The update stage's own output set holds only the target column.
        assert_eq!(prune.required_output, vec!["a"]);
    }

    #[test]
    fn required_input_widens_upstream_output() {
        let update = MutationCommand::update(
            pred("b"),
            vec![("a", ScalarExpr::literal(5))],
        );
        let stages = plan(&[update]);
        // Stage 0 nominally outputs nothing, but the update stage needs
        // both its predicate column and the original target value.
        let stage0: Vec<_> = stages[0].output_columns.iter().cloned().collect();
        assert_eq!(stage0, vec!["a", "b"]);
    }

    #[test]
    fn delete_steps_stay_sequential_and_ordered() {
        let commands = [
            MutationCommand::update(pred("a"), vec![("a", ScalarExpr::literal(0))]),
            MutationCommand::delete(pred("a")),
            MutationCommand::delete(pred("b")),
        ];
        let stages = plan(&commands);
        let stage = &stages[2];
        assert_eq!(stage.delete_filter_columns.len(), 2);
        assert_eq!(stage.delete_filter_columns[0], "NOT (a > 100)");
        assert_eq!(stage.delete_filter_columns[1], "NOT (b > 100)");
        // Two filter steps plus the final prune.
        assert_eq!(stage.chain.len(), 3);
        assert!(stage.chain[2].computed.is_empty());
    }

    #[test]
    fn pending_sets_collected_in_first_reference_order() {
        let in_set = ScalarExpr::InSet {
            expr: Box::new(ScalarExpr::column("a")),
            set: SetId::new("sub1"),
            negated: false,
        };
        let commands = [
            MutationCommand::update(in_set.clone(), vec![("a", ScalarExpr::literal(0))]),
            MutationCommand::delete(in_set),
        ];
        let stages = plan(&commands);
        assert_eq!(stages[1].pending_sets, vec![SetId::new("sub1")]);
        assert_eq!(stages[2].pending_sets, vec![SetId::new("sub1")]);
    }
}
