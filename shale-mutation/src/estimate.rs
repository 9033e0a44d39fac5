//! Cheap existence pre-check for no-op mutations.

use arrow::array::{Array, UInt64Array};
use shale_expr::ScalarExpr;
use shale_result::{Error, Result};
use shale_storage::{ReadSettings, SelectQuery, Storage, COUNT_COLUMN_NAME};

/// Whether any row could be touched by `commands`.
///
/// Runs `SELECT count() WHERE p1 OR p2 OR ...` as an independent,
/// complete sub-read forced to single-threaded, non-distributed settings
/// so the aggregate arrives as one deterministic batch.
///
/// The estimate is conservative: an UPDATE may change how many rows
/// satisfy the predicates of subsequent commands, so the count can
/// overestimate — but count = 0 guarantees no row will be touched.
pub(crate) fn is_storage_touched(
    storage: &dyn Storage,
    commands: &[crate::command::MutationCommand],
    settings: &ReadSettings,
) -> Result<bool> {
    if commands.is_empty() {
        return Ok(false);
    }

    let mut predicates = Vec::with_capacity(commands.len());
    for command in commands {
        match command.predicate() {
            // The command touches all rows; no scan needed.
            None => return Ok(true),
            Some(predicate) => predicates.push(predicate.clone()),
        }
    }

    let filter = match ScalarExpr::or_all(predicates) {
        Some(filter) => filter,
        None => return Ok(false),
    };

    let plan = storage.plan_read(
        SelectQuery::count_star().with_filter(filter),
        &settings.for_existence_check(),
    )?;
    let mut stream = plan.execute()?;

    let batch = match stream.next_batch()? {
        None => return Ok(false),
        Some(batch) => batch,
    };
    if batch.num_rows() != 1 {
        return Err(Error::LogicalError(format!(
            "count() expression returned {} rows, not 1",
            batch.num_rows()
        )));
    }

    let column = batch.column_by_name(COUNT_COLUMN_NAME).ok_or_else(|| {
        Error::LogicalError(format!("count() result lacks the {COUNT_COLUMN_NAME} column"))
    })?;
    let counts = column
        .as_any()
        .downcast_ref::<UInt64Array>()
        .ok_or_else(|| {
            Error::LogicalError(format!(
                "count() column has unexpected type {}",
                column.data_type()
            ))
        })?;
    Ok(counts.value(0) != 0)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::RecordBatch;
    use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
    use shale_expr::CompareOp;
    use shale_storage::{BatchStream, BoxedBatchStream, ColumnMeta, ReadPlan, TableColumns};

    use super::*;
    use crate::command::MutationCommand;

    /// Storage stub whose count() query yields a fixed set of batches.
    struct FixedCountStorage {
        columns: TableColumns,
        batches: Vec<RecordBatch>,
    }

    struct FixedPlan {
        schema: SchemaRef,
        batches: Vec<RecordBatch>,
    }

    struct FixedStream {
        schema: SchemaRef,
        batches: std::vec::IntoIter<RecordBatch>,
    }

    impl BatchStream for FixedStream {
        fn schema(&self) -> SchemaRef {
            self.schema.clone()
        }
        fn next_batch(&mut self) -> Result<Option<RecordBatch>> {
            Ok(self.batches.next())
        }
    }

    impl ReadPlan for FixedPlan {
        fn schema(&self) -> SchemaRef {
            self.schema.clone()
        }
        fn execute(self: Box<Self>) -> Result<BoxedBatchStream> {
            Ok(Box::new(FixedStream {
                schema: self.schema,
                batches: self.batches.into_iter(),
            }))
        }
    }

    impl Storage for FixedCountStorage {
        fn columns(&self) -> &TableColumns {
            &self.columns
        }
        fn plan_read(
            &self,
            _query: SelectQuery,
            settings: &ReadSettings,
        ) -> Result<Box<dyn ReadPlan>> {
            assert_eq!(settings.max_threads, 1);
            assert!(!settings.distributed);
            Ok(Box::new(FixedPlan {
                schema: count_schema(),
                batches: self.batches.clone(),
            }))
        }
    }

    fn count_schema() -> SchemaRef {
        Arc::new(Schema::new(vec![Field::new(
            COUNT_COLUMN_NAME,
            DataType::UInt64,
            false,
        )]))
    }

    fn count_batch(values: Vec<u64>) -> RecordBatch {
        RecordBatch::try_new(count_schema(), vec![Arc::new(UInt64Array::from(values))]).unwrap()
    }

    fn storage(batches: Vec<RecordBatch>) -> FixedCountStorage {
        FixedCountStorage {
            columns: TableColumns::new(vec![ColumnMeta::new("x", DataType::Int64)], vec![]),
            batches,
        }
    }

    fn delete_where_x_lt(value: i64) -> MutationCommand {
        MutationCommand::delete(ScalarExpr::compare(
            ScalarExpr::column("x"),
            CompareOp::Lt,
            ScalarExpr::literal(value),
        ))
    }

    #[test]
    fn empty_command_list_is_untouched() {
        let storage = storage(vec![count_batch(vec![7])]);
        assert!(!is_storage_touched(&storage, &[], &ReadSettings::default()).unwrap());
    }

    #[test]
    fn predicate_less_command_short_circuits_without_scan() {
        // Storage would blow the one-row invariant if consulted.
        let storage = storage(vec![count_batch(vec![1, 2])]);
        let commands = [delete_where_x_lt(0), MutationCommand::delete_all()];
        assert!(is_storage_touched(&storage, &commands, &ReadSettings::default()).unwrap());
    }

    #[test]
    fn zero_batches_means_untouched() {
        let storage = storage(vec![]);
        let commands = [delete_where_x_lt(0)];
        assert!(!is_storage_touched(&storage, &commands, &ReadSettings::default()).unwrap());
    }

    #[test]
    fn count_decides_touched() {
        let commands = [delete_where_x_lt(0), delete_where_x_lt(10)];
        let hit = storage(vec![count_batch(vec![3])]);
        assert!(is_storage_touched(&hit, &commands, &ReadSettings::default()).unwrap());
        let miss = storage(vec![count_batch(vec![0])]);
        assert!(!is_storage_touched(&miss, &commands, &ReadSettings::default()).unwrap());
    }

    #[test]
    fn multi_row_aggregate_is_a_logical_error() {
        let storage = storage(vec![count_batch(vec![1, 2])]);
        let commands = [delete_where_x_lt(0)];
        match is_storage_touched(&storage, &commands, &ReadSettings::default()) {
            Err(Error::LogicalError(msg)) => {
                assert!(msg.contains("returned 2 rows"), "{msg}");
            }
            other => panic!("expected LogicalError, got {other:?}"),
        }
    }
}
