//! Forward propagation of per-stage output column sets.

use shale_storage::TableColumns;

use crate::stage::MutationStage;

/// For each stage in order, compute the columns it must produce.
///
/// A stage with any delete outputs the full physical column set: a
/// predicate may reference any column even though the row count shrinks.
/// Otherwise the stage inherits its predecessor's set, widened by the
/// update's target columns when the set is not already full.
pub(crate) fn propagate_output_columns(stages: &mut [MutationStage], columns: &TableColumns) {
    for i in 0..stages.len() {
        if !stages[i].deletes.is_empty() {
            stages[i].output_columns = columns
                .all_physical()
                .map(|col| col.name.clone())
                .collect();
            continue;
        }

        if i > 0 {
            stages[i].output_columns = stages[i - 1].output_columns.clone();
        }

        if stages[i].output_columns.len() < columns.physical_len() {
            if let Some(update) = &stages[i].update {
                let targets: Vec<String> = update.assignments.keys().cloned().collect();
                stages[i].output_columns.extend(targets);
            }
        }
    }
}
