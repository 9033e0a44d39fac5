//! UPDATE target-column validation.

use shale_result::{Error, Result};
use shale_storage::TableColumns;

use crate::command::MutationCommand;

/// Check that every UPDATE target is a real, settable column.
///
/// Runs before staging; the only effect is the error it may raise.
pub(crate) fn validate_update_columns(
    columns: &TableColumns,
    commands: &[MutationCommand],
) -> Result<()> {
    for command in commands {
        let MutationCommand::Update(update) = command else {
            continue;
        };
        for column_name in update.assignments.keys() {
            if columns.is_ordinary(column_name) {
                continue;
            }
            if columns.is_materialized(column_name) {
                return Err(Error::CannotUpdateColumn(column_name.clone()));
            }
            return Err(Error::NoSuchColumn(column_name.clone()));
        }
    }
    Ok(())
}
