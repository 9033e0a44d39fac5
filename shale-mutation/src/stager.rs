//! Partitioning of ordered commands into stages.

use shale_result::{Error, Result};

use crate::command::MutationCommand;
use crate::stage::MutationStage;

/// Break the command sequence into stages under the adjacency rule.
///
/// The rule is asymmetric on purpose: a stage that already carries an
/// UPDATE closes to every subsequent command, and the first UPDATE also
/// leaves stage 0 (which only ever holds deletes), but DELETEs otherwise
/// accumulate in the current stage. This determines which row-version
/// each predicate observes.
pub(crate) fn stage_commands(commands: &[MutationCommand]) -> Result<Vec<MutationStage>> {
    let mut stages = vec![MutationStage::default()];
    for command in commands {
        let last = stages.len() - 1;
        if stages[last].update.is_some() {
            stages.push(MutationStage::default());
        }
        let last = stages.len() - 1;
        match command {
            MutationCommand::Delete { predicate } => {
                stages[last].deletes.push(predicate.clone());
            }
            MutationCommand::Update(update) => {
                // First stage only supports DELETEs.
                if stages.len() == 1 {
                    stages.push(MutationStage::default());
                }
                let last = stages.len() - 1;
                stages[last].update = Some(update.clone());
            }
            other => return Err(Error::UnknownCommand(other.tag().to_string())),
        }
    }
    Ok(stages)
}

#[cfg(test)]
mod tests {
    use shale_expr::{CompareOp, ScalarExpr};

    use super::*;

    fn delete(col: &str) -> MutationCommand {
        MutationCommand::delete(ScalarExpr::compare(
            ScalarExpr::column(col),
            CompareOp::Eq,
            ScalarExpr::literal(1),
        ))
    }

    fn update(col: &str) -> MutationCommand {
        MutationCommand::update(
            ScalarExpr::compare(
                ScalarExpr::column(col),
                CompareOp::Gt,
                ScalarExpr::literal(0),
            ),
            vec![(col, ScalarExpr::literal(2))],
        )
    }

    #[test]
    fn consecutive_deletes_share_stage_zero() {
        let stages = stage_commands(&[delete("a"), delete("b"), delete("c")]).unwrap();
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].deletes.len(), 3);
        assert!(stages[0].update.is_none());
    }

    #[test]
    fn first_update_leaves_stage_zero() {
        let stages = stage_commands(&[update("a")]).unwrap();
        assert_eq!(stages.len(), 2);
        assert!(stages[0].deletes.is_empty());
        assert!(stages[0].update.is_none());
        assert!(stages[1].update.is_some());
    }

    #[test]
    fn delete_then_update_splits_after_stage_zero() {
        let stages = stage_commands(&[delete("x"), update("a")]).unwrap();
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].deletes.len(), 1);
        assert!(stages[1].update.is_some());
        assert!(stages[1].deletes.is_empty());
    }

    #[test]
    fn update_bearing_stage_closes_to_any_command() {
        // [U, D] -> stage 0 empty, stage 1 carries U, stage 2 carries D.
        let stages = stage_commands(&[update("a"), delete("x")]).unwrap();
        assert_eq!(stages.len(), 3);
        assert!(stages[1].update.is_some());
        assert_eq!(stages[2].deletes.len(), 1);
        assert!(stages[2].update.is_none());

        // [U, U] -> two update stages.
        let stages = stage_commands(&[update("a"), update("b")]).unwrap();
        assert_eq!(stages.len(), 3);
        assert!(stages[1].update.is_some());
        assert!(stages[2].update.is_some());
    }

    #[test]
    fn update_then_deletes_accumulate_in_one_new_stage() {
        // The stage opened after an update has no update of its own, so
        // further deletes stay in it.
        let stages = stage_commands(&[update("a"), delete("x"), delete("y")]).unwrap();
        assert_eq!(stages.len(), 3);
        assert_eq!(stages[2].deletes.len(), 2);
    }

    #[test]
    fn unsupported_command_is_rejected() {
        let command = MutationCommand::MaterializeColumn {
            column: "a_twice".into(),
        };
        match stage_commands(&[command]) {
            Err(Error::UnknownCommand(tag)) => assert_eq!(tag, "MATERIALIZE COLUMN"),
            other => panic!("expected UnknownCommand, got {other:?}"),
        }
    }
}
