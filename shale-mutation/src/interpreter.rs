//! The mutation interpreter facade.

use std::sync::Arc;

use arrow::datatypes::SchemaRef;
use shale_eval::ExpressionEngine;
use shale_result::{Error, Result};
use shale_storage::{BoxedBatchStream, EmptyStream, ReadPlan, Storage};

use crate::chain::build_expression_chains;
use crate::command::MutationCommand;
use crate::context::MutationContext;
use crate::estimate::is_storage_touched;
use crate::pipeline::assemble_pipeline;
use crate::propagate::propagate_output_columns;
use crate::select::build_first_stage_query;
use crate::stage::MutationStage;
use crate::stager::stage_commands;
use crate::validate::validate_update_columns;

/// Plans and executes one ordered list of mutation commands.
///
/// Single-threaded, single-use: the plan is built exactly once, by
/// [`validate`](Self::validate) (dry run) or [`execute`](Self::execute)
/// (real run). A second preparation on the same instance is a programming
/// error; construct a new interpreter instead.
pub struct MutationInterpreter {
    storage: Arc<dyn Storage>,
    engine: Arc<dyn ExpressionEngine>,
    context: MutationContext,
    commands: Vec<MutationCommand>,
    stages: Vec<MutationStage>,
    first_stage_plan: Option<Box<dyn ReadPlan>>,
    is_prepared: bool,
}

impl MutationInterpreter {
    pub fn new(
        storage: Arc<dyn Storage>,
        engine: Arc<dyn ExpressionEngine>,
        context: MutationContext,
        commands: Vec<MutationCommand>,
    ) -> Self {
        Self {
            storage,
            engine,
            context,
            commands,
            stages: Vec::new(),
            first_stage_plan: None,
            is_prepared: false,
        }
    }

    /// Cheap existence estimate: could any row be touched by these
    /// commands? Never a false negative; callers may skip
    /// [`execute`](Self::execute) entirely on `false`.
    pub fn is_touched(&self) -> Result<bool> {
        is_storage_touched(
            self.storage.as_ref(),
            &self.commands,
            &self.context.read_settings,
        )
    }

    /// Build the mutation plan. All validation errors surface here,
    /// strictly before any row is read.
    fn prepare(&mut self, dry_run: bool) -> Result<()> {
        if self.is_prepared {
            return Err(Error::AlreadyPrepared);
        }
        if self.commands.is_empty() {
            return Err(Error::EmptyCommandList);
        }

        let columns = self.storage.columns();
        validate_update_columns(columns, &self.commands)?;

        let mut stages = stage_commands(&self.commands)?;
        propagate_output_columns(&mut stages, columns);
        build_expression_chains(&mut stages, columns)?;

        let query = build_first_stage_query(&stages[0]);
        tracing::debug!(
            stages = stages.len(),
            dry_run,
            filtered = query.filter.is_some(),
            "prepared mutation plan"
        );

        let plan = self.storage.plan_read(query, &self.context.read_settings)?;
        self.stages = stages;
        self.first_stage_plan = Some(plan);
        self.is_prepared = true;
        Ok(())
    }

    /// Dry-run the plan: stage, synthesize, type-check, and header-check
    /// the whole pipeline without reading a single row. Returns the final
    /// column layout.
    pub fn validate(&mut self) -> Result<SchemaRef> {
        self.prepare(true)?;
        let header = self
            .first_stage_plan
            .as_ref()
            .ok_or_else(|| Error::LogicalError("prepared plan lost its stage-0 read".into()))?
            .schema();
        let pipeline = assemble_pipeline(
            &self.stages,
            &self.engine,
            &self.context.transfer_limits,
            Box::new(EmptyStream::new(header)),
        )?;
        Ok(pipeline.schema())
    }

    /// Build the plan and return the lazy mutated row-batch stream.
    ///
    /// Consumes the interpreter: the stream is not resumable, and a fresh
    /// instance is needed for another run.
    pub fn execute(mut self) -> Result<BoxedBatchStream> {
        self.prepare(false)?;
        let plan = self
            .first_stage_plan
            .take()
            .ok_or_else(|| Error::LogicalError("prepared plan lost its stage-0 read".into()))?;
        // Sets consumed by the stage-0 read filter must exist before the
        // read runs; later stages create theirs lazily in-stream.
        for id in &self.stages[0].pending_sets {
            self.engine
                .materialize_set(id, &self.context.transfer_limits)?;
        }
        let input = plan.execute()?;
        assemble_pipeline(
            &self.stages,
            &self.engine,
            &self.context.transfer_limits,
            input,
        )
    }

    /// The staged plan, available after preparation. Empty before.
    pub fn stages(&self) -> &[MutationStage] {
        &self.stages
    }
}
