//! Streaming operators realizing stages 1..n over the stage-0 stream.
//!
//! Every adapter fixes its output schema at construction, from its input
//! schema and the engine's type inference alone. Dry-run validation
//! therefore assembles the exact execution pipeline over an
//! [`EmptyStream`] and reads the final header with zero I/O; any type
//! error an adapter would hit at runtime surfaces right here.
//!
//! [`EmptyStream`]: shale_storage::EmptyStream

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, RecordBatch};
use arrow::compute::{cast, filter_record_batch};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use rustc_hash::FxHashMap;
use shale_eval::{ExpressionEngine, TransferLimits};
use shale_expr::{ScalarExpr, SetId};
use shale_result::{Error, Result};
use shale_storage::{BatchStream, BoxedBatchStream};

use crate::stage::{ExpressionStep, MutationStage};

/// Retains rows where a synthesized boolean filter holds.
///
/// The helper column never joins the batch: it is evaluated as a mask and
/// discarded, so the stream's schema equals its input's.
pub struct FilterStream {
    input: BoxedBatchStream,
    engine: Arc<dyn ExpressionEngine>,
    expr: ScalarExpr,
    filter_column: String,
    schema: SchemaRef,
}

impl FilterStream {
    pub fn new(
        input: BoxedBatchStream,
        engine: Arc<dyn ExpressionEngine>,
        expr: ScalarExpr,
        filter_column: String,
    ) -> Result<Self> {
        let schema = input.schema();
        let filter_type = engine.expression_type(&expr, &schema)?;
        if filter_type != DataType::Boolean {
            return Err(Error::InvalidArgumentError(format!(
                "filter column {filter_column} has type {filter_type}, expected Boolean"
            )));
        }
        Ok(Self {
            input,
            engine,
            expr,
            filter_column,
            schema,
        })
    }
}

impl BatchStream for FilterStream {
    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn next_batch(&mut self) -> Result<Option<RecordBatch>> {
        let batch = match self.input.next_batch()? {
            None => return Ok(None),
            Some(batch) => batch,
        };
        let mask = self.engine.evaluate(&self.expr, &batch)?;
        let mask = mask
            .as_any()
            .downcast_ref::<BooleanArray>()
            .ok_or_else(|| {
                Error::LogicalError(format!(
                    "filter column {} evaluated to a non-boolean array",
                    self.filter_column
                ))
            })?;
        Ok(Some(filter_record_batch(&batch, mask)?))
    }
}

/// Applies one expression step: append computed columns, overwrite
/// replaced targets, prune to the step's required output.
pub struct StepStream {
    input: BoxedBatchStream,
    engine: Arc<dyn ExpressionEngine>,
    step: ExpressionStep,
    schema: SchemaRef,
}

impl StepStream {
    pub fn new(
        input: BoxedBatchStream,
        engine: Arc<dyn ExpressionEngine>,
        step: ExpressionStep,
    ) -> Result<Self> {
        let schema = Self::output_schema(&step, &input.schema(), engine.as_ref())?;
        Ok(Self {
            input,
            engine,
            step,
            schema,
        })
    }

    fn output_schema(
        step: &ExpressionStep,
        input: &Schema,
        engine: &dyn ExpressionEngine,
    ) -> Result<SchemaRef> {
        let mut fields: Vec<Field> = input
            .fields()
            .iter()
            .map(|field| field.as_ref().clone())
            .collect();
        let mut index: FxHashMap<String, usize> = fields
            .iter()
            .enumerate()
            .map(|(i, field)| (field.name().clone(), i))
            .collect();

        for computed in &step.computed {
            let data_type = engine.expression_type(&computed.expr, input)?;
            index.insert(computed.name.clone(), fields.len());
            fields.push(Field::new(computed.name.clone(), data_type, true));
        }

        for (target, source) in &step.replaced {
            let source_idx = *index.get(source).ok_or_else(|| {
                Error::LogicalError(format!("replacement source column {source} missing"))
            })?;
            let target_idx = *index.get(target).ok_or_else(|| {
                Error::LogicalError(format!("replacement target column {target} missing"))
            })?;
            let data_type = fields[source_idx].data_type().clone();
            fields[target_idx] = Field::new(target.clone(), data_type, true);
        }

        if step.required_output.is_empty() {
            return Ok(Arc::new(Schema::new(fields)));
        }
        let mut pruned = Vec::with_capacity(step.required_output.len());
        for name in &step.required_output {
            let idx = *index.get(name).ok_or_else(|| {
                Error::LogicalError(format!("required output column {name} missing"))
            })?;
            pruned.push(fields[idx].clone());
        }
        Ok(Arc::new(Schema::new(pruned)))
    }
}

impl BatchStream for StepStream {
    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn next_batch(&mut self) -> Result<Option<RecordBatch>> {
        let batch = match self.input.next_batch()? {
            None => return Ok(None),
            Some(batch) => batch,
        };

        let mut columns: Vec<ArrayRef> = batch.columns().to_vec();
        let mut index: FxHashMap<String, usize> = batch
            .schema()
            .fields()
            .iter()
            .enumerate()
            .map(|(i, field)| (field.name().clone(), i))
            .collect();

        // Synthesized expressions only reference input columns, so each is
        // evaluated against the original batch.
        for computed in &self.step.computed {
            let array = self.engine.evaluate(&computed.expr, &batch)?;
            index.insert(computed.name.clone(), columns.len());
            columns.push(array);
        }

        for (target, source) in &self.step.replaced {
            let source_idx = *index.get(source).ok_or_else(|| {
                Error::LogicalError(format!("replacement source column {source} missing"))
            })?;
            let target_idx = *index.get(target).ok_or_else(|| {
                Error::LogicalError(format!("replacement target column {target} missing"))
            })?;
            columns[target_idx] = columns[source_idx].clone();
        }

        let output: Result<Vec<ArrayRef>> = self
            .schema
            .fields()
            .iter()
            .map(|field| {
                index
                    .get(field.name())
                    .map(|idx| columns[*idx].clone())
                    .ok_or_else(|| {
                        Error::LogicalError(format!("step output column {} missing", field.name()))
                    })
            })
            .collect();
        Ok(Some(RecordBatch::try_new(self.schema.clone(), output?)?))
    }
}

/// Forces a stage's deferred IN-sets into existence before its first
/// batch flows, under the configured limits and overflow policy.
pub struct CreatingSetsStream {
    input: BoxedBatchStream,
    engine: Arc<dyn ExpressionEngine>,
    sets: Vec<SetId>,
    limits: TransferLimits,
    created: bool,
}

impl CreatingSetsStream {
    pub fn new(
        input: BoxedBatchStream,
        engine: Arc<dyn ExpressionEngine>,
        sets: Vec<SetId>,
        limits: TransferLimits,
    ) -> Self {
        Self {
            input,
            engine,
            sets,
            limits,
            created: false,
        }
    }
}

impl BatchStream for CreatingSetsStream {
    fn schema(&self) -> SchemaRef {
        self.input.schema()
    }

    fn next_batch(&mut self) -> Result<Option<RecordBatch>> {
        if !self.created {
            for id in &self.sets {
                tracing::trace!(set = %id, "materializing deferred set");
                self.engine.materialize_set(id, &self.limits)?;
            }
            self.created = true;
        }
        self.input.next_batch()
    }
}

/// Final normalization: forces compacted column representations
/// (dictionary, run-end encoding) into plain arrays before the stream
/// leaves the pipeline.
pub struct MaterializingStream {
    input: BoxedBatchStream,
    schema: SchemaRef,
}

impl MaterializingStream {
    pub fn new(input: BoxedBatchStream) -> Self {
        let schema = normalize_schema(&input.schema());
        Self { input, schema }
    }
}

impl BatchStream for MaterializingStream {
    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn next_batch(&mut self) -> Result<Option<RecordBatch>> {
        let batch = match self.input.next_batch()? {
            None => return Ok(None),
            Some(batch) => batch,
        };
        if batch.schema() == self.schema {
            return Ok(Some(batch));
        }
        let columns: Result<Vec<ArrayRef>> = batch
            .columns()
            .iter()
            .zip(self.schema.fields())
            .map(|(column, field)| {
                if column.data_type() == field.data_type() {
                    Ok(column.clone())
                } else {
                    Ok(cast(column, field.data_type())?)
                }
            })
            .collect();
        Ok(Some(RecordBatch::try_new(self.schema.clone(), columns?)?))
    }
}

fn normalize_schema(schema: &Schema) -> SchemaRef {
    let fields: Vec<Field> = schema
        .fields()
        .iter()
        .map(|field| {
            let data_type = normalize_type(field.data_type());
            Field::new(field.name().clone(), data_type, field.is_nullable())
        })
        .collect();
    Arc::new(Schema::new(fields))
}

fn normalize_type(data_type: &DataType) -> DataType {
    match data_type {
        DataType::Dictionary(_, value) => normalize_type(value),
        DataType::RunEndEncoded(_, value) => normalize_type(value.data_type()),
        other => other.clone(),
    }
}

/// Chain the streaming operators for stages 1..n over the stage-0 stream
/// and cap the pipeline with the materializing normalizer.
pub(crate) fn assemble_pipeline(
    stages: &[MutationStage],
    engine: &Arc<dyn ExpressionEngine>,
    limits: &TransferLimits,
    mut input: BoxedBatchStream,
) -> Result<BoxedBatchStream> {
    for (stage_idx, stage) in stages.iter().enumerate().skip(1) {
        if !stage.pending_sets.is_empty() {
            input = Box::new(CreatingSetsStream::new(
                input,
                engine.clone(),
                stage.pending_sets.clone(),
                limits.clone(),
            ));
        }
        for (i, step) in stage.chain.iter().enumerate() {
            if i < stage.delete_filter_columns.len() {
                // Execute DELETE.
                let computed = step.computed.first().ok_or_else(|| {
                    Error::LogicalError(format!(
                        "delete filter step {i} of stage {stage_idx} carries no expression"
                    ))
                })?;
                input = Box::new(FilterStream::new(
                    input,
                    engine.clone(),
                    computed.expr.clone(),
                    stage.delete_filter_columns[i].clone(),
                )?);
            } else {
                // Execute UPDATE or the final projection.
                input = Box::new(StepStream::new(input, engine.clone(), step.clone())?);
            }
        }
        tracing::debug!(
            stage = stage_idx,
            steps = stage.chain.len(),
            "assembled stage operators"
        );
    }
    Ok(Box::new(MaterializingStream::new(input)))
}
