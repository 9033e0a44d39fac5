//! In-memory table backing the storage seam.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, RecordBatch, UInt64Array};
use arrow::compute::filter_record_batch;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use shale_eval::ExpressionEngine;
use shale_expr::ScalarExpr;
use shale_result::{Error, Result};
use shale_storage::{
    BatchStream, BoxedBatchStream, ReadPlan, ReadSettings, SelectProjection, SelectQuery, Storage,
    TableColumns, COUNT_COLUMN_NAME,
};

use crate::engine::BasicEngine;

/// A table held entirely in memory as Arrow record batches.
///
/// Every stored batch carries the full physical column set, so a read
/// filter may reference any physical column regardless of the projection.
/// The table counts executed reads, which lets tests prove that dry-run
/// validation never touches data.
pub struct MemTable {
    columns: TableColumns,
    batches: Vec<RecordBatch>,
    engine: Arc<BasicEngine>,
    executed_reads: Arc<AtomicUsize>,
}

impl MemTable {
    pub fn new(columns: TableColumns, batches: Vec<RecordBatch>, engine: Arc<BasicEngine>) -> Self {
        Self {
            columns,
            batches,
            engine,
            executed_reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of read plans that have actually been executed.
    pub fn executed_reads(&self) -> usize {
        self.executed_reads.load(Ordering::SeqCst)
    }
}

impl Storage for MemTable {
    fn columns(&self) -> &TableColumns {
        &self.columns
    }

    fn plan_read(&self, query: SelectQuery, _settings: &ReadSettings) -> Result<Box<dyn ReadPlan>> {
        let schema = match &query.projection {
            SelectProjection::Columns(names) => {
                let mut fields = Vec::with_capacity(names.len());
                for name in names {
                    let data_type = self
                        .columns
                        .data_type(name)
                        .ok_or_else(|| Error::NoSuchColumn(name.clone()))?;
                    fields.push(Field::new(name, data_type.clone(), true));
                }
                Arc::new(Schema::new(fields))
            }
            SelectProjection::CountStar => Arc::new(Schema::new(vec![Field::new(
                COUNT_COLUMN_NAME,
                DataType::UInt64,
                false,
            )])),
        };
        Ok(Box::new(MemReadPlan {
            schema,
            query,
            batches: self.batches.clone(),
            engine: self.engine.clone(),
            executed_reads: self.executed_reads.clone(),
        }))
    }
}

struct MemReadPlan {
    schema: SchemaRef,
    query: SelectQuery,
    batches: Vec<RecordBatch>,
    engine: Arc<BasicEngine>,
    executed_reads: Arc<AtomicUsize>,
}

impl ReadPlan for MemReadPlan {
    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn execute(self: Box<Self>) -> Result<BoxedBatchStream> {
        self.executed_reads.fetch_add(1, Ordering::SeqCst);
        let matching = filter_batches(&self.batches, self.query.filter.as_ref(), &self.engine)?;
        match self.query.projection {
            SelectProjection::Columns(names) => {
                let mut projected = Vec::with_capacity(matching.len());
                for batch in &matching {
                    projected.push(project_batch(batch, &names, &self.schema)?);
                }
                Ok(Box::new(MemStream {
                    schema: self.schema,
                    batches: projected.into_iter(),
                }))
            }
            SelectProjection::CountStar => {
                let total: u64 = matching.iter().map(|b| b.num_rows() as u64).sum();
                let batch = RecordBatch::try_new(
                    self.schema.clone(),
                    vec![Arc::new(UInt64Array::from(vec![total])) as ArrayRef],
                )?;
                Ok(Box::new(MemStream {
                    schema: self.schema,
                    batches: vec![batch].into_iter(),
                }))
            }
        }
    }
}

fn filter_batches(
    batches: &[RecordBatch],
    filter: Option<&ScalarExpr>,
    engine: &BasicEngine,
) -> Result<Vec<RecordBatch>> {
    let Some(filter) = filter else {
        return Ok(batches.to_vec());
    };
    let mut kept = Vec::with_capacity(batches.len());
    for batch in batches {
        let mask = engine.evaluate(filter, batch)?;
        let mask = mask
            .as_any()
            .downcast_ref::<BooleanArray>()
            .ok_or_else(|| {
                Error::InvalidArgumentError(format!(
                    "read filter produced {}, expected Boolean",
                    mask.data_type()
                ))
            })?;
        kept.push(filter_record_batch(batch, mask)?);
    }
    Ok(kept)
}

fn project_batch(batch: &RecordBatch, names: &[String], schema: &SchemaRef) -> Result<RecordBatch> {
    let mut arrays = Vec::with_capacity(names.len());
    for name in names {
        let array = batch
            .column_by_name(name)
            .cloned()
            .ok_or_else(|| Error::NoSuchColumn(name.clone()))?;
        arrays.push(array);
    }
    Ok(RecordBatch::try_new(schema.clone(), arrays)?)
}

struct MemStream {
    schema: SchemaRef,
    batches: std::vec::IntoIter<RecordBatch>,
}

impl BatchStream for MemStream {
    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn next_batch(&mut self) -> Result<Option<RecordBatch>> {
        Ok(self.batches.next())
    }
}
