use arrow::array::RecordBatch;
use arrow::datatypes::SchemaRef;
use shale_result::Result;

/// Pull-based, lazily evaluated sequence of row batches.
///
/// The schema is known before any batch is produced, so header-only
/// consumers (dry-run validation) never advance the stream. Advancing
/// stops when the consumer stops pulling; there is no cancellation token.
pub trait BatchStream {
    /// Header of every batch this stream yields.
    fn schema(&self) -> SchemaRef;

    /// Produce the next batch, or `None` when exhausted.
    fn next_batch(&mut self) -> Result<Option<RecordBatch>>;
}

/// Owned, dynamically typed batch stream.
pub type BoxedBatchStream = Box<dyn BatchStream>;

/// A stream that carries a header but yields no batches.
///
/// Used to walk a pipeline's column layout during dry-run validation
/// without touching storage.
pub struct EmptyStream {
    schema: SchemaRef,
}

impl EmptyStream {
    pub fn new(schema: SchemaRef) -> Self {
        Self { schema }
    }
}

impl BatchStream for EmptyStream {
    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    fn next_batch(&mut self) -> Result<Option<RecordBatch>> {
        Ok(None)
    }
}
