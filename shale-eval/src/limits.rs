/// What to do when a deferred set outgrows its limits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Fail the materialization with `Error::LimitExceeded`.
    #[default]
    Raise,
    /// Keep the first `max_rows` elements and drop the rest.
    Truncate,
    /// Disregard the limits and materialize in full.
    Ignore,
}

/// Row/byte caps for deferred-set materialization.
#[derive(Clone, Debug, Default)]
pub struct TransferLimits {
    /// Maximum number of elements, `None` for unlimited.
    pub max_rows: Option<u64>,
    /// Maximum total byte size, `None` for unlimited.
    pub max_bytes: Option<u64>,
    pub overflow: OverflowPolicy,
}

impl TransferLimits {
    pub fn new(max_rows: Option<u64>, max_bytes: Option<u64>, overflow: OverflowPolicy) -> Self {
        Self {
            max_rows,
            max_bytes,
            overflow,
        }
    }
}
