use shale_expr::ScalarExpr;

/// What a read query projects.
#[derive(Clone, Debug, PartialEq)]
pub enum SelectProjection {
    /// Named columns, in the order given.
    Columns(Vec<String>),
    /// A single `count()` aggregate over the matching rows. The result is
    /// one batch with one row and one UInt64 column named `count()`.
    CountStar,
}

/// Declarative read query handed to [`Storage::plan_read`].
///
/// [`Storage::plan_read`]: crate::Storage::plan_read
#[derive(Clone, Debug)]
pub struct SelectQuery {
    pub projection: SelectProjection,
    pub filter: Option<ScalarExpr>,
}

impl SelectQuery {
    pub fn columns(names: Vec<String>) -> Self {
        Self {
            projection: SelectProjection::Columns(names),
            filter: None,
        }
    }

    pub fn count_star() -> Self {
        Self {
            projection: SelectProjection::CountStar,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: ScalarExpr) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Column name of the `count()` aggregate result.
pub const COUNT_COLUMN_NAME: &str = "count()";
