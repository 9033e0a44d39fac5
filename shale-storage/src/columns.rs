use arrow::datatypes::DataType;

/// Name and declared type of one physical column.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnMeta {
    pub name: String,
    pub data_type: DataType,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Physical column layout of a table.
///
/// Ordinary columns are directly settable; materialized columns are
/// computed from others and can only change through recomputation.
/// Both groups belong to the "full physical column set" a delete
/// predicate may reference.
#[derive(Clone, Debug, Default)]
pub struct TableColumns {
    pub ordinary: Vec<ColumnMeta>,
    pub materialized: Vec<ColumnMeta>,
}

impl TableColumns {
    pub fn new(ordinary: Vec<ColumnMeta>, materialized: Vec<ColumnMeta>) -> Self {
        Self {
            ordinary,
            materialized,
        }
    }

    /// Iterate over every physical column, ordinary first.
    pub fn all_physical(&self) -> impl Iterator<Item = &ColumnMeta> {
        self.ordinary.iter().chain(self.materialized.iter())
    }

    /// Number of physical columns.
    pub fn physical_len(&self) -> usize {
        self.ordinary.len() + self.materialized.len()
    }

    /// Declared type of a physical column, if it exists.
    pub fn data_type(&self, name: &str) -> Option<&DataType> {
        self.all_physical()
            .find(|col| col.name == name)
            .map(|col| &col.data_type)
    }

    pub fn is_ordinary(&self, name: &str) -> bool {
        self.ordinary.iter().any(|col| col.name == name)
    }

    pub fn is_materialized(&self, name: &str) -> bool {
        self.materialized.iter().any(|col| col.name == name)
    }
}
