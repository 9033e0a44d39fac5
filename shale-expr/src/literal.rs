use arrow::datatypes::DataType;

/// A literal value embedded in an expression tree.
///
/// Integers are carried as `i64` and floats as `f64`; coercion into the
/// target column type happens through an explicit CAST node, so a literal
/// never needs to know the column type it will meet.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
}

macro_rules! impl_from_for_literal {
    ($variant:ident, $($t:ty),*) => {
        $(
            impl From<$t> for Literal {
                fn from(v: $t) -> Self {
                    Literal::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_for_literal!(Integer, i8, i16, i32, i64, u8, u16, u32);
impl_from_for_literal!(Float, f32, f64);
impl_from_for_literal!(Boolean, bool);

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Literal::String(v.to_string())
    }
}

impl From<String> for Literal {
    fn from(v: String) -> Self {
        Literal::String(v)
    }
}

impl Literal {
    /// The Arrow type this literal evaluates to before any cast.
    pub fn data_type(&self) -> DataType {
        match self {
            Literal::Integer(_) => DataType::Int64,
            Literal::Float(_) => DataType::Float64,
            Literal::String(_) => DataType::Utf8,
            Literal::Boolean(_) => DataType::Boolean,
            Literal::Null => DataType::Null,
        }
    }
}
