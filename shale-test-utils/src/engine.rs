//! Arrow-kernel-backed reference expression engine.

use std::sync::{Arc, Mutex, MutexGuard};

use arrow::array::{
    new_null_array, Array, ArrayRef, BooleanArray, Float64Array, Int64Array, RecordBatch,
    StringArray,
};
use arrow::compute::kernels::boolean::{and_kleene, not, or_kleene};
use arrow::compute::kernels::cmp;
use arrow::compute::kernels::numeric;
use arrow::compute::kernels::zip::zip;
use arrow::compute::{can_cast_types, cast, is_not_null, is_null};
use arrow::datatypes::{DataType, Schema};
use rustc_hash::{FxHashMap, FxHashSet};
use shale_eval::{ExpressionEngine, OverflowPolicy, TransferLimits};
use shale_expr::{BinaryOp, CompareOp, Literal, ScalarExpr, SetId};
use shale_result::{Error, Result};

/// Deferred IN-set: the element source plus, once materialized, the
/// lookup contents.
struct DeferredSet {
    source: Vec<Literal>,
    contents: Option<SetContents>,
}

#[derive(Default)]
struct SetContents {
    ints: FxHashSet<i64>,
    strings: FxHashSet<String>,
}

impl SetContents {
    fn insert(&mut self, value: &Literal) -> Result<()> {
        match value {
            Literal::Integer(v) => {
                self.ints.insert(*v);
            }
            Literal::String(s) => {
                self.strings.insert(s.clone());
            }
            other => {
                return Err(Error::InvalidArgumentError(format!(
                    "unsupported set element {other}"
                )));
            }
        }
        Ok(())
    }
}

/// Reference implementation of [`ExpressionEngine`] over Arrow compute
/// kernels.
///
/// Numeric promotion is deliberately simple: integers evaluate as Int64,
/// any float operand promotes the result to Float64, and everything else
/// must line up exactly. Deferred sets are registered up front and stay
/// unusable until something materializes them.
#[derive(Default)]
pub struct BasicEngine {
    sets: Mutex<FxHashMap<SetId, DeferredSet>>,
}

impl BasicEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a deferred set the engine will build on demand.
    pub fn register_set(&self, id: SetId, values: Vec<Literal>) {
        self.lock_sets().insert(
            id,
            DeferredSet {
                source: values,
                contents: None,
            },
        );
    }

    pub fn set_is_materialized(&self, id: &SetId) -> bool {
        self.lock_sets()
            .get(id)
            .is_some_and(|set| set.contents.is_some())
    }

    fn lock_sets(&self) -> MutexGuard<'_, FxHashMap<SetId, DeferredSet>> {
        self.sets.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ExpressionEngine for BasicEngine {
    fn expression_type(&self, expr: &ScalarExpr, input: &Schema) -> Result<DataType> {
        match expr {
            ScalarExpr::Literal(lit) => Ok(lit.data_type()),
            ScalarExpr::Column(name) => input
                .field_with_name(name)
                .map(|field| field.data_type().clone())
                .map_err(|_| {
                    Error::InvalidArgumentError(format!("unknown column {name} in expression"))
                }),
            ScalarExpr::Binary { left, op, right } => {
                let lhs = self.expression_type(left, input)?;
                let rhs = self.expression_type(right, input)?;
                match op {
                    BinaryOp::And | BinaryOp::Or => {
                        if lhs == DataType::Boolean && rhs == DataType::Boolean {
                            Ok(DataType::Boolean)
                        } else {
                            Err(Error::InvalidArgumentError(format!(
                                "{} requires boolean operands, got {lhs} and {rhs}",
                                op.as_str()
                            )))
                        }
                    }
                    _ => numeric_result_type(&lhs, &rhs).ok_or_else(|| {
                        Error::InvalidArgumentError(format!(
                            "cannot apply {} to {lhs} and {rhs}",
                            op.as_str()
                        ))
                    }),
                }
            }
            ScalarExpr::Compare { left, op, right } => {
                let lhs = self.expression_type(left, input)?;
                let rhs = self.expression_type(right, input)?;
                if numeric_result_type(&lhs, &rhs).is_some() || lhs == rhs {
                    Ok(DataType::Boolean)
                } else {
                    Err(Error::InvalidArgumentError(format!(
                        "cannot compare {lhs} {} {rhs}",
                        op.as_str()
                    )))
                }
            }
            ScalarExpr::Not(inner) => {
                let inner_type = self.expression_type(inner, input)?;
                if inner_type == DataType::Boolean {
                    Ok(DataType::Boolean)
                } else {
                    Err(Error::InvalidArgumentError(format!(
                        "NOT requires a boolean operand, got {inner_type}"
                    )))
                }
            }
            ScalarExpr::If {
                condition,
                then_value,
                else_value,
            } => {
                let cond = self.expression_type(condition, input)?;
                if cond != DataType::Boolean {
                    return Err(Error::InvalidArgumentError(format!(
                        "IF condition must be boolean, got {cond}"
                    )));
                }
                let then_type = self.expression_type(then_value, input)?;
                let else_type = self.expression_type(else_value, input)?;
                common_type(&then_type, &else_type).ok_or_else(|| {
                    Error::InvalidArgumentError(format!(
                        "IF branches have incompatible types {then_type} and {else_type}"
                    ))
                })
            }
            ScalarExpr::Cast { expr, data_type } => {
                let inner = self.expression_type(expr, input)?;
                if can_cast_types(&inner, data_type) {
                    Ok(data_type.clone())
                } else {
                    Err(Error::InvalidArgumentError(format!(
                        "cannot cast {inner} to {data_type}"
                    )))
                }
            }
            ScalarExpr::IsNull { expr, .. } => {
                self.expression_type(expr, input)?;
                Ok(DataType::Boolean)
            }
            ScalarExpr::InSet { expr, .. } => {
                self.expression_type(expr, input)?;
                Ok(DataType::Boolean)
            }
        }
    }

    fn evaluate(&self, expr: &ScalarExpr, batch: &RecordBatch) -> Result<ArrayRef> {
        match expr {
            ScalarExpr::Literal(lit) => Ok(literal_array(lit, batch.num_rows())),
            ScalarExpr::Column(name) => batch.column_by_name(name).cloned().ok_or_else(|| {
                Error::InvalidArgumentError(format!("unknown column {name} in batch"))
            }),
            ScalarExpr::Binary { left, op, right } => {
                let lhs = self.evaluate(left, batch)?;
                let rhs = self.evaluate(right, batch)?;
                match op {
                    BinaryOp::And => {
                        let result =
                            and_kleene(&to_boolean(&lhs, "AND")?, &to_boolean(&rhs, "AND")?)?;
                        Ok(Arc::new(result))
                    }
                    BinaryOp::Or => {
                        let result =
                            or_kleene(&to_boolean(&lhs, "OR")?, &to_boolean(&rhs, "OR")?)?;
                        Ok(Arc::new(result))
                    }
                    _ => {
                        let target = numeric_result_type(lhs.data_type(), rhs.data_type())
                            .ok_or_else(|| {
                                Error::InvalidArgumentError(format!(
                                    "cannot apply {} to {} and {}",
                                    op.as_str(),
                                    lhs.data_type(),
                                    rhs.data_type()
                                ))
                            })?;
                        let lhs = cast_if_needed(lhs, &target)?;
                        let rhs = cast_if_needed(rhs, &target)?;
                        let result = match op {
                            BinaryOp::Add => numeric::add(&lhs, &rhs)?,
                            BinaryOp::Subtract => numeric::sub(&lhs, &rhs)?,
                            BinaryOp::Multiply => numeric::mul(&lhs, &rhs)?,
                            BinaryOp::Divide => numeric::div(&lhs, &rhs)?,
                            BinaryOp::Modulo => numeric::rem(&lhs, &rhs)?,
                            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
                        };
                        Ok(result)
                    }
                }
            }
            ScalarExpr::Compare { left, op, right } => {
                let lhs = self.evaluate(left, batch)?;
                let rhs = self.evaluate(right, batch)?;
                let (lhs, rhs) =
                    match numeric_result_type(lhs.data_type(), rhs.data_type()) {
                        Some(target) => {
                            (cast_if_needed(lhs, &target)?, cast_if_needed(rhs, &target)?)
                        }
                        None if lhs.data_type() == rhs.data_type() => (lhs, rhs),
                        None => {
                            return Err(Error::InvalidArgumentError(format!(
                                "cannot compare {} {} {}",
                                lhs.data_type(),
                                op.as_str(),
                                rhs.data_type()
                            )));
                        }
                    };
                let result = match op {
                    CompareOp::Eq => cmp::eq(&lhs, &rhs)?,
                    CompareOp::NotEq => cmp::neq(&lhs, &rhs)?,
                    CompareOp::Lt => cmp::lt(&lhs, &rhs)?,
                    CompareOp::LtEq => cmp::lt_eq(&lhs, &rhs)?,
                    CompareOp::Gt => cmp::gt(&lhs, &rhs)?,
                    CompareOp::GtEq => cmp::gt_eq(&lhs, &rhs)?,
                };
                Ok(Arc::new(result))
            }
            ScalarExpr::Not(inner) => {
                let array = self.evaluate(inner, batch)?;
                Ok(Arc::new(not(&to_boolean(&array, "NOT")?)?))
            }
            ScalarExpr::If {
                condition,
                then_value,
                else_value,
            } => {
                let cond = self.evaluate(condition, batch)?;
                let cond = to_boolean(&cond, "IF")?;
                let then_array = self.evaluate(then_value, batch)?;
                let else_array = self.evaluate(else_value, batch)?;
                let target = common_type(then_array.data_type(), else_array.data_type())
                    .ok_or_else(|| {
                        Error::InvalidArgumentError(format!(
                            "IF branches have incompatible types {} and {}",
                            then_array.data_type(),
                            else_array.data_type()
                        ))
                    })?;
                let then_array = cast_if_needed(then_array, &target)?;
                let else_array = cast_if_needed(else_array, &target)?;
                Ok(zip(&cond, &then_array, &else_array)?)
            }
            ScalarExpr::Cast { expr, data_type } => {
                let array = self.evaluate(expr, batch)?;
                Ok(cast(&array, data_type)?)
            }
            ScalarExpr::IsNull { expr, negated } => {
                let array = self.evaluate(expr, batch)?;
                let result = if *negated {
                    is_not_null(array.as_ref())?
                } else {
                    is_null(array.as_ref())?
                };
                Ok(Arc::new(result))
            }
            ScalarExpr::InSet { expr, set, negated } => {
                let array = self.evaluate(expr, batch)?;
                let guard = self.lock_sets();
                let deferred = guard.get(set).ok_or(Error::NotFound)?;
                let contents = deferred.contents.as_ref().ok_or_else(|| {
                    Error::LogicalError(format!("deferred set {set} consumed before materialization"))
                })?;
                membership(&array, contents, *negated)
            }
        }
    }

    fn materialize_set(&self, id: &SetId, limits: &TransferLimits) -> Result<()> {
        let mut guard = self.lock_sets();
        let deferred = guard.get_mut(id).ok_or(Error::NotFound)?;
        if deferred.contents.is_some() {
            return Ok(());
        }

        let mut values = deferred.source.clone();
        if let Some(max_rows) = limits.max_rows {
            if values.len() as u64 > max_rows {
                match limits.overflow {
                    OverflowPolicy::Raise => {
                        return Err(Error::LimitExceeded(format!(
                            "deferred set {id} has {} elements, row limit is {max_rows}",
                            values.len()
                        )));
                    }
                    OverflowPolicy::Truncate => values.truncate(max_rows as usize),
                    OverflowPolicy::Ignore => {}
                }
            }
        }
        if let Some(max_bytes) = limits.max_bytes {
            let size: u64 = values.iter().map(literal_byte_size).sum();
            if size > max_bytes {
                match limits.overflow {
                    OverflowPolicy::Raise => {
                        return Err(Error::LimitExceeded(format!(
                            "deferred set {id} is {size} bytes, byte limit is {max_bytes}"
                        )));
                    }
                    OverflowPolicy::Truncate => {
                        let mut budget = max_bytes;
                        values.retain(|value| {
                            let cost = literal_byte_size(value);
                            if cost <= budget {
                                budget -= cost;
                                true
                            } else {
                                budget = 0;
                                false
                            }
                        });
                    }
                    OverflowPolicy::Ignore => {}
                }
            }
        }

        let mut contents = SetContents::default();
        for value in &values {
            contents.insert(value)?;
        }
        deferred.contents = Some(contents);
        Ok(())
    }
}

fn literal_byte_size(value: &Literal) -> u64 {
    match value {
        Literal::Integer(_) | Literal::Float(_) => 8,
        Literal::Boolean(_) => 1,
        Literal::String(s) => s.len() as u64,
        Literal::Null => 0,
    }
}

fn literal_array(lit: &Literal, len: usize) -> ArrayRef {
    match lit {
        Literal::Integer(v) => Arc::new(Int64Array::from(vec![*v; len])),
        Literal::Float(v) => Arc::new(Float64Array::from(vec![*v; len])),
        Literal::String(s) => Arc::new(StringArray::from(vec![s.as_str(); len])),
        Literal::Boolean(b) => Arc::new(BooleanArray::from(vec![*b; len])),
        Literal::Null => new_null_array(&DataType::Null, len),
    }
}

fn to_boolean(array: &ArrayRef, what: &str) -> Result<BooleanArray> {
    array
        .as_any()
        .downcast_ref::<BooleanArray>()
        .cloned()
        .ok_or_else(|| {
            Error::InvalidArgumentError(format!(
                "{what} operand has type {}, expected Boolean",
                array.data_type()
            ))
        })
}

fn cast_if_needed(array: ArrayRef, target: &DataType) -> Result<ArrayRef> {
    if array.data_type() == target {
        Ok(array)
    } else {
        Ok(cast(&array, target)?)
    }
}

/// Int64 unless a float is involved; `None` for non-numeric operands.
fn numeric_result_type(lhs: &DataType, rhs: &DataType) -> Option<DataType> {
    if !lhs.is_numeric() || !rhs.is_numeric() {
        return None;
    }
    if lhs.is_floating() || rhs.is_floating() {
        Some(DataType::Float64)
    } else {
        Some(DataType::Int64)
    }
}

/// Result type of an IF over the two branch types.
fn common_type(lhs: &DataType, rhs: &DataType) -> Option<DataType> {
    if lhs == rhs {
        return Some(lhs.clone());
    }
    if *lhs == DataType::Null {
        return Some(rhs.clone());
    }
    if *rhs == DataType::Null {
        return Some(lhs.clone());
    }
    numeric_result_type(lhs, rhs)
}

fn membership(array: &ArrayRef, contents: &SetContents, negated: bool) -> Result<ArrayRef> {
    if let Some(values) = array.as_any().downcast_ref::<Int64Array>() {
        let result: BooleanArray = values
            .iter()
            .map(|value| value.map(|v| contents.ints.contains(&v) != negated))
            .collect();
        return Ok(Arc::new(result));
    }
    if let Some(values) = array.as_any().downcast_ref::<StringArray>() {
        let result: BooleanArray = values
            .iter()
            .map(|value| value.map(|v| contents.strings.contains(v) != negated))
            .collect();
        return Ok(Arc::new(result));
    }
    Err(Error::InvalidArgumentError(format!(
        "IN is not supported over {}",
        array.data_type()
    )))
}

#[cfg(test)]
mod tests {
    use arrow::datatypes::Field;

    use super::*;

    fn batch() -> RecordBatch {
        let schema = Arc::new(Schema::new(vec![
            Field::new("a", DataType::Int64, true),
            Field::new("f", DataType::Float64, true),
            Field::new("flag", DataType::Boolean, true),
        ]));
        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Int64Array::from(vec![1, 2, 3])),
                Arc::new(Float64Array::from(vec![0.5, 1.5, 2.5])),
                Arc::new(BooleanArray::from(vec![true, false, true])),
            ],
        )
        .unwrap()
    }

    fn int64(array: &ArrayRef) -> &Int64Array {
        array.as_any().downcast_ref().unwrap()
    }

    fn booleans(array: &ArrayRef) -> Vec<bool> {
        array
            .as_any()
            .downcast_ref::<BooleanArray>()
            .unwrap()
            .iter()
            .map(|v| v.unwrap())
            .collect()
    }

    #[test]
    fn arithmetic_promotes_int_and_float() {
        let engine = BasicEngine::new();
        let batch = batch();
        let sum = ScalarExpr::binary(
            ScalarExpr::column("a"),
            BinaryOp::Add,
            ScalarExpr::column("f"),
        );
        assert_eq!(
            engine
                .expression_type(&sum, batch.schema().as_ref())
                .unwrap(),
            DataType::Float64
        );
        let result = engine.evaluate(&sum, &batch).unwrap();
        let floats: &Float64Array = result.as_any().downcast_ref().unwrap();
        assert_eq!(floats.values(), &[1.5, 3.5, 5.5]);
    }

    #[test]
    fn conditional_cast_keeps_declared_type() {
        let engine = BasicEngine::new();
        let batch = batch();
        // CAST(IF(flag, a + 0.5, a) AS Int64): widening then restore.
        let expr = ScalarExpr::cast(
            ScalarExpr::if_then_else(
                ScalarExpr::column("flag"),
                ScalarExpr::binary(
                    ScalarExpr::column("a"),
                    BinaryOp::Add,
                    ScalarExpr::literal(10),
                ),
                ScalarExpr::column("a"),
            ),
            DataType::Int64,
        );
        assert_eq!(
            engine
                .expression_type(&expr, batch.schema().as_ref())
                .unwrap(),
            DataType::Int64
        );
        let result = engine.evaluate(&expr, &batch).unwrap();
        assert_eq!(int64(&result).values(), &[11, 2, 13]);
    }

    #[test]
    fn comparison_and_not() {
        let engine = BasicEngine::new();
        let batch = batch();
        let pred = ScalarExpr::compare(
            ScalarExpr::column("a"),
            CompareOp::Gt,
            ScalarExpr::literal(1),
        );
        assert_eq!(booleans(&engine.evaluate(&pred, &batch).unwrap()), vec![
            false, true, true
        ]);
        let negated = ScalarExpr::not(pred);
        assert_eq!(booleans(&engine.evaluate(&negated, &batch).unwrap()), vec![
            true, false, false
        ]);
    }

    #[test]
    fn type_errors_surface_without_data() {
        let engine = BasicEngine::new();
        let schema = batch().schema();
        let bad = ScalarExpr::binary(
            ScalarExpr::column("a"),
            BinaryOp::Add,
            ScalarExpr::column("flag"),
        );
        assert!(matches!(
            engine.expression_type(&bad, schema.as_ref()),
            Err(Error::InvalidArgumentError(_))
        ));
        let unknown = ScalarExpr::column("ghost");
        assert!(matches!(
            engine.expression_type(&unknown, schema.as_ref()),
            Err(Error::InvalidArgumentError(_))
        ));
    }

    #[test]
    fn in_set_requires_materialization() {
        let engine = BasicEngine::new();
        let batch = batch();
        let id = SetId::new("sub0");
        engine.register_set(id.clone(), vec![Literal::Integer(1), Literal::Integer(3)]);
        let expr = ScalarExpr::InSet {
            expr: Box::new(ScalarExpr::column("a")),
            set: id.clone(),
            negated: false,
        };

        match engine.evaluate(&expr, &batch) {
            Err(Error::LogicalError(msg)) => assert!(msg.contains("before materialization")),
            other => panic!("expected LogicalError, got {other:?}"),
        }

        engine
            .materialize_set(&id, &TransferLimits::default())
            .unwrap();
        assert!(engine.set_is_materialized(&id));
        assert_eq!(booleans(&engine.evaluate(&expr, &batch).unwrap()), vec![
            true, false, true
        ]);
    }

    #[test]
    fn overflow_policies() {
        let engine = BasicEngine::new();
        let values = vec![
            Literal::Integer(1),
            Literal::Integer(2),
            Literal::Integer(3),
        ];

        let raise = SetId::new("raise");
        engine.register_set(raise.clone(), values.clone());
        let limits = TransferLimits::new(Some(2), None, OverflowPolicy::Raise);
        assert!(matches!(
            engine.materialize_set(&raise, &limits),
            Err(Error::LimitExceeded(_))
        ));

        let truncate = SetId::new("truncate");
        engine.register_set(truncate.clone(), values.clone());
        let limits = TransferLimits::new(Some(2), None, OverflowPolicy::Truncate);
        engine.materialize_set(&truncate, &limits).unwrap();
        {
            let guard = engine.lock_sets();
            let contents = guard[&truncate].contents.as_ref().unwrap();
            assert_eq!(contents.ints.len(), 2);
            assert!(!contents.ints.contains(&3));
        }

        let ignore = SetId::new("ignore");
        engine.register_set(ignore.clone(), values);
        let limits = TransferLimits::new(Some(2), None, OverflowPolicy::Ignore);
        engine.materialize_set(&ignore, &limits).unwrap();
        let guard = engine.lock_sets();
        assert_eq!(guard[&ignore].contents.as_ref().unwrap().ints.len(), 3);
    }
}
