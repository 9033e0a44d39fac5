//! Scalar expression AST over named columns.
//!
//! Expressions are immutable values. A predicate reused by several
//! consumers (for example by both the touched-rows estimator and a stage
//! filter) is shared by explicit structural copy (`clone()`), never by
//! shared mutable nodes.

use arrow::datatypes::DataType;
use rustc_hash::FxHashSet;

use crate::literal::Literal;

/// Stable identifier for a deferred subquery-derived membership set.
///
/// IN-predicates whose right-hand side comes from a subquery reference the
/// set by id; the owning expression engine materializes it on demand.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SetId(pub String);

impl SetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

/// Binary arithmetic and logical operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    And,
    Or,
}

/// Comparison operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

/// Scalar expression over named columns.
///
/// The set of node kinds is closed and matched exhaustively everywhere; a
/// new kind is a cross-cutting change by design.
#[derive(Clone, Debug, PartialEq)]
pub enum ScalarExpr {
    Literal(Literal),
    Column(String),
    Binary {
        left: Box<ScalarExpr>,
        op: BinaryOp,
        right: Box<ScalarExpr>,
    },
    Compare {
        left: Box<ScalarExpr>,
        op: CompareOp,
        right: Box<ScalarExpr>,
    },
    Not(Box<ScalarExpr>),
    /// Conditional: `condition` must be boolean; rows where it is false (or
    /// null) take `else_value`.
    If {
        condition: Box<ScalarExpr>,
        then_value: Box<ScalarExpr>,
        else_value: Box<ScalarExpr>,
    },
    Cast {
        expr: Box<ScalarExpr>,
        data_type: DataType,
    },
    IsNull {
        expr: Box<ScalarExpr>,
        negated: bool,
    },
    /// Membership test against a deferred set built from a subquery.
    InSet {
        expr: Box<ScalarExpr>,
        set: SetId,
        negated: bool,
    },
}

impl ScalarExpr {
    /// Reference a column by name.
    #[inline]
    pub fn column(name: impl Into<String>) -> Self {
        ScalarExpr::Column(name.into())
    }

    /// Embed a literal value.
    #[inline]
    pub fn literal(value: impl Into<Literal>) -> Self {
        ScalarExpr::Literal(value.into())
    }

    #[inline]
    pub fn binary(left: Self, op: BinaryOp, right: Self) -> Self {
        ScalarExpr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    #[inline]
    pub fn compare(left: Self, op: CompareOp, right: Self) -> Self {
        ScalarExpr::Compare {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Wrap an expression in a logical NOT.
    #[allow(clippy::should_implement_trait)]
    #[inline]
    pub fn not(expr: Self) -> Self {
        ScalarExpr::Not(Box::new(expr))
    }

    #[inline]
    pub fn cast(expr: Self, data_type: DataType) -> Self {
        ScalarExpr::Cast {
            expr: Box::new(expr),
            data_type,
        }
    }

    #[inline]
    pub fn if_then_else(condition: Self, then_value: Self, else_value: Self) -> Self {
        ScalarExpr::If {
            condition: Box::new(condition),
            then_value: Box::new(then_value),
            else_value: Box::new(else_value),
        }
    }

    /// Left-fold expressions into a conjunction. `None` for an empty input.
    pub fn and_all(exprs: Vec<Self>) -> Option<Self> {
        Self::fold_binary(BinaryOp::And, exprs)
    }

    /// Left-fold expressions into a disjunction. `None` for an empty input.
    pub fn or_all(exprs: Vec<Self>) -> Option<Self> {
        Self::fold_binary(BinaryOp::Or, exprs)
    }

    fn fold_binary(op: BinaryOp, exprs: Vec<Self>) -> Option<Self> {
        let mut iter = exprs.into_iter();
        let first = iter.next()?;
        Some(iter.fold(first, |acc, next| Self::binary(acc, op, next)))
    }

    /// The synthesized column name this expression evaluates into.
    ///
    /// Two structurally equal expressions share a name; the display form is
    /// stable across clones.
    pub fn result_name(&self) -> String {
        self.to_string()
    }

    /// Collect every column name this expression references into `out`.
    pub fn collect_columns(&self, out: &mut FxHashSet<String>) {
        match self {
            ScalarExpr::Literal(_) => {}
            ScalarExpr::Column(name) => {
                out.insert(name.clone());
            }
            ScalarExpr::Binary { left, right, .. } | ScalarExpr::Compare { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            ScalarExpr::Not(inner) => inner.collect_columns(out),
            ScalarExpr::If {
                condition,
                then_value,
                else_value,
            } => {
                condition.collect_columns(out);
                then_value.collect_columns(out);
                else_value.collect_columns(out);
            }
            ScalarExpr::Cast { expr, .. }
            | ScalarExpr::IsNull { expr, .. }
            | ScalarExpr::InSet { expr, .. } => expr.collect_columns(out),
        }
    }

    /// Collect the ids of every deferred set this expression consumes, in
    /// first-reference order, without duplicates.
    pub fn collect_sets(&self, out: &mut Vec<SetId>) {
        match self {
            ScalarExpr::Literal(_) | ScalarExpr::Column(_) => {}
            ScalarExpr::Binary { left, right, .. } | ScalarExpr::Compare { left, right, .. } => {
                left.collect_sets(out);
                right.collect_sets(out);
            }
            ScalarExpr::Not(inner) => inner.collect_sets(out),
            ScalarExpr::If {
                condition,
                then_value,
                else_value,
            } => {
                condition.collect_sets(out);
                then_value.collect_sets(out);
                else_value.collect_sets(out);
            }
            ScalarExpr::Cast { expr, .. } | ScalarExpr::IsNull { expr, .. } => {
                expr.collect_sets(out)
            }
            ScalarExpr::InSet { expr, set, .. } => {
                expr.collect_sets(out);
                if !out.contains(set) {
                    out.push(set.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lt_zero(col: &str) -> ScalarExpr {
        ScalarExpr::compare(
            ScalarExpr::column(col),
            CompareOp::Lt,
            ScalarExpr::literal(0),
        )
    }

    #[test]
    fn fold_helpers_preserve_order() {
        let or = ScalarExpr::or_all(vec![lt_zero("a"), lt_zero("b"), lt_zero("c")]).unwrap();
        // ((a OR b) OR c): the last operand stays rightmost.
        match or {
            ScalarExpr::Binary { left, op, right } => {
                assert_eq!(op, BinaryOp::Or);
                match *right {
                    ScalarExpr::Compare { left: ref l, .. } => {
                        assert_eq!(**l, ScalarExpr::column("c"))
                    }
                    other => panic!("expected compare on the right, got {other:?}"),
                }
                match *left {
                    ScalarExpr::Binary { op, .. } => assert_eq!(op, BinaryOp::Or),
                    other => panic!("expected nested OR on the left, got {other:?}"),
                }
            }
            other => panic!("expected binary OR, got {other:?}"),
        }

        assert!(ScalarExpr::and_all(vec![]).is_none());
        let single = ScalarExpr::and_all(vec![lt_zero("x")]).unwrap();
        assert_eq!(single, lt_zero("x"));
    }

    #[test]
    fn collect_columns_walks_every_arm() {
        let expr = ScalarExpr::if_then_else(
            lt_zero("cond"),
            ScalarExpr::binary(
                ScalarExpr::column("a"),
                BinaryOp::Add,
                ScalarExpr::literal(1),
            ),
            ScalarExpr::cast(ScalarExpr::column("b"), DataType::Int64),
        );
        let mut cols = FxHashSet::default();
        expr.collect_columns(&mut cols);
        let mut names: Vec<_> = cols.into_iter().collect();
        names.sort();
        assert_eq!(names, vec!["a", "b", "cond"]);
    }

    #[test]
    fn collect_sets_dedups_in_first_reference_order() {
        let in_a = ScalarExpr::InSet {
            expr: Box::new(ScalarExpr::column("x")),
            set: SetId::new("s1"),
            negated: false,
        };
        let in_b = ScalarExpr::InSet {
            expr: Box::new(ScalarExpr::column("y")),
            set: SetId::new("s2"),
            negated: true,
        };
        let expr =
            ScalarExpr::and_all(vec![in_a.clone(), in_b.clone(), in_a.clone()]).unwrap();
        let mut sets = Vec::new();
        expr.collect_sets(&mut sets);
        assert_eq!(sets, vec![SetId::new("s1"), SetId::new("s2")]);
    }

    #[test]
    fn structural_copy_yields_equal_result_names() {
        let expr = ScalarExpr::not(lt_zero("x"));
        let copy = expr.clone();
        assert_eq!(expr.result_name(), copy.result_name());
        assert_eq!(expr, copy);
    }
}
