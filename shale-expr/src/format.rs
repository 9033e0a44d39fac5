//! Lightweight formatting helpers for expression enums.
//!
//! The display form doubles as the synthesized column name of an
//! expression, so it must be deterministic and stable across clones.

use std::fmt;

use crate::expr::{BinaryOp, CompareOp, ScalarExpr, SetId};
use crate::literal::Literal;

impl BinaryOp {
    /// Render the operator as a human-readable symbol/keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }
}

impl CompareOp {
    /// Render the operator as a human-readable symbol.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
        }
    }
}

impl fmt::Display for SetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(v) => write!(f, "{v}"),
            Literal::Float(v) => write!(f, "{v}"),
            Literal::String(v) => write!(f, "'{v}'"),
            Literal::Boolean(v) => write!(f, "{}", if *v { "TRUE" } else { "FALSE" }),
            Literal::Null => write!(f, "NULL"),
        }
    }
}

impl fmt::Display for ScalarExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarExpr::Literal(lit) => write!(f, "{lit}"),
            ScalarExpr::Column(name) => write!(f, "{name}"),
            ScalarExpr::Binary { left, op, right } => {
                write!(f, "({left} {} {right})", op.as_str())
            }
            ScalarExpr::Compare { left, op, right } => {
                write!(f, "({left} {} {right})", op.as_str())
            }
            ScalarExpr::Not(inner) => write!(f, "NOT {inner}"),
            ScalarExpr::If {
                condition,
                then_value,
                else_value,
            } => write!(f, "IF({condition}, {then_value}, {else_value})"),
            ScalarExpr::Cast { expr, data_type } => {
                write!(f, "CAST({expr} AS {data_type})")
            }
            ScalarExpr::IsNull { expr, negated } => {
                write!(f, "({expr} IS {}NULL)", if *negated { "NOT " } else { "" })
            }
            ScalarExpr::InSet { expr, set, negated } => {
                write!(f, "({expr} {}IN <{set}>)", if *negated { "NOT " } else { "" })
            }
        }
    }
}
