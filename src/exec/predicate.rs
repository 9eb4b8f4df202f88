//! Row predicates for filtering.
//!
//! A predicate is a tree: comparisons at the leaves, AND/OR nodes above
//! them. Operands are either literal fields or zero-based column references
//! into the row under test.

use crate::exec::{ExecError, Row};
use crate::field::{Field, FieldError};

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// A constant value.
    Literal(Field),
    /// A zero-based column index into the row.
    Column(usize),
}

impl Operand {
    fn resolve<'a>(&'a self, row: &'a Row) -> Result<&'a Field, ExecError> {
        match self {
            Operand::Literal(field) => Ok(field),
            Operand::Column(index) => row.get(*index).ok_or(ExecError::ColumnOutOfRange {
                index: *index,
                arity: row.len(),
            }),
        }
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl CompareOp {
    fn apply(self, left: &Field, right: &Field) -> bool {
        match self {
            CompareOp::Eq => left == right,
            CompareOp::Ne => left != right,
            CompareOp::Lt => left < right,
            CompareOp::Gt => left > right,
            CompareOp::Le => left <= right,
            CompareOp::Ge => left >= right,
        }
    }
}

/// Boolean connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

/// A filter condition over a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `left op right`.
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    /// AND/OR over sub-predicates, evaluated left to right with
    /// short-circuiting. An empty child list evaluates to true.
    Boolean {
        op: LogicOp,
        children: Vec<Predicate>,
    },
}

impl Predicate {
    /// Builds a comparison leaf.
    pub fn compare(left: Operand, op: CompareOp, right: Operand) -> Self {
        Predicate::Compare { left, op, right }
    }

    /// Evaluates the predicate against a row.
    ///
    /// # Errors
    ///
    /// Fails with `TypeMismatch` if a comparison sees operands of different
    /// types, or `ColumnOutOfRange` for a bad column reference.
    pub fn eval(&self, row: &Row) -> Result<bool, ExecError> {
        match self {
            Predicate::Compare { left, op, right } => {
                let left = left.resolve(row)?;
                let right = right.resolve(row)?;
                if left.field_type() != right.field_type() {
                    return Err(ExecError::Field(FieldError::TypeMismatch {
                        expected: left.field_type(),
                        actual: right.field_type(),
                    }));
                }
                Ok(op.apply(left, right))
            }
            Predicate::Boolean { op, children } => match op {
                LogicOp::And => {
                    for child in children {
                        if !child.eval(row)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                LogicOp::Or => {
                    for child in children {
                        if child.eval(row)? {
                            return Ok(true);
                        }
                    }
                    // An empty OR holds, matching the empty-predicate rule.
                    Ok(children.is_empty())
                }
            },
        }
    }
}
