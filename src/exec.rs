//! Iterator-model (volcano) execution engine.
//!
//! Every operator exposes `open` / `next` / `close` / `output`: `open`
//! initializes, `next` advances to the following row (false means end of
//! stream), and `output` moves the current row out. Operators own their
//! children, so an operator tree is a value whose lifetime encloses its
//! execution.
//!
//! ```text
//! HashAggregation
//!       |
//!    Select ----- Predicate
//!       |
//!    HashJoin
//!     /    \
//!  Scan    Scan      (shared fixes through the buffer manager)
//! ```

pub mod aggregate;
pub mod error;
pub mod insert;
pub mod join;
pub mod planner;
pub mod predicate;
pub mod print;
pub mod project;
pub mod scan;
pub mod select;

#[cfg(test)]
pub(crate) mod test_support;

pub use aggregate::{AggrFunc, AggrOp, HashAggregationOperator};
pub use error::ExecError;
pub use insert::InsertOperator;
pub use join::HashJoinOperator;
pub use planner::{execute_sql, plan, PlanError, QueryError};
pub use predicate::{CompareOp, LogicOp, Operand, Predicate};
pub use print::PrintOperator;
pub use project::ProjectOperator;
pub use scan::ScanOperator;
pub use select::SelectOperator;

use crate::field::Field;

/// A row flowing through the operator tree.
pub type Row = Vec<Field>;

/// A query execution operator.
///
/// The calling convention is strict: `open` before the first `next`;
/// `output` only after a `next` that returned true, at most once per
/// advance (the row is moved out); `close` releases whatever the operator
/// holds and must be called on every exit path.
pub trait Operator {
    /// Prepares the operator for iteration.
    fn open(&mut self) -> Result<(), ExecError>;

    /// Advances to the next row. Returns false at end of stream.
    fn next(&mut self) -> Result<bool, ExecError>;

    /// Releases resources. The operator may be re-opened afterwards.
    fn close(&mut self);

    /// Moves the current row out of the operator.
    ///
    /// Undefined (returns an empty row) before the first successful `next`,
    /// after `next` returned false, or when called twice for one advance.
    fn output(&mut self) -> Row;
}

impl<T: Operator + ?Sized> Operator for Box<T> {
    fn open(&mut self) -> Result<(), ExecError> {
        (**self).open()
    }

    fn next(&mut self) -> Result<bool, ExecError> {
        (**self).next()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn output(&mut self) -> Row {
        (**self).output()
    }
}
