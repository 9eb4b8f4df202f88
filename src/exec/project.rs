//! Projection: keep the listed columns, in the listed order.

use crate::exec::{ExecError, Operator, Row};

/// Projects each input row onto a fixed list of column indices.
///
/// Fields are moved out of the input row, not cloned; an index may appear
/// only once. Indices past the input arity are a contract violation on the
/// part of the tree builder.
pub struct ProjectOperator<I> {
    input: I,
    indices: Vec<usize>,
    current: Option<Row>,
}

impl<I: Operator> ProjectOperator<I> {
    /// Creates a projection of `input` onto `indices`.
    pub fn new(input: I, indices: Vec<usize>) -> Self {
        Self {
            input,
            indices,
            current: None,
        }
    }
}

impl<I: Operator> Operator for ProjectOperator<I> {
    fn open(&mut self) -> Result<(), ExecError> {
        self.current = None;
        self.input.open()
    }

    fn next(&mut self) -> Result<bool, ExecError> {
        if !self.input.next()? {
            self.current = None;
            return Ok(false);
        }
        let mut row: Vec<Option<_>> = self.input.output().into_iter().map(Some).collect();
        let projected = self
            .indices
            .iter()
            .map(|&index| {
                debug_assert!(index < row.len(), "projection index out of range");
                row[index].take().expect("each index taken once")
            })
            .collect();
        self.current = Some(projected);
        Ok(true)
    }

    fn close(&mut self) {
        self.current = None;
        self.input.close();
    }

    fn output(&mut self) -> Row {
        self.current.take().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::test_support::RowSource;
    use crate::field::Field;

    #[test]
    fn test_project_selects_and_reorders() {
        let rows = vec![vec![
            Field::Int(1),
            Field::Str("two".into()),
            Field::Int(3),
        ]];
        let mut op = ProjectOperator::new(RowSource::new(rows), vec![2, 0]);
        op.open().unwrap();
        assert!(op.next().unwrap());
        assert_eq!(op.output(), vec![Field::Int(3), Field::Int(1)]);
        assert!(!op.next().unwrap());
        op.close();
    }

    #[test]
    fn test_project_empty_input() {
        let mut op = ProjectOperator::new(RowSource::new(Vec::new()), vec![0]);
        op.open().unwrap();
        assert!(!op.next().unwrap());
        op.close();
    }
}
