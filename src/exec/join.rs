//! Hash join: inner equi-join of two inputs.

use std::collections::HashMap;

use crate::exec::{ExecError, Operator, Row};

/// Inner equi-join on one attribute per side.
///
/// `open` runs both phases eagerly: the left input is drained into a hash
/// table keyed by the string form of its join attribute, then the right
/// input is probed and every match is materialized as `left || right`.
/// `next` walks the materialized result.
///
/// Two known limitations: the whole result set lives in memory, and the
/// string-form key admits collisions between values with equal renderings
/// across types (e.g. `1` and `"1"`).
pub struct HashJoinOperator<L, R> {
    left: L,
    right: R,
    left_attr: usize,
    right_attr: usize,
    outputs: std::vec::IntoIter<Row>,
    current: Option<Row>,
}

impl<L: Operator, R: Operator> HashJoinOperator<L, R> {
    /// Joins `left` and `right` on `left.left_attr = right.right_attr`
    /// (zero-based column indices).
    pub fn new(left: L, right: R, left_attr: usize, right_attr: usize) -> Self {
        Self {
            left,
            right,
            left_attr,
            right_attr,
            outputs: Vec::new().into_iter(),
            current: None,
        }
    }

    fn attr<'r>(row: &'r Row, index: usize) -> Result<&'r crate::field::Field, ExecError> {
        row.get(index).ok_or(ExecError::ColumnOutOfRange {
            index,
            arity: row.len(),
        })
    }
}

impl<L: Operator, R: Operator> Operator for HashJoinOperator<L, R> {
    fn open(&mut self) -> Result<(), ExecError> {
        self.current = None;

        // Build phase: hash the left input on its join attribute.
        let mut table: HashMap<String, Vec<Row>> = HashMap::new();
        self.left.open()?;
        while self.left.next()? {
            let row = self.left.output();
            let key = Self::attr(&row, self.left_attr)?.to_string();
            table.entry(key).or_default().push(row);
        }

        // Probe phase: emit left || right for every key match.
        let mut outputs = Vec::new();
        self.right.open()?;
        while self.right.next()? {
            let right_row = self.right.output();
            let key = Self::attr(&right_row, self.right_attr)?.to_string();
            if let Some(matches) = table.get(&key) {
                for left_row in matches {
                    let mut joined = left_row.clone();
                    joined.extend(right_row.iter().cloned());
                    outputs.push(joined);
                }
            }
        }

        self.outputs = outputs.into_iter();
        Ok(())
    }

    fn next(&mut self) -> Result<bool, ExecError> {
        self.current = self.outputs.next();
        Ok(self.current.is_some())
    }

    fn close(&mut self) {
        self.left.close();
        self.right.close();
        self.outputs = Vec::new().into_iter();
        self.current = None;
    }

    fn output(&mut self) -> Row {
        self.current.take().unwrap_or_default()
    }
}
