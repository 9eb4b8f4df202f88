//! Selection: drive the input forward until the predicate holds.

use crate::exec::{ExecError, Operator, Predicate, Row};

/// Filters rows by a predicate.
pub struct SelectOperator<I> {
    input: I,
    predicate: Predicate,
    current: Option<Row>,
}

impl<I: Operator> SelectOperator<I> {
    /// Creates a filter over `input`. The operator owns the predicate.
    pub fn new(input: I, predicate: Predicate) -> Self {
        Self {
            input,
            predicate,
            current: None,
        }
    }
}

impl<I: Operator> Operator for SelectOperator<I> {
    fn open(&mut self) -> Result<(), ExecError> {
        self.current = None;
        self.input.open()
    }

    fn next(&mut self) -> Result<bool, ExecError> {
        while self.input.next()? {
            let row = self.input.output();
            if self.predicate.eval(&row)? {
                self.current = Some(row);
                return Ok(true);
            }
        }
        self.current = None;
        Ok(false)
    }

    fn close(&mut self) {
        self.current = None;
        self.input.close();
    }

    fn output(&mut self) -> Row {
        self.current.take().unwrap_or_default()
    }
}
