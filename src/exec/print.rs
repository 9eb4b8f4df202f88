//! Line-printing sink.

use std::io::Write;

use crate::exec::{ExecError, Operator, Row};

/// Writes each input row to a sink, one line per row, fields joined with
/// `", "`.
///
/// A sink operator: rows are consumed for printing and `output` hands
/// nothing upward.
pub struct PrintOperator<I, W> {
    input: I,
    sink: W,
}

impl<I: Operator, W: Write> PrintOperator<I, W> {
    /// Prints `input` to `sink`.
    pub fn new(input: I, sink: W) -> Self {
        Self { input, sink }
    }

    /// Consumes the operator and returns the sink.
    pub fn into_sink(self) -> W {
        self.sink
    }
}

impl<I: Operator, W: Write> Operator for PrintOperator<I, W> {
    fn open(&mut self) -> Result<(), ExecError> {
        self.input.open()
    }

    fn next(&mut self) -> Result<bool, ExecError> {
        if !self.input.next()? {
            return Ok(false);
        }
        let row = self.input.output();
        let line = row
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(self.sink, "{}", line).map_err(ExecError::Io)?;
        Ok(true)
    }

    fn close(&mut self) {
        self.input.close();
    }

    fn output(&mut self) -> Row {
        Vec::new()
    }
}
