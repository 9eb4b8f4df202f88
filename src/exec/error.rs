//! Execution errors.

use std::fmt;

use crate::buffer::BufferError;
use crate::field::FieldError;
use crate::tuple::TupleError;

/// Errors surfaced while driving an operator tree.
#[derive(Debug)]
pub enum ExecError {
    /// A typed field operation or comparison saw mismatched types.
    Field(FieldError),
    /// A stored tuple failed to decode.
    Tuple(TupleError),
    /// Buffer manager or storage failure.
    Buffer(BufferError),
    /// A tuple does not fit in an empty page, even after extending the file.
    TupleTooLarge,
    /// I/O failure on an output sink.
    Io(std::io::Error),
    /// An operand referenced a column past the end of the row.
    ColumnOutOfRange {
        /// The referenced column index.
        index: usize,
        /// The row's arity.
        arity: usize,
    },
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecError::Field(e) => write!(f, "{}", e),
            ExecError::Tuple(e) => write!(f, "{}", e),
            ExecError::Buffer(e) => write!(f, "{}", e),
            ExecError::TupleTooLarge => write!(f, "tuple too large for an empty page"),
            ExecError::Io(e) => write!(f, "I/O error: {}", e),
            ExecError::ColumnOutOfRange { index, arity } => {
                write!(f, "column {} out of range for row of {} fields", index, arity)
            }
        }
    }
}

impl std::error::Error for ExecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExecError::Field(e) => Some(e),
            ExecError::Tuple(e) => Some(e),
            ExecError::Buffer(e) => Some(e),
            ExecError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FieldError> for ExecError {
    fn from(e: FieldError) -> Self {
        ExecError::Field(e)
    }
}

impl From<TupleError> for ExecError {
    fn from(e: TupleError) -> Self {
        ExecError::Tuple(e)
    }
}

impl From<BufferError> for ExecError {
    fn from(e: BufferError) -> Self {
        ExecError::Buffer(e)
    }
}
