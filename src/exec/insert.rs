//! Insertion into the slotted file through the buffer manager.

use crate::buffer::BufferManager;
use crate::exec::{ExecError, Operator, Row};
use crate::storage::PageId;
use crate::tuple::Tuple;

/// Inserts staged tuples.
///
/// Stage a tuple with [`stage`](Self::stage), then call `next` to place it:
/// the operator sweeps pages 0..num_pages fixing each exclusively until one
/// admits the tuple (there is no free-space map), extending the file by one
/// page when none does. A page that accepts the tuple is unfixed dirty;
/// pages that reject it are unfixed clean.
pub struct InsertOperator<'a> {
    buffer: &'a BufferManager,
    staged: Option<Tuple>,
}

impl<'a> InsertOperator<'a> {
    /// Creates an inserter over the given buffer manager.
    pub fn new(buffer: &'a BufferManager) -> Self {
        Self {
            buffer,
            staged: None,
        }
    }

    /// Stages a tuple for the next `next` call.
    pub fn stage(&mut self, tuple: Tuple) {
        self.staged = Some(tuple);
    }

    fn place(&self, tuple: &Tuple) -> Result<(), ExecError> {
        let num_pages = self.buffer.num_pages();
        for page_id in 0..num_pages {
            let page_id = page_id as PageId;
            let mut frame = self.buffer.fix_exclusive(page_id)?;
            if frame.insert(tuple).is_ok() {
                frame.mark_dirty();
                return Ok(());
            }
        }

        // Every existing page rejected the tuple: grow by one page and try
        // exactly once more.
        self.buffer.extend()?;
        let new_page = (self.buffer.num_pages() - 1) as PageId;
        let mut frame = self.buffer.fix_exclusive(new_page)?;
        if frame.insert(tuple).is_ok() {
            frame.mark_dirty();
            return Ok(());
        }
        Err(ExecError::TupleTooLarge)
    }
}

impl Operator for InsertOperator<'_> {
    fn open(&mut self) -> Result<(), ExecError> {
        Ok(())
    }

    /// Inserts the staged tuple. Returns false when nothing is staged.
    fn next(&mut self) -> Result<bool, ExecError> {
        let tuple = match self.staged.take() {
            Some(tuple) => tuple,
            None => return Ok(false),
        };
        self.place(&tuple)?;
        Ok(true)
    }

    fn close(&mut self) {
        self.staged = None;
    }

    /// Insertion produces no rows.
    fn output(&mut self) -> Row {
        Vec::new()
    }
}
