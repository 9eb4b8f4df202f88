//! Sequential scan over every page of the database file.

use crate::buffer::{BufferManager, PageReadGuard};
use crate::exec::{ExecError, Operator, Row};
use crate::storage::{PageId, MAX_SLOTS};
use crate::tuple::Tuple;

/// Scans pages 0..num_pages in order, decoding every occupied slot.
///
/// The scan fixes one page shared at a time and unfixes it when its slots
/// are exhausted, so at most one page is pinned per scan at any moment.
///
/// With a relation filter, only tuples whose last field is a string equal to
/// the filter are produced, and that trailing tag is popped before the row
/// is handed upward. Without a filter every tuple is produced unchanged.
pub struct ScanOperator<'a> {
    buffer: &'a BufferManager,
    relation: Option<String>,
    page_id: PageId,
    slot: usize,
    frame: Option<PageReadGuard<'a>>,
    current: Option<Row>,
}

impl<'a> ScanOperator<'a> {
    /// Scans every tuple in the file.
    pub fn new(buffer: &'a BufferManager) -> Self {
        Self {
            buffer,
            relation: None,
            page_id: 0,
            slot: 0,
            frame: None,
            current: None,
        }
    }

    /// Scans tuples tagged with the given relation name.
    pub fn with_relation(buffer: &'a BufferManager, relation: impl Into<String>) -> Self {
        Self {
            relation: Some(relation.into()),
            ..Self::new(buffer)
        }
    }

    /// Finds the next matching tuple, pinning and unpinning pages as the
    /// scan crosses page boundaries.
    fn advance(&mut self) -> Result<Option<Row>, ExecError> {
        while (self.page_id as u64) < self.buffer.num_pages() {
            if self.frame.is_none() {
                self.frame = Some(self.buffer.fix_shared(self.page_id)?);
            }
            let page = self.frame.as_ref().expect("page pinned above");

            while self.slot < MAX_SLOTS {
                let slot = self.slot;
                self.slot += 1;

                let bytes = match page.read(slot as u16) {
                    Some(bytes) => bytes,
                    None => continue,
                };
                let tuple = Tuple::deserialize(bytes)?;

                let mut fields = tuple.into_fields();
                if let Some(relation) = &self.relation {
                    let tagged =
                        matches!(fields.last(), Some(f) if f.as_str() == Ok(relation.as_str()));
                    if !tagged {
                        continue;
                    }
                    // Pop the relation tag here so `output` stays a plain move.
                    fields.pop();
                }
                return Ok(Some(fields));
            }

            self.frame = None;
            self.page_id += 1;
            self.slot = 0;
        }
        Ok(None)
    }
}

impl Operator for ScanOperator<'_> {
    fn open(&mut self) -> Result<(), ExecError> {
        self.page_id = 0;
        self.slot = 0;
        self.frame = None;
        self.current = None;
        Ok(())
    }

    fn next(&mut self) -> Result<bool, ExecError> {
        match self.advance() {
            Ok(row) => {
                self.current = row;
                Ok(self.current.is_some())
            }
            Err(e) => {
                // Release the pin before surfacing the error.
                self.frame = None;
                self.current = None;
                Err(e)
            }
        }
    }

    fn close(&mut self) {
        self.frame = None;
        self.page_id = 0;
        self.slot = 0;
        self.current = None;
    }

    fn output(&mut self) -> Row {
        self.current.take().unwrap_or_default()
    }
}
