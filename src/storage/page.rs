//! Slotted page layout.
//!
//! A page is a fixed [`PAGE_SIZE`] byte buffer. The first [`METADATA_SIZE`]
//! bytes hold a directory of [`MAX_SLOTS`] slot entries; tuples are encoded
//! back-to-back in the remaining area.
//!
//! ```text
//! +------------------+-------------------------------------------+
//! | Slot directory   | Tuple area                                |
//! | [slot 0]         |                                           |
//! | [slot 1]         |        <- serialized tuples               |
//! | ...              |                                           |
//! +------------------+-------------------------------------------+
//! ^                  ^                                           ^
//! 0           METADATA_SIZE                                PAGE_SIZE
//! ```
//!
//! Deletion never compacts: a deleted slot keeps its offset and length so a
//! later tuple of at most that length can reuse the footprint. Bytes outside
//! the occupied slots' ranges carry arbitrary prior contents and are never
//! interpreted.

use std::fmt;

use crate::storage::{INVALID_VALUE, MAX_SLOTS, METADATA_SIZE, PAGE_SIZE, SLOT_SIZE};
use crate::tuple::Tuple;

/// Index of a slot within a page's directory.
pub type SlotId = u16;

/// Errors from page-local tuple placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageError {
    /// No slot and byte range in this page can hold the tuple.
    NoSpace,
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageError::NoSpace => write!(f, "no space left in page"),
        }
    }
}

impl std::error::Error for PageError {}

/// One directory entry.
///
/// `empty = false` implies `offset` and `length` are valid. A used-then
/// -emptied slot keeps both so its byte range can be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot {
    empty: bool,
    offset: u16,
    length: u16,
}

impl Slot {
    const NEVER_USED: Slot = Slot {
        empty: true,
        offset: INVALID_VALUE,
        length: INVALID_VALUE,
    };

    /// Decodes a directory entry from its 6-byte stride.
    ///
    /// An all-zero entry decodes as the never-used slot: live slots always
    /// have an offset of at least `METADATA_SIZE` and deleted slots keep
    /// their nonzero offset, so the zero pattern can only come from a
    /// freshly appended page.
    fn read_from(buf: &[u8]) -> Slot {
        let empty = buf[0] != 0;
        let offset = u16::from_le_bytes([buf[1], buf[2]]);
        let length = u16::from_le_bytes([buf[3], buf[4]]);
        if !empty && offset == 0 && length == 0 {
            return Slot::NEVER_USED;
        }
        Slot {
            empty,
            offset,
            length,
        }
    }

    /// Encodes this entry into its 6-byte stride.
    fn write_to(self, buf: &mut [u8]) {
        buf[0] = self.empty as u8;
        buf[1..3].copy_from_slice(&self.offset.to_le_bytes());
        buf[3..5].copy_from_slice(&self.length.to_le_bytes());
        buf[5] = 0;
    }

    fn never_used(self) -> bool {
        self.empty && self.offset == INVALID_VALUE
    }
}

/// A fixed-size page storing tuples through a slot directory.
///
/// Pages own their heap buffer and are move-only; the buffer manager reuses
/// page buffers across loads, so cheap moves matter more than copies.
pub struct SlottedPage {
    data: Box<[u8; PAGE_SIZE]>,
}

impl SlottedPage {
    /// Creates a zeroed page: every slot decodes as never-used.
    pub fn new() -> Self {
        Self {
            data: Box::new([0; PAGE_SIZE]),
        }
    }

    /// Raw page bytes, for whole-page I/O.
    pub fn bytes(&self) -> &[u8; PAGE_SIZE] {
        &self.data
    }

    /// Mutable raw page bytes.
    ///
    /// Callers writing through this bypass the slot directory's invariants;
    /// the file manager and scenario tests treat pages as opaque blocks.
    pub fn bytes_mut(&mut self) -> &mut [u8; PAGE_SIZE] {
        &mut self.data
    }

    fn slot(&self, index: usize) -> Slot {
        let at = index * SLOT_SIZE;
        Slot::read_from(&self.data[at..at + SLOT_SIZE])
    }

    fn set_slot(&mut self, index: usize, slot: Slot) {
        let at = index * SLOT_SIZE;
        slot.write_to(&mut self.data[at..at + SLOT_SIZE]);
    }

    /// Inserts a tuple, returning the slot it landed in.
    ///
    /// Placement order:
    /// 1. the first used-then-emptied slot whose residual length fits the
    ///    encoded tuple (reuse of a prior footprint);
    /// 2. otherwise the first never-used slot, placed after the predecessor
    ///    slot's byte range (or at `METADATA_SIZE` for slot 0).
    ///
    /// # Errors
    ///
    /// Fails with [`PageError::NoSpace`] if no slot is available or the
    /// chosen offset would run past the end of the page; the directory is
    /// left unchanged on failure.
    pub fn insert(&mut self, tuple: &Tuple) -> Result<SlotId, PageError> {
        let encoded = tuple.serialize();
        let size = encoded.len();

        // Used slots form a prefix of the directory (first use always takes
        // the first never-used slot), so one ordered scan finds whichever
        // comes first: an emptied slot with room, or the never-used
        // frontier. Every emptied slot lies before the frontier, keeping
        // the reuse-before-fresh preference.
        let mut chosen = None;
        for i in 0..MAX_SLOTS {
            let slot = self.slot(i);
            if slot.never_used() || (slot.empty && slot.length as usize >= size) {
                chosen = Some(i);
                break;
            }
        }
        let index = chosen.ok_or(PageError::NoSpace)?;

        let prior = self.slot(index);
        let offset = if prior.offset != INVALID_VALUE {
            prior.offset as usize
        } else if index == 0 {
            METADATA_SIZE
        } else {
            // First use of this slot: append after the predecessor's range.
            let prev = self.slot(index - 1);
            if prev.offset != INVALID_VALUE {
                prev.offset as usize + prev.length as usize
            } else {
                METADATA_SIZE
            }
        };

        if offset + size >= PAGE_SIZE {
            return Err(PageError::NoSpace);
        }
        debug_assert!(offset >= METADATA_SIZE);

        let slot = Slot {
            empty: false,
            offset: offset as u16,
            // A reused slot keeps its original length; readers tolerate
            // trailing bytes past the encoded tuple.
            length: if prior.length == INVALID_VALUE {
                size as u16
            } else {
                prior.length
            },
        };
        self.set_slot(index, slot);
        self.data[offset..offset + size].copy_from_slice(encoded.as_bytes());
        Ok(index as SlotId)
    }

    /// Marks a slot empty, keeping its offset and length for reuse.
    ///
    /// Idempotent; out-of-range and already-empty slots are a no-op.
    pub fn delete(&mut self, slot_id: SlotId) {
        let index = slot_id as usize;
        if index >= MAX_SLOTS {
            return;
        }
        let mut slot = self.slot(index);
        if !slot.empty {
            slot.empty = true;
            self.set_slot(index, slot);
        }
    }

    /// Returns the byte range of an occupied slot.
    ///
    /// `None` for out-of-range or empty slots. The range may be longer than
    /// the tuple it holds after slot reuse.
    pub fn read(&self, slot_id: SlotId) -> Option<&[u8]> {
        let index = slot_id as usize;
        if index >= MAX_SLOTS {
            return None;
        }
        let slot = self.slot(index);
        if slot.empty || slot.offset == INVALID_VALUE || slot.length == INVALID_VALUE {
            return None;
        }
        let start = slot.offset as usize;
        let end = start + slot.length as usize;
        if end > PAGE_SIZE {
            return None;
        }
        Some(&self.data[start..end])
    }

    /// Counts occupied slots with a linear directory scan.
    pub fn count(&self) -> usize {
        (0..MAX_SLOTS).filter(|&i| !self.slot(i).empty).count()
    }
}

impl Default for SlottedPage {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SlottedPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlottedPage")
            .field("occupied", &self.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;

    fn tuple_of(n: i32) -> Tuple {
        Tuple::from(vec![Field::Int(n)])
    }

    fn str_tuple(len: usize) -> Tuple {
        Tuple::from(vec![Field::Str("x".repeat(len))])
    }

    #[test]
    fn test_fresh_page_is_unoccupied() {
        let page = SlottedPage::new();
        assert_eq!(page.count(), 0);
        assert_eq!(page.read(0), None);
        assert_eq!(page.read(MAX_SLOTS as SlotId), None);
    }

    #[test]
    fn test_insert_and_read_back() {
        let mut page = SlottedPage::new();
        let t = tuple_of(42);
        let slot = page.insert(&t).unwrap();
        assert_eq!(slot, 0);
        assert_eq!(page.count(), 1);

        let bytes = page.read(slot).unwrap();
        assert_eq!(Tuple::deserialize(bytes).unwrap(), t);
    }

    #[test]
    fn test_sequential_placement() {
        let mut page = SlottedPage::new();
        let a = page.insert(&tuple_of(1)).unwrap();
        let b = page.insert(&tuple_of(2)).unwrap();
        assert_eq!((a, b), (0, 1));

        // Slot 1 lands directly after slot 0's range.
        let first = tuple_of(1).serialize().len();
        assert_eq!(
            page.read(b).unwrap().as_ptr() as usize - page.read(a).unwrap().as_ptr() as usize,
            first
        );
    }

    #[test]
    fn test_delete_is_idempotent_and_preserves_footprint() {
        let mut page = SlottedPage::new();
        let slot = page.insert(&tuple_of(7)).unwrap();
        page.delete(slot);
        assert_eq!(page.count(), 0);
        assert_eq!(page.read(slot), None);
        page.delete(slot);
        page.delete(999);
        assert_eq!(page.count(), 0);
    }

    #[test]
    fn test_reuse_of_deleted_slot() {
        let mut page = SlottedPage::new();
        let big = page.insert(&str_tuple(40)).unwrap();
        let keep = page.insert(&tuple_of(1)).unwrap();
        let keep_offset = page.read(keep).unwrap().as_ptr() as usize;

        page.delete(big);
        // A smaller tuple reuses the deleted footprint rather than a fresh slot.
        let reused = page.insert(&str_tuple(10)).unwrap();
        assert_eq!(reused, big);
        assert_eq!(page.read(keep).unwrap().as_ptr() as usize, keep_offset);

        let bytes = page.read(reused).unwrap();
        assert_eq!(
            Tuple::deserialize(bytes).unwrap(),
            str_tuple(10),
            "trailing stale bytes must not leak into the decoded tuple"
        );
    }

    #[test]
    fn test_reuse_requires_fitting_length() {
        let mut page = SlottedPage::new();
        let small = page.insert(&str_tuple(5)).unwrap();
        page.delete(small);
        // Too big for the emptied footprint: goes to the next never-used slot.
        let slot = page.insert(&str_tuple(50)).unwrap();
        assert_ne!(slot, small);
    }

    #[test]
    fn test_no_space_when_area_exhausted() {
        let mut page = SlottedPage::new();
        let mut inserted = 0;
        loop {
            match page.insert(&str_tuple(90)) {
                Ok(_) => inserted += 1,
                Err(PageError::NoSpace) => break,
            }
        }
        // ~100-byte encodings into a 1024-byte area.
        assert!(inserted >= 9 && inserted < 11, "inserted {}", inserted);
        assert_eq!(page.count(), inserted);

        // The failed insert left the directory unchanged: a fitting tuple
        // cannot be placed either once the area is full.
        assert!(page.insert(&str_tuple(90)).is_err());
    }

    #[test]
    fn test_directory_roundtrips_through_bytes() {
        let mut page = SlottedPage::new();
        let t = tuple_of(3);
        let slot = page.insert(&t).unwrap();
        page.insert(&tuple_of(4)).unwrap();
        page.delete(1);

        // Rebuild a page from the raw bytes, as a disk load does.
        let mut copy = SlottedPage::new();
        copy.bytes_mut().copy_from_slice(page.bytes());
        assert_eq!(copy.count(), 1);
        assert_eq!(Tuple::deserialize(copy.read(slot).unwrap()).unwrap(), t);
        assert_eq!(copy.read(1), None);
    }
}
