//! Buffer frames: the in-memory slots of the page cache.

use parking_lot::RwLock;

use crate::storage::{PageId, SlottedPage};

/// One slot of the frame table.
///
/// The latch guards the page bytes: shared for readers, exclusive for
/// writers, held for the whole fix/unfix window. Which page the frame holds,
/// and whether it is dirty, is metadata owned by the buffer manager and
/// protected by its state mutex; the latch protects only the contents.
pub(super) struct Frame {
    /// Page latch and the page buffer it guards.
    pub(super) latch: RwLock<SlottedPage>,
}

impl Frame {
    pub(super) fn new() -> Self {
        Self {
            latch: RwLock::new(SlottedPage::new()),
        }
    }
}

/// Per-frame metadata, updated only under the buffer manager's state mutex.
#[derive(Default)]
pub(super) struct FrameMeta {
    /// Page currently held, or `None` for a free frame.
    pub(super) page_id: Option<PageId>,
    /// True if the frame's bytes have diverged from the on-disk page.
    /// Cleared only after a successful flush.
    pub(super) dirty: bool,
}

impl FrameMeta {
    /// Resets the metadata for a newly loaded page.
    pub(super) fn reset(&mut self, page_id: PageId) {
        self.page_id = Some(page_id);
        self.dirty = false;
    }

    /// Clears the metadata when the frame is freed.
    pub(super) fn clear(&mut self) {
        self.page_id = None;
        self.dirty = false;
    }
}
