//! RAII guards pairing every fix with exactly one unfix.
//!
//! A guard holds the page latch (shared or exclusive) and the pin on the
//! page; dropping it performs the unfix. The release order is fixed: the
//! buffer manager's state mutex is taken and released first, then the latch
//! is dropped. Matching the fix path's acquisition order keeps the lock
//! ordering invariant.

use std::ops::{Deref, DerefMut};

use log::error;
use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::buffer::manager::BufferManager;
use crate::buffer::policy::{Policy, TwoQPolicy};
use crate::buffer::FrameId;
use crate::storage::{PageId, SlottedPage};

/// Shared (read) access to a fixed page.
///
/// The page stays resident and readable until the guard drops.
pub struct PageReadGuard<'a, P: Policy = TwoQPolicy> {
    manager: &'a BufferManager<P>,
    frame_id: FrameId,
    page_id: PageId,
    latch: Option<RwLockReadGuard<'a, SlottedPage>>,
}

impl<'a, P: Policy> PageReadGuard<'a, P> {
    pub(super) fn new(
        manager: &'a BufferManager<P>,
        frame_id: FrameId,
        page_id: PageId,
        latch: RwLockReadGuard<'a, SlottedPage>,
    ) -> Self {
        Self {
            manager,
            frame_id,
            page_id,
            latch: Some(latch),
        }
    }

    /// The fixed page's id.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }
}

impl<P: Policy> Deref for PageReadGuard<'_, P> {
    type Target = SlottedPage;

    fn deref(&self) -> &SlottedPage {
        self.latch.as_ref().expect("latch held until drop")
    }
}

impl<P: Policy> Drop for PageReadGuard<'_, P> {
    fn drop(&mut self) {
        if let Err(e) = self
            .manager
            .release(self.frame_id, self.page_id, false, false)
        {
            debug_assert!(false, "shared unfix failed: {}", e);
            error!("shared unfix of page {} failed: {}", self.page_id, e);
        }
        // The latch itself drops after this body, i.e. after the state
        // mutex has been released inside `release`.
        self.latch.take();
    }
}

/// Exclusive (write) access to a fixed page.
///
/// Call [`mark_dirty`](Self::mark_dirty) after modifying the page so the
/// unfix records the frame as needing a write-back; an unmarked guard
/// unfixes clean.
pub struct PageWriteGuard<'a, P: Policy = TwoQPolicy> {
    manager: &'a BufferManager<P>,
    frame_id: FrameId,
    page_id: PageId,
    dirty: bool,
    latch: Option<RwLockWriteGuard<'a, SlottedPage>>,
}

impl<'a, P: Policy> PageWriteGuard<'a, P> {
    pub(super) fn new(
        manager: &'a BufferManager<P>,
        frame_id: FrameId,
        page_id: PageId,
        latch: RwLockWriteGuard<'a, SlottedPage>,
    ) -> Self {
        Self {
            manager,
            frame_id,
            page_id,
            dirty: false,
            latch: Some(latch),
        }
    }

    /// The fixed page's id.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Records that the page bytes were modified.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

impl<P: Policy> Deref for PageWriteGuard<'_, P> {
    type Target = SlottedPage;

    fn deref(&self) -> &SlottedPage {
        self.latch.as_ref().expect("latch held until drop")
    }
}

impl<P: Policy> DerefMut for PageWriteGuard<'_, P> {
    fn deref_mut(&mut self) -> &mut SlottedPage {
        self.latch.as_mut().expect("latch held until drop")
    }
}

impl<P: Policy> Drop for PageWriteGuard<'_, P> {
    fn drop(&mut self) {
        if let Err(e) = self
            .manager
            .release(self.frame_id, self.page_id, true, self.dirty)
        {
            debug_assert!(false, "exclusive unfix failed: {}", e);
            error!("exclusive unfix of page {} failed: {}", self.page_id, e);
        }
        self.latch.take();
    }
}
