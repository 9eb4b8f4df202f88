//! The buffer manager: fix/unfix, pin counting, eviction, and dirty flush.

use std::collections::HashMap;
use std::thread;

use log::{debug, error};
use parking_lot::{Mutex, RwLockWriteGuard};

use crate::buffer::frame::{Frame, FrameMeta};
use crate::buffer::guard::{PageReadGuard, PageWriteGuard};
use crate::buffer::policy::{PinState, Policy, TwoQPolicy};
use crate::buffer::{BufferError, FrameId};
use crate::storage::{FileManager, PageId, SlottedPage};

/// Mutable bookkeeping, all of it behind one mutex.
///
/// One coarse mutex is an acknowledged scalability ceiling; it keeps every
/// load, eviction, and pin transition linearized, which is what the
/// correctness argument leans on.
struct BufferState<P> {
    /// Per-frame metadata, indexed by [`FrameId`].
    meta: Vec<FrameMeta>,
    /// Frames not currently holding any page.
    free: Vec<FrameId>,
    /// Which frame holds each resident page.
    frame_of_page: HashMap<PageId, FrameId>,
    /// Pin state of each resident page.
    page_state: HashMap<PageId, PinState>,
    /// Replacement policy consulted when the pool is full.
    policy: P,
}

/// A bounded cache of pages with shared/exclusive latching.
///
/// # Locking protocol
///
/// Two kinds of locks exist: the single state mutex and one read–write latch
/// per frame. Acquisition order is always state mutex first, then latch;
/// during unfix the state mutex is taken and released before the latch is
/// dropped. The state mutex is never held across I/O except while flushing a
/// dirty eviction victim on the load path.
///
/// On a hit, the latch is taken non-blocking; if that fails the fix releases
/// the mutex, yields, and retries. Fairness is not guaranteed.
///
/// # Concurrency contract
///
/// * at most one exclusive holder per page; shared holders are unbounded;
/// * a page with any holder is never selected for eviction;
/// * writes made under an exclusive fix are visible to every later fix of
///   the same page (latch release/acquire pairs synchronize them).
pub struct BufferManager<P: Policy = TwoQPolicy> {
    file: FileManager,
    /// Fixed-size frame table; a frame's buffer is reused when its slot is
    /// given to another page.
    frames: Vec<Frame>,
    state: Mutex<BufferState<P>>,
    capacity: usize,
}

impl BufferManager<TwoQPolicy> {
    /// Creates a buffer manager with the default 2Q replacement policy.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(file: FileManager, capacity: usize) -> Self {
        Self::with_policy(file, capacity, TwoQPolicy::new())
    }

    /// FIFO queue contents of the 2Q policy, eviction candidate first.
    pub fn fifo_pages(&self) -> Vec<PageId> {
        self.state.lock().policy.fifo_pages()
    }

    /// LRU queue contents of the 2Q policy, least recent first.
    pub fn lru_pages(&self) -> Vec<PageId> {
        self.state.lock().policy.lru_pages()
    }
}

impl<P: Policy> BufferManager<P> {
    /// Creates a buffer manager with an injected replacement policy.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn with_policy(file: FileManager, capacity: usize, policy: P) -> Self {
        assert!(capacity > 0, "capacity must be > 0");
        Self {
            file,
            frames: (0..capacity).map(|_| Frame::new()).collect(),
            state: Mutex::new(BufferState {
                meta: (0..capacity).map(|_| FrameMeta::default()).collect(),
                free: (0..capacity).collect(),
                frame_of_page: HashMap::with_capacity(capacity),
                page_state: HashMap::with_capacity(capacity),
                policy,
            }),
            capacity,
        }
    }

    /// Number of frames in the pool.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of pages in the underlying file.
    pub fn num_pages(&self) -> u64 {
        self.file.num_pages()
    }

    /// Fixes a page shared. Blocks (spinning with yield) while the page is
    /// exclusively latched.
    ///
    /// # Errors
    ///
    /// Fails with [`BufferError::BufferFull`] when the page must be loaded
    /// and every cached page is pinned; storage failures propagate.
    pub fn fix_shared(&self, page_id: PageId) -> Result<PageReadGuard<'_, P>, BufferError> {
        loop {
            {
                let mut state = self.state.lock();
                let state = &mut *state;
                match state.frame_of_page.get(&page_id).copied() {
                    None => {
                        let (frame_id, latch) = self.load_page(state, page_id)?;
                        // Downgrade after the load so readers on other
                        // threads can come in behind us.
                        let latch = RwLockWriteGuard::downgrade(latch);
                        state.page_state.insert(page_id, PinState::Shared(1));
                        state.frame_of_page.insert(page_id, frame_id);
                        state.policy.touch(page_id);
                        return Ok(PageReadGuard::new(self, frame_id, page_id, latch));
                    }
                    Some(frame_id) => {
                        if let Some(latch) = self.frames[frame_id].latch.try_read() {
                            let entry = state
                                .page_state
                                .get_mut(&page_id)
                                .expect("resident page has a pin state");
                            *entry = match *entry {
                                PinState::Unfixed => PinState::Shared(1),
                                PinState::Shared(n) => PinState::Shared(n + 1),
                                PinState::Exclusive => {
                                    // A shared latch cannot be granted while
                                    // the write latch is held.
                                    unreachable!("shared latch granted on an exclusive page")
                                }
                            };
                            state.policy.touch(page_id);
                            return Ok(PageReadGuard::new(self, frame_id, page_id, latch));
                        }
                    }
                }
            }
            thread::yield_now();
        }
    }

    /// Fixes a page exclusive. Blocks (spinning with yield) while any other
    /// holder has the page fixed.
    ///
    /// # Errors
    ///
    /// Same as [`fix_shared`](Self::fix_shared).
    pub fn fix_exclusive(&self, page_id: PageId) -> Result<PageWriteGuard<'_, P>, BufferError> {
        loop {
            {
                let mut state = self.state.lock();
                let state = &mut *state;
                match state.frame_of_page.get(&page_id).copied() {
                    None => {
                        let (frame_id, latch) = self.load_page(state, page_id)?;
                        state.page_state.insert(page_id, PinState::Exclusive);
                        state.frame_of_page.insert(page_id, frame_id);
                        state.policy.touch(page_id);
                        return Ok(PageWriteGuard::new(self, frame_id, page_id, latch));
                    }
                    Some(frame_id) => {
                        if let Some(latch) = self.frames[frame_id].latch.try_write() {
                            let entry = state
                                .page_state
                                .get_mut(&page_id)
                                .expect("resident page has a pin state");
                            // The write latch can only be granted when no
                            // holder exists; the state must agree.
                            debug_assert_eq!(*entry, PinState::Unfixed);
                            *entry = PinState::Exclusive;
                            state.policy.touch(page_id);
                            return Ok(PageWriteGuard::new(self, frame_id, page_id, latch));
                        }
                    }
                }
            }
            thread::yield_now();
        }
    }

    /// Loads a page into a frame, evicting if necessary. Called with the
    /// state mutex held; returns the frame's write latch.
    fn load_page<'a>(
        &'a self,
        state: &mut BufferState<P>,
        page_id: PageId,
    ) -> Result<(FrameId, RwLockWriteGuard<'a, SlottedPage>), BufferError> {
        if state.free.is_empty() {
            let victim = state.policy.evict(&state.page_state)?;
            let victim_frame = *state
                .frame_of_page
                .get(&victim)
                .expect("victim is resident");
            if state.meta[victim_frame].dirty {
                // The victim is unfixed; its latch is free apart from the
                // tail of a concurrent unfix.
                let page = self.frames[victim_frame].latch.read();
                self.file.flush(victim, &page)?;
            }
            state.frame_of_page.remove(&victim);
            state.page_state.remove(&victim);
            state.meta[victim_frame].clear();
            state.free.push(victim_frame);
            debug!("evicted page {} from frame {}", victim, victim_frame);
        }

        let frame_id = state.free.pop().expect("a frame was just freed");

        // Fixing a page past the end of the file grows the file to reach it.
        if page_id as u64 >= self.file.num_pages() {
            self.file.extend_to(page_id)?;
        }

        match self.file.load(page_id) {
            Ok(page) => {
                let mut latch = self.frames[frame_id].latch.write();
                *latch = page;
                state.meta[frame_id].reset(page_id);
                Ok((frame_id, latch))
            }
            Err(e) => {
                state.free.push(frame_id);
                Err(e.into())
            }
        }
    }

    /// Unfix half of the protocol, called from guard drops.
    ///
    /// Updates the dirty flag and pin state under the state mutex and
    /// returns; the caller drops the latch afterwards, preserving the
    /// release order mutex-before-latch.
    pub(super) fn release(
        &self,
        frame_id: FrameId,
        page_id: PageId,
        exclusive: bool,
        made_dirty: bool,
    ) -> Result<(), BufferError> {
        let mut state = self.state.lock();
        if made_dirty {
            state.meta[frame_id].dirty = true;
        }
        let entry = state
            .page_state
            .get_mut(&page_id)
            .ok_or(BufferError::UnfixUnfixed)?;
        match (*entry, exclusive) {
            (PinState::Exclusive, true) => {
                *entry = PinState::Unfixed;
                Ok(())
            }
            (PinState::Shared(1), false) => {
                *entry = PinState::Unfixed;
                Ok(())
            }
            (PinState::Shared(n), false) => {
                *entry = PinState::Shared(n - 1);
                Ok(())
            }
            _ => Err(BufferError::UnfixUnfixed),
        }
    }

    /// Writes one frame back to disk if it holds a dirty page.
    ///
    /// Skips a frame whose latch cannot be taken without blocking; a pinned
    /// dirty page will be flushed at eviction or shutdown instead.
    pub fn flush_frame(&self, frame_id: FrameId) -> Result<(), BufferError> {
        let mut state = self.state.lock();
        self.flush_frame_locked(&mut state, frame_id)
    }

    /// Writes every dirty, unlatched frame back to disk.
    pub fn flush_all(&self) -> Result<(), BufferError> {
        let mut state = self.state.lock();
        for frame_id in 0..self.capacity {
            self.flush_frame_locked(&mut state, frame_id)?;
        }
        Ok(())
    }

    fn flush_frame_locked(
        &self,
        state: &mut BufferState<P>,
        frame_id: FrameId,
    ) -> Result<(), BufferError> {
        let meta = &state.meta[frame_id];
        let page_id = match meta.page_id {
            Some(page_id) if meta.dirty => page_id,
            _ => return Ok(()),
        };
        // try_read, not read: blocking here while holding the state mutex
        // would deadlock against an exclusive holder's unfix.
        if let Some(page) = self.frames[frame_id].latch.try_read() {
            self.file.flush(page_id, &page)?;
            drop(page);
            state.meta[frame_id].dirty = false;
        }
        Ok(())
    }

    /// Appends one zero page to the file.
    pub fn extend(&self) -> Result<(), BufferError> {
        self.file.extend()?;
        Ok(())
    }

    /// Grows the file until `page_id` is valid.
    pub fn extend_to(&self, page_id: PageId) -> Result<(), BufferError> {
        self.file.extend_to(page_id)?;
        Ok(())
    }
}

impl<P: Policy> Drop for BufferManager<P> {
    /// Flushes every dirty frame. With `&mut self` no latches or mutexes can
    /// be held, so the frames are accessed directly.
    fn drop(&mut self) {
        let state = self.state.get_mut();
        for (frame_id, meta) in state.meta.iter_mut().enumerate() {
            if let Some(page_id) = meta.page_id {
                if meta.dirty {
                    let page = self.frames[frame_id].latch.get_mut();
                    if let Err(e) = self.file.flush(page_id, page) {
                        error!("failed to flush page {} at shutdown: {}", page_id, e);
                    } else {
                        meta.dirty = false;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;
    use crate::tuple::Tuple;
    use tempfile::tempdir;

    fn manager(capacity: usize) -> (tempfile::TempDir, BufferManager) {
        let dir = tempdir().unwrap();
        let file = FileManager::open(dir.path().join("test.db"), true).unwrap();
        (dir, BufferManager::new(file, capacity))
    }

    #[test]
    fn test_fix_loads_and_caches() {
        let (_dir, bm) = manager(4);
        {
            let guard = bm.fix_shared(0).unwrap();
            assert_eq!(guard.page_id(), 0);
            assert_eq!(guard.count(), 0);
        }
        // Second fix hits the cache and re-heats into LRU.
        drop(bm.fix_shared(0).unwrap());
        assert_eq!(bm.lru_pages(), vec![0]);
        assert_eq!(bm.fifo_pages(), Vec::<PageId>::new());
    }

    #[test]
    fn test_fix_past_eof_extends_file() {
        let (_dir, bm) = manager(4);
        assert_eq!(bm.num_pages(), 1);
        drop(bm.fix_exclusive(3).unwrap());
        assert_eq!(bm.num_pages(), 4);
    }

    #[test]
    fn test_shared_fix_is_reentrant() {
        let (_dir, bm) = manager(4);
        let a = bm.fix_shared(0).unwrap();
        let b = bm.fix_shared(0).unwrap();
        assert_eq!(a.page_id(), b.page_id());
    }

    #[test]
    fn test_dirty_page_survives_eviction() {
        let (_dir, bm) = manager(1);
        {
            let mut guard = bm.fix_exclusive(0).unwrap();
            guard.insert(&Tuple::from(vec![Field::Int(11)])).unwrap();
            guard.mark_dirty();
        }
        // Page 1 takes the only frame, evicting (and flushing) page 0.
        drop(bm.fix_shared(1).unwrap());
        let guard = bm.fix_shared(0).unwrap();
        assert_eq!(guard.count(), 1);
    }

    #[test]
    fn test_unmarked_write_is_dropped_on_eviction() {
        let (_dir, bm) = manager(1);
        {
            let mut guard = bm.fix_exclusive(0).unwrap();
            guard.insert(&Tuple::from(vec![Field::Int(11)])).unwrap();
            // No mark_dirty: the frame is reused without a write-back.
        }
        drop(bm.fix_shared(1).unwrap());
        let guard = bm.fix_shared(0).unwrap();
        assert_eq!(guard.count(), 0);
    }

    #[test]
    fn test_buffer_full_when_all_pinned() {
        let (_dir, bm) = manager(2);
        let _a = bm.fix_shared(0).unwrap();
        let _b = bm.fix_shared(1).unwrap();
        assert!(matches!(bm.fix_shared(2), Err(BufferError::BufferFull)));
    }

    #[test]
    fn test_flush_all_clears_dirty() {
        let (_dir, bm) = manager(2);
        {
            let mut guard = bm.fix_exclusive(0).unwrap();
            guard.insert(&Tuple::from(vec![Field::Int(5)])).unwrap();
            guard.mark_dirty();
        }
        bm.flush_all().unwrap();
        // After the flush the on-disk page matches the cached one.
        let from_disk = {
            let file = FileManager::open(bm.file.path(), false).unwrap();
            file.load(0).unwrap()
        };
        assert_eq!(from_disk.count(), 1);
    }

    #[test]
    fn test_lru_policy_variant() {
        let dir = tempdir().unwrap();
        let file = FileManager::open(dir.path().join("test.db"), true).unwrap();
        let bm = BufferManager::with_policy(file, 2, crate::buffer::LruPolicy::new());
        drop(bm.fix_shared(0).unwrap());
        drop(bm.fix_shared(1).unwrap());
        drop(bm.fix_shared(2).unwrap());
        // Page 0 was least recent and got evicted; 1 and 2 remain cached.
        drop(bm.fix_shared(1).unwrap());
        drop(bm.fix_shared(2).unwrap());
    }
}
