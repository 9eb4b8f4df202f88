//! Buffer manager scenarios: eviction order, concurrency, persistence.

use std::sync::Arc;
use std::thread;

use quartz::buffer::{BufferError, BufferManager};
use quartz::storage::{FileManager, PageId, SlottedPage};
use tempfile::tempdir;

fn manager(dir: &tempfile::TempDir, capacity: usize, truncate: bool) -> BufferManager {
    let file = FileManager::open(dir.path().join("test.db"), truncate).unwrap();
    BufferManager::new(file, capacity)
}

/// Fix/unfix pages 1..=10 shared in a capacity-10 pool, then fix page 11:
/// page 1 (the FIFO head) is evicted and 11 joins the FIFO tail.
#[test]
fn test_fifo_eviction_under_unfixed_load() {
    let dir = tempdir().unwrap();
    let bm = manager(&dir, 10, true);

    for page in 1..=10u16 {
        drop(bm.fix_shared(page).unwrap());
    }
    drop(bm.fix_shared(11).unwrap());

    assert_eq!(bm.fifo_pages(), vec![2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);
    assert_eq!(bm.lru_pages(), Vec::<PageId>::new());
}

/// Sweeping more once-fixed pages than the pool holds leaves exactly the
/// last `capacity` pages resident, all of them in FIFO.
#[test]
fn test_single_visit_sweep_keeps_last_capacity_pages() {
    let dir = tempdir().unwrap();
    let bm = manager(&dir, 10, true);

    for page in 0..20u16 {
        drop(bm.fix_shared(page).unwrap());
    }

    assert_eq!(bm.fifo_pages(), (10..20).collect::<Vec<PageId>>());
    assert_eq!(bm.lru_pages(), Vec::<PageId>::new());
}

/// Four threads each increment a u64 counter at the start of page 0 a
/// thousand times under exclusive fixes. No increment is lost.
#[test]
fn test_concurrent_exclusive_counter() {
    let dir = tempdir().unwrap();
    let bm = Arc::new(manager(&dir, 10, true));

    // Zero the counter.
    {
        let mut guard = bm.fix_exclusive(0).unwrap();
        guard.bytes_mut()[..8].copy_from_slice(&0u64.to_le_bytes());
        guard.mark_dirty();
    }

    thread::scope(|scope| {
        for _ in 0..4 {
            let bm = Arc::clone(&bm);
            scope.spawn(move || {
                for _ in 0..1000 {
                    let mut guard = bm.fix_exclusive(0).unwrap();
                    let bytes = guard.bytes_mut();
                    let value = u64::from_le_bytes(bytes[..8].try_into().unwrap());
                    bytes[..8].copy_from_slice(&(value + 1).to_le_bytes());
                    guard.mark_dirty();
                }
            });
        }
    });

    let guard = bm.fix_shared(0).unwrap();
    let value = u64::from_le_bytes(guard.bytes()[..8].try_into().unwrap());
    assert_eq!(value, 4000);
}

/// Concurrent shared fixes of one page proceed together; the counter shows
/// every reader observed the same bytes.
#[test]
fn test_concurrent_shared_readers() {
    let dir = tempdir().unwrap();
    let bm = Arc::new(manager(&dir, 4, true));
    {
        let mut guard = bm.fix_exclusive(0).unwrap();
        guard.bytes_mut()[..8].copy_from_slice(&77u64.to_le_bytes());
        guard.mark_dirty();
    }

    thread::scope(|scope| {
        for _ in 0..8 {
            let bm = Arc::clone(&bm);
            scope.spawn(move || {
                for _ in 0..200 {
                    let guard = bm.fix_shared(0).unwrap();
                    let value = u64::from_le_bytes(guard.bytes()[..8].try_into().unwrap());
                    assert_eq!(value, 77);
                }
            });
        }
    });
}

/// Dirty pages written across restarts read back intact: 3 segments of 10
/// pages carry their own id as the first u64.
#[test]
fn test_persistence_across_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("test.db");

    let page_ids: Vec<u64> = (0..3)
        .flat_map(|segment| (0..10).map(move |offset| segment * 200 + offset))
        .collect();

    {
        let fm = FileManager::open(&path, true).unwrap();
        for &id in &page_ids {
            let mut page = SlottedPage::new();
            page.bytes_mut()[..8].copy_from_slice(&id.to_le_bytes());
            fm.extend_to(id as PageId).unwrap();
            fm.flush(id as PageId, &page).unwrap();
        }
    }

    let fm = FileManager::open(&path, false).unwrap();
    assert_eq!(fm.num_pages(), 410);
    for &id in &page_ids {
        let page = fm.load(id as PageId).unwrap();
        let value = u64::from_le_bytes(page.bytes()[..8].try_into().unwrap());
        assert_eq!(value, id, "page {} changed across restart", id);
    }
}

/// The buffer manager's destructor flushes dirty frames, so modifications
/// survive without an explicit flush call.
#[test]
fn test_shutdown_flushes_dirty_frames() {
    let dir = tempdir().unwrap();
    {
        let bm = manager(&dir, 4, true);
        let mut guard = bm.fix_exclusive(2).unwrap();
        guard.bytes_mut()[100] = 0xAB;
        guard.mark_dirty();
        drop(guard);
        // bm dropped here, flushing frame 2.
    }

    let bm = manager(&dir, 4, false);
    let guard = bm.fix_shared(2).unwrap();
    assert_eq!(guard.bytes()[100], 0xAB);
}

/// With every frame pinned, a fix of a new page fails with BufferFull
/// rather than evicting a pinned page.
#[test]
fn test_buffer_full_with_all_pages_pinned() {
    let dir = tempdir().unwrap();
    let bm = manager(&dir, 3, true);

    let _a = bm.fix_shared(0).unwrap();
    let _b = bm.fix_exclusive(1).unwrap();
    let _c = bm.fix_shared(2).unwrap();

    assert!(matches!(bm.fix_shared(3), Err(BufferError::BufferFull)));
    assert!(matches!(bm.fix_exclusive(4), Err(BufferError::BufferFull)));
}

/// Writers and readers interleave on a capacity-2 pool across 8 pages,
/// forcing constant eviction with write-backs; every page ends with the
/// value its last writer stored.
#[test]
fn test_eviction_churn_preserves_writes() {
    let dir = tempdir().unwrap();
    let bm = manager(&dir, 2, true);

    for round in 0u64..4 {
        for page in 0..8u16 {
            let mut guard = bm.fix_exclusive(page).unwrap();
            guard.bytes_mut()[..8].copy_from_slice(&(round * 100 + page as u64).to_le_bytes());
            guard.mark_dirty();
        }
    }

    for page in 0..8u16 {
        let guard = bm.fix_shared(page).unwrap();
        let value = u64::from_le_bytes(guard.bytes()[..8].try_into().unwrap());
        assert_eq!(value, 300 + page as u64);
        drop(guard);
    }
}

/// A page modified in the pool but never flushed is still served from the
/// pool with its modifications (reads go through the cache, not the file).
#[test]
fn test_reads_see_cached_writes() {
    let dir = tempdir().unwrap();
    let bm = manager(&dir, 4, true);

    {
        let mut guard = bm.fix_exclusive(1).unwrap();
        guard.bytes_mut()[50] = 9;
        guard.mark_dirty();
    }
    let guard = bm.fix_shared(1).unwrap();
    assert_eq!(guard.bytes()[50], 9);
}
