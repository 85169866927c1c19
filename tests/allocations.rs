use std::{
    alloc::{GlobalAlloc, Layout, System},
    cell::Cell,
    sync::atomic::{AtomicUsize, Ordering},
};

use pretty_assertions::assert_eq;
use weighted_rbtree::RankSet;

struct Counting;

static ALLOCATIONS: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static COUNTING: Cell<bool> = const { Cell::new(false) };
}

unsafe impl GlobalAlloc for Counting {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if COUNTING.with(Cell::get) {
            ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
        }
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static GLOBAL: Counting = Counting;

fn allocations<T>(f: impl FnOnce() -> T) -> (T, usize) {
    let before = ALLOCATIONS.load(Ordering::Relaxed);
    COUNTING.with(|c| c.set(true));
    let out = f();
    COUNTING.with(|c| c.set(false));
    (out, ALLOCATIONS.load(Ordering::Relaxed) - before)
}

#[test]
fn rank_queries_do_not_allocate() {
    let set: RankSet<u32> = (0..1024).collect();
    let mut out = [0];

    let (res, n) = allocations(|| set.sum_before_into(&1023, &mut out));
    assert_eq!((Ok(()), 0), (res, n));
    assert_eq!([1023], out);

    let (res, n) = allocations(|| set.rank(&512));
    assert_eq!((Ok(512), 0), (res, n));

    let (res, n) = allocations(|| set.nth(1000).copied());
    assert_eq!((Some(1000), 0), (res, n));

    let (res, n) = allocations(|| set.lower_bound(&700).sum_before_into(&mut out));
    assert_eq!((Ok(()), 0), (res, n));
    assert_eq!([700], out);

    let (res, n) = allocations(|| set.lower_bound(&300).rank());
    assert_eq!((Ok(300), 0), (res, n));
}
