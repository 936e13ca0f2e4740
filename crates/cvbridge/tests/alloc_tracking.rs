//! Allocation accounting across handle lifecycles
//!
//! A counting global allocator records allocations made on the measuring
//! thread only, so tests running in parallel do not see each other.

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use std::ffi::CString;
use std::slice;

use cvbridge::ffi::bytes::{cvb_free_bytes, cvb_imencode};
use cvbridge::ffi::contours::{cvb_find_contours, cvb_free_contours};
use cvbridge::ffi::mat::*;
use cvbridge::ffi::ops::{cvb_circle, cvb_gaussian_blur, cvb_rectangle, cvb_to_gray};
use cvbridge::Mat;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Stats {
    allocs: usize,
    deallocs: usize,
    live_bytes: isize,
}

thread_local! {
    static TRACKING: Cell<bool> = const { Cell::new(false) };
    static STATS: Cell<Stats> = const {
        Cell::new(Stats { allocs: 0, deallocs: 0, live_bytes: 0 })
    };
}

fn record(f: impl FnOnce(&mut Stats)) {
    if TRACKING.try_with(Cell::get).unwrap_or(false) {
        let _ = STATS.try_with(|s| {
            let mut stats = s.get();
            f(&mut stats);
            s.set(stats);
        });
    }
}

struct Counting;

unsafe impl GlobalAlloc for Counting {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            record(|s| {
                s.allocs += 1;
                s.live_bytes += layout.size() as isize;
            });
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        record(|s| {
            s.deallocs += 1;
            s.live_bytes -= layout.size() as isize;
        });
        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static GLOBAL: Counting = Counting;

/// Run `f` with accounting enabled on this thread.
fn measure<T>(f: impl FnOnce() -> T) -> (T, Stats) {
    STATS.with(|s| s.set(Stats::default()));
    TRACKING.with(|t| t.set(true));
    let out = f();
    TRACKING.with(|t| t.set(false));
    (out, STATS.with(Cell::get))
}

/// Touch lazily initialized process state outside any measurement.
fn warm_up() {
    let m = cvb_mat_zeros(4, 4, 3);
    let g = cvb_to_gray(m);
    cvb_mat_release(g);
    cvb_mat_release(m);
}

fn blobs(count: i32) -> *mut Mat {
    let img = cvb_mat_zeros(20 * count + 10, 30, 1);
    for i in 0..count {
        cvb_rectangle(img, 5 + 20 * i, 5, 10, 12, 255, 255, 255, -1);
    }
    img
}

#[test]
fn test_create_release_leaks_nothing() {
    warm_up();
    let ((), stats) = measure(|| {
        let empty = cvb_mat_create();
        let zeros = cvb_mat_zeros(64, 48, 3);
        cvb_mat_release(zeros);
        cvb_mat_release(empty);
    });
    assert!(stats.allocs >= 2);
    assert_eq!(stats.allocs, stats.deallocs);
    assert_eq!(stats.live_bytes, 0);
}

#[test]
fn test_transform_chain_leaks_nothing() {
    warm_up();
    let ((), stats) = measure(|| {
        let src = cvb_mat_zeros(32, 32, 3);
        cvb_circle(src, 16, 16, 8, 255, 0, 0, -1);
        let blurred = cvb_gaussian_blur(src, 5, 0.0);
        let gray = cvb_to_gray(blurred);
        for m in [gray, blurred, src] {
            cvb_mat_release(m);
        }
    });
    assert_eq!(stats.allocs, stats.deallocs);
    assert_eq!(stats.live_bytes, 0);
}

#[test]
fn test_free_contours_deallocates_n_plus_two() {
    warm_up();
    let img = blobs(3);
    let set = cvb_find_contours(img, 0, 2);
    assert!(set.success);
    assert_eq!(set.count, 3);
    let sizes = unsafe { slice::from_raw_parts(set.sizes, set.count) }.to_vec();
    let expected_bytes = sizes.iter().map(|n| n * 2 * 4).sum::<usize>()
        + set.count * std::mem::size_of::<*mut i32>()
        + set.count * std::mem::size_of::<usize>();

    let count = set.count;
    let ((), stats) = measure(|| cvb_free_contours(set));
    assert_eq!(stats.allocs, 0);
    assert_eq!(stats.deallocs, count + 2);
    assert_eq!(stats.live_bytes, -(expected_bytes as isize));
    cvb_mat_release(img);
}

#[test]
fn test_find_and_free_contours_balance() {
    warm_up();
    let img = blobs(2);
    let ((), stats) = measure(|| {
        let set = cvb_find_contours(img, 1, 1);
        assert_eq!(set.count, 2);
        cvb_free_contours(set);
    });
    assert_eq!(stats.allocs, stats.deallocs);
    assert_eq!(stats.live_bytes, 0);
    cvb_mat_release(img);
}

#[test]
fn test_empty_contour_set_frees_nothing() {
    warm_up();
    let img = cvb_mat_zeros(8, 8, 1);
    let set = cvb_find_contours(img, 0, 2);
    assert_eq!(set.count, 0);
    let ((), stats) = measure(|| cvb_free_contours(set));
    assert_eq!(stats, Stats::default());
    cvb_mat_release(img);
}

#[test]
fn test_encoded_bytes_freed_once() {
    warm_up();
    let img = cvb_mat_zeros(16, 16, 3);
    let png = CString::new(".png").unwrap();
    let result = cvb_imencode(png.as_ptr(), img);
    assert!(!result.data.is_null());
    let len = result.len;

    let ((), stats) = measure(|| cvb_free_bytes(result));
    assert_eq!(stats.deallocs, 1);
    assert_eq!(stats.live_bytes, -(len as isize));
    cvb_mat_release(img);
}
