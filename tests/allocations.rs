#![allow(non_snake_case)]

//! Repeated solves on a set-up instance must not touch the allocator; all
//! working storage is sized once in `setup`.

use proxip::algebra::*;
use proxip::solver::*;
use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering};

struct CountingAllocator;

static ALLOCATIONS: AtomicUsize = AtomicUsize::new(0);

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        ALLOCATIONS.fetch_add(1, Ordering::SeqCst);
        System.alloc(layout)
    }
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        ALLOCATIONS.fetch_add(1, Ordering::SeqCst);
        System.realloc(ptr, layout, new_size)
    }
}

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator;

#[test]
fn test_solve_does_not_allocate() {
    // min ½xᵀPx + cᵀx  s.t.  x₁ + x₂ = 1,  x₁ - x₂ ≤ 0.5,  x ≥ 0
    let P = CscMatrix::new(2, 2, vec![0, 1, 3], vec![0, 0, 1], vec![2., 0.5, 1.]);
    let c = vec![-1., 1.];
    let A = CscMatrix::new(1, 2, vec![0, 1, 2], vec![0, 0], vec![1., 1.]);
    let b = vec![1.];
    let G = CscMatrix::new(1, 2, vec![0, 1, 2], vec![0, 0], vec![1., -1.]);
    let h = vec![0.5];

    let mut solver = SparseSolver::<f64>::default();
    solver
        .setup(
            &P,
            &c,
            &A,
            &b,
            &G,
            &h,
            Some(&[0., 0.]),
            None,
            None,
        )
        .unwrap();

    //first solve warms any lazily initialized state
    assert_eq!(solver.solve(), Status::Solved);

    let before = ALLOCATIONS.load(Ordering::SeqCst);
    for i in 0..10_000 {
        //vary tunables between solves; the buffers must still be reused
        solver.settings_mut().tau = if i % 2 == 0 { 0.99 } else { 0.95 };
        let status = solver.solve();
        assert_eq!(status, Status::Solved);
    }
    let after = ALLOCATIONS.load(Ordering::SeqCst);

    assert_eq!(after, before, "solve allocated on a set-up instance");
}
