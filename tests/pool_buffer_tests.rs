//! Buffer pool tests

use zjs_ashell::pool::BufferPool;

fn assert_conserved<const S: usize, const C: usize>(pool: &BufferPool<S, C>) {
    let s = pool.stats();
    assert_eq!(s.allocs - s.frees, s.live, "{:?}", s);
    assert_eq!(s.live, s.free_len + s.held, "{:?}", s);
}

#[test]
fn test_conservation_through_churn() {
    let pool = BufferPool::<4, 8>::new();
    let a = pool.acquire().unwrap();
    let b = pool.acquire().unwrap();
    let c = pool.acquire().unwrap();
    assert_conserved(&pool);
    assert_eq!(pool.live(), 3);

    pool.release(b);
    assert_conserved(&pool);
    pool.release(a);
    assert_conserved(&pool);
    // Last one stays warm
    pool.release(c);
    assert_conserved(&pool);
    assert_eq!(pool.live(), 1);
    assert_eq!(pool.stats().free_len, 1);

    assert_eq!(pool.drain_idle(), 1);
    assert_conserved(&pool);
    assert_eq!(pool.live(), 0);
}

#[test]
fn test_warm_buffer_is_reused() {
    let pool = BufferPool::<4, 8>::new();
    let a = pool.acquire().unwrap();
    let index = a.index();
    pool.release(a);

    let again = pool.acquire().unwrap();
    assert_eq!(again.index(), index);
    assert_eq!(pool.stats().allocs, 1);
    assert!(again.is_empty());
    pool.release(again);
}

#[test]
fn test_exhaustion_counts_failure() {
    let pool = BufferPool::<2, 8>::new();
    let a = pool.acquire().unwrap();
    let b = pool.acquire().unwrap();
    assert!(pool.acquire().is_none());
    assert_eq!(pool.stats().failures, 1);
    assert_eq!(pool.stats().max_live, 2);
    pool.release(a);
    pool.release(b);
    assert_conserved(&pool);
}
