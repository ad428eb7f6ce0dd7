use std::cell::Cell;
use std::rc::Rc;

use kiln_core::{BitSet, CellRef, Kind, Pool};
use proptest::prelude::*;

/// Frees one cell the way the collector does: mark everything else, sweep.
fn release<T: Default>(pool: &mut Pool<T>, r: CellRef<T>) -> bool {
    let keep: Vec<_> = pool.iter_alive().map(|(c, _)| c).filter(|&c| c != r).collect();
    pool.clear_marks();
    for c in keep {
        pool.mark(c);
    }
    pool.sweep() == 1
}

#[test]
fn alloc_grows_in_batches_and_recycles() {
    let mut pool: Pool<String> = Pool::with_batch(Kind::StringBuf, 4);
    let refs: Vec<_> = (0..5).map(|i| pool.alloc(format!("s{i}"))).collect();
    assert_eq!(pool.stats().arenas, 2);
    assert_eq!(pool.capacity(), 8);
    assert_eq!(pool.live(), 5);
    assert_eq!(pool.free(), 3);

    assert!(release(&mut pool, refs[0]));
    assert_eq!(pool.live(), 4);
    assert!(pool.get(refs[0]).is_none(), "released handle must read as dead");

    let again = pool.alloc("fresh".to_string());
    assert_eq!(again.index(), refs[0].index(), "free list is LIFO");
    assert_ne!(again.generation(), refs[0].generation());
    assert_eq!(pool.get(again).map(String::as_str), Some("fresh"));
    assert_eq!(pool.stats().arenas, 2, "recycling never grows the arena");
}

#[test]
fn released_payload_is_reset() {
    let mut pool: Pool<Vec<u8>> = Pool::with_batch(Kind::BinBuf, 2);
    let r = pool.alloc(vec![1, 2, 3]);
    release(&mut pool, r);
    let r2 = pool.alloc(Vec::new());
    assert_eq!(r2.index(), r.index());
    assert!(pool.get(r2).is_some_and(|b| b.is_empty()));
}

#[test]
fn alive_list_enumerates_every_live_cell() {
    let mut pool: Pool<i64> = Pool::with_batch(Kind::Value, 3);
    let a = pool.alloc(1);
    let b = pool.alloc(2);
    let c = pool.alloc(3);
    release(&mut pool, b);
    let seen: Vec<i64> = pool.iter_alive().map(|(_, v)| *v).collect();
    assert_eq!(seen, vec![3, 1]);
    let handles: Vec<_> = pool.iter_alive().map(|(r, _)| r).collect();
    assert_eq!(handles, vec![c, a]);
}

#[test]
fn hold_is_counted() {
    let mut pool: Pool<i64> = Pool::new(Kind::Value);
    let r = pool.alloc(7);
    assert!(!pool.is_held(r));
    pool.hold(r);
    pool.hold(r);
    pool.unhold(r);
    assert!(pool.is_held(r), "one registration is still outstanding");
    pool.unhold(r);
    assert!(!pool.is_held(r));
    assert_eq!(pool.held_roots().count(), 0);
}

#[test]
fn sweep_keeps_marked_cells_only() {
    let mut pool: Pool<i64> = Pool::with_batch(Kind::Frame, 8);
    let keep = pool.alloc(1);
    let drop_me = pool.alloc(2);
    let also_keep = pool.alloc(3);
    pool.clear_marks();
    assert!(pool.mark(keep));
    assert!(!pool.mark(keep), "second mark in a cycle reports already marked");
    pool.mark(also_keep);
    assert_eq!(pool.sweep(), 1);
    assert!(pool.contains(keep));
    assert!(pool.contains(also_keep));
    assert!(!pool.contains(drop_me));
    assert!(!pool.is_marked(drop_me));
}

#[test]
fn free_hook_runs_on_release_once() {
    let fired = Rc::new(Cell::new(0));
    let mut pool: Pool<i64> = Pool::new(Kind::Object);
    let r = pool.alloc(1);
    let counter = fired.clone();
    assert!(pool.set_free_hook(r, Box::new(move || counter.set(counter.get() + 1))));
    pool.clear_marks();
    pool.sweep();
    assert_eq!(fired.get(), 1);
    let r2 = pool.alloc(2);
    release(&mut pool, r2);
    assert_eq!(fired.get(), 1, "hooks do not follow a recycled index");
}

#[test]
fn releasing_a_dead_handle_frees_nothing() {
    let mut pool: Pool<i64> = Pool::new(Kind::Value);
    let live = pool.alloc(1);
    let dead = pool.alloc(2);
    assert!(release(&mut pool, dead));
    assert!(!release(&mut pool, dead));
    assert!(pool.contains(live));
    assert_eq!(pool.live(), 1);
}

#[test]
fn pending_hooks_run_when_pool_drops() {
    let fired = Rc::new(Cell::new(false));
    {
        let mut pool: Pool<i64> = Pool::new(Kind::Object);
        let r = pool.alloc(1);
        let flag = fired.clone();
        pool.set_free_hook(r, Box::new(move || flag.set(true)));
    }
    assert!(fired.get());
}

#[test]
fn bitset_insert_reports_first_set() {
    let mut bits = BitSet::new();
    assert!(bits.insert(130));
    assert!(!bits.insert(130));
    assert!(bits.contains(130));
    assert!(!bits.contains(129));
    bits.remove(130);
    assert!(!bits.contains(130));
    bits.insert(1);
    bits.insert(64);
    assert_eq!(bits.count(), 2);
    bits.clear();
    assert_eq!(bits.count(), 0);
}

proptest! {
    #[test]
    fn live_plus_free_equals_capacity(ops in proptest::collection::vec(any::<bool>(), 0..200)) {
        let mut pool: Pool<u32> = Pool::with_batch(Kind::BigInt, 16);
        let mut live = Vec::new();
        for (i, alloc) in ops.into_iter().enumerate() {
            if alloc || live.is_empty() {
                live.push(pool.alloc(i as u32));
            } else {
                let r = live.swap_remove(i % live.len());
                prop_assert!(release(&mut pool, r));
            }
            prop_assert_eq!(pool.live(), live.len());
            prop_assert_eq!(pool.live() + pool.free(), pool.capacity());
        }
        prop_assert_eq!(pool.iter_alive().count(), live.len());
    }
}
