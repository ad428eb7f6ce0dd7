//! Per-kind cell arenas with free-list recycling.
//!
//! Cells are carved from arenas that grow in fixed-size batches and are never
//! handed back one by one; an arena is only released when its pool is dropped.
//! A cell is on exactly one of two intrusive lists:
//! - the free list, chained through `next_free`
//! - the alive list, chained through `prev_alive`/`next_alive`, which lets the
//!   collector enumerate every allocated cell of a kind without a registry
//!
//! Links are indices, not pointers. Handles carry a generation so a handle to a
//! recycled cell reads as dead instead of aliasing the new occupant.

use std::alloc::{Layout, handle_alloc_error};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use ahash::RandomState;
use hashbrown::HashMap;

use crate::bits::BitSet;
use crate::kind::Kind;

/// Cells added to a pool each time its free list runs dry.
pub const DEFAULT_BATCH: usize = 1024;

const NIL: u32 = u32::MAX;

/// Cleanup callback run when the collector recycles a cell.
pub type FreeHook = Box<dyn FnOnce()>;

/// Generational handle to a pooled cell of payload type `T`.
pub struct CellRef<T> {
    index: u32,
    generation: u32,
    _kind: PhantomData<fn() -> T>,
}

impl<T> CellRef<T> {
    #[inline]
    pub fn index(self) -> usize {
        self.index as usize
    }

    #[inline]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl<T> Clone for CellRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for CellRef<T> {}

impl<T> PartialEq for CellRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for CellRef<T> {}

impl<T> Hash for CellRef<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for CellRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}g{}", self.index, self.generation)
    }
}

struct Cell<T> {
    payload: T,
    generation: u32,
    live: bool,
    /// Root count. Non-zero while the cell sits on an operand or frame stack.
    held: u32,
    next_free: u32,
    prev_alive: u32,
    next_alive: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub kind: Kind,
    pub live: usize,
    pub free: usize,
    pub capacity: usize,
    pub arenas: usize,
}

pub struct Pool<T> {
    kind: Kind,
    batch: usize,
    arenas: Vec<Vec<Cell<T>>>,
    free_head: u32,
    alive_head: u32,
    live: usize,
    free: usize,
    marks: BitSet,
    hooks: HashMap<u32, FreeHook, RandomState>,
}

impl<T> Pool<T> {
    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn live(&self) -> usize {
        self.live
    }

    pub fn free(&self) -> usize {
        self.free
    }

    pub fn capacity(&self) -> usize {
        self.arenas.len() * self.batch
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            kind: self.kind,
            live: self.live,
            free: self.free,
            capacity: self.capacity(),
            arenas: self.arenas.len(),
        }
    }

    #[inline]
    fn cell(&self, index: u32) -> &Cell<T> {
        let i = index as usize;
        &self.arenas[i / self.batch][i % self.batch]
    }

    #[inline]
    fn cell_mut(&mut self, index: u32) -> &mut Cell<T> {
        let i = index as usize;
        &mut self.arenas[i / self.batch][i % self.batch]
    }

    fn slot(&self, r: CellRef<T>) -> Option<&Cell<T>> {
        let i = r.index as usize;
        let cell = self.arenas.get(i / self.batch)?.get(i % self.batch)?;
        (cell.live && cell.generation == r.generation).then_some(cell)
    }

    fn slot_mut(&mut self, r: CellRef<T>) -> Option<&mut Cell<T>> {
        let i = r.index as usize;
        let batch = self.batch;
        let cell = self.arenas.get_mut(i / batch)?.get_mut(i % batch)?;
        (cell.live && cell.generation == r.generation).then_some(cell)
    }

    /// True while `r` names a live cell of this pool.
    #[inline]
    pub fn contains(&self, r: CellRef<T>) -> bool {
        self.slot(r).is_some()
    }

    #[inline]
    pub fn get(&self, r: CellRef<T>) -> Option<&T> {
        self.slot(r).map(|c| &c.payload)
    }

    #[inline]
    pub fn get_mut(&mut self, r: CellRef<T>) -> Option<&mut T> {
        self.slot_mut(r).map(|c| &mut c.payload)
    }

    /// Registers `r` as a GC root. Returns `false` for a dead handle.
    pub fn hold(&mut self, r: CellRef<T>) -> bool {
        match self.slot_mut(r) {
            Some(cell) => {
                cell.held = cell.held.saturating_add(1);
                true
            }
            None => false,
        }
    }

    /// Drops one root registration of `r`.
    pub fn unhold(&mut self, r: CellRef<T>) -> bool {
        match self.slot_mut(r) {
            Some(cell) => {
                cell.held = cell.held.saturating_sub(1);
                true
            }
            None => false,
        }
    }

    pub fn is_held(&self, r: CellRef<T>) -> bool {
        self.slot(r).is_some_and(|c| c.held > 0)
    }

    /// Attaches a cleanup callback that runs when the cell is recycled.
    /// A second hook on the same cell replaces the first.
    pub fn set_free_hook(&mut self, r: CellRef<T>, hook: FreeHook) -> bool {
        if !self.contains(r) {
            return false;
        }
        self.hooks.insert(r.index, hook);
        true
    }

    pub fn clear_marks(&mut self) {
        self.marks.clear();
    }

    /// Marks a live cell. Returns `true` only the first time in a cycle.
    pub fn mark(&mut self, r: CellRef<T>) -> bool {
        if !self.contains(r) {
            return false;
        }
        self.marks.insert(r.index as usize)
    }

    pub fn is_marked(&self, r: CellRef<T>) -> bool {
        self.contains(r) && self.marks.contains(r.index as usize)
    }

    /// Walks the alive list, newest cell first.
    pub fn iter_alive(&self) -> Alive<'_, T> {
        Alive {
            pool: self,
            cursor: self.alive_head,
        }
    }

    /// Every live cell with a non-zero root count.
    pub fn held_roots(&self) -> impl Iterator<Item = CellRef<T>> + '_ {
        self.iter_alive()
            .map(|(r, _)| r)
            .filter(|r| self.cell(r.index).held > 0)
    }
}

impl<T: Default> Pool<T> {
    pub fn new(kind: Kind) -> Self {
        Self::with_batch(kind, DEFAULT_BATCH)
    }

    pub fn with_batch(kind: Kind, batch: usize) -> Self {
        Self {
            kind,
            batch: batch.max(1),
            arenas: Vec::new(),
            free_head: NIL,
            alive_head: NIL,
            live: 0,
            free: 0,
            marks: BitSet::new(),
            hooks: HashMap::with_hasher(RandomState::with_seeds(0, 0, 0, 0)),
        }
    }

    /// Takes a cell off the free list, growing the arena when it is empty.
    pub fn alloc(&mut self, payload: T) -> CellRef<T> {
        if self.free_head == NIL {
            self.grow();
        }
        let index = self.free_head;
        let head = self.alive_head;
        let cell = self.cell_mut(index);
        let next_free = cell.next_free;
        cell.payload = payload;
        cell.live = true;
        cell.held = 0;
        cell.next_free = NIL;
        cell.prev_alive = NIL;
        cell.next_alive = head;
        let generation = cell.generation;

        self.free_head = next_free;
        if head != NIL {
            self.cell_mut(head).prev_alive = index;
        }
        self.alive_head = index;
        self.live += 1;
        self.free -= 1;
        CellRef {
            index,
            generation,
            _kind: PhantomData,
        }
    }

    fn grow(&mut self) {
        let base = self.capacity();
        let batch = self.batch;
        if base + batch >= NIL as usize {
            arena_exhausted::<T>(self.kind, batch);
        }
        let mut arena: Vec<Cell<T>> = Vec::new();
        if arena.try_reserve_exact(batch).is_err() {
            arena_exhausted::<T>(self.kind, batch);
        }
        let chain_tail = self.free_head;
        for offset in 0..batch {
            let index = (base + offset) as u32;
            arena.push(Cell {
                payload: T::default(),
                generation: 0,
                live: false,
                held: 0,
                next_free: if offset + 1 < batch { index + 1 } else { chain_tail },
                prev_alive: NIL,
                next_alive: NIL,
            });
        }
        self.arenas.push(arena);
        self.free_head = base as u32;
        self.free += batch;
        tracing::trace!(
            kind = %self.kind,
            arenas = self.arenas.len(),
            capacity = self.capacity(),
            "pool arena grown"
        );
    }

    /// Returns a live cell to the free list. Only `sweep` releases cells.
    pub(crate) fn release(&mut self, index: u32) {
        let (prev, next) = {
            let cell = self.cell(index);
            (cell.prev_alive, cell.next_alive)
        };
        if prev == NIL {
            self.alive_head = next;
        } else {
            self.cell_mut(prev).next_alive = next;
        }
        if next != NIL {
            self.cell_mut(next).prev_alive = prev;
        }

        let free_head = self.free_head;
        let payload = {
            let cell = self.cell_mut(index);
            cell.live = false;
            cell.held = 0;
            cell.generation = cell.generation.wrapping_add(1);
            cell.prev_alive = NIL;
            cell.next_alive = NIL;
            cell.next_free = free_head;
            std::mem::take(&mut cell.payload)
        };
        self.free_head = index;
        self.marks.remove(index as usize);
        self.live -= 1;
        self.free += 1;

        if let Some(hook) = self.hooks.remove(&index) {
            hook();
        }
        drop(payload);
    }

    /// Releases every live cell whose mark bit is clear. Returns the count.
    pub fn sweep(&mut self) -> usize {
        let mut freed = 0;
        let mut cursor = self.alive_head;
        while cursor != NIL {
            let next = self.cell(cursor).next_alive;
            if !self.marks.contains(cursor as usize) {
                self.release(cursor);
                freed += 1;
            }
            cursor = next;
        }
        freed
    }
}

impl<T> Drop for Pool<T> {
    fn drop(&mut self) {
        for (_, hook) in self.hooks.drain() {
            hook();
        }
    }
}

pub struct Alive<'a, T> {
    pool: &'a Pool<T>,
    cursor: u32,
}

impl<'a, T> Iterator for Alive<'a, T> {
    type Item = (CellRef<T>, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NIL {
            return None;
        }
        let index = self.cursor;
        let cell = self.pool.cell(index);
        self.cursor = cell.next_alive;
        let r = CellRef {
            index,
            generation: cell.generation,
            _kind: PhantomData,
        };
        Some((r, &cell.payload))
    }
}

#[cold]
fn arena_exhausted<T>(kind: Kind, batch: usize) -> ! {
    tracing::error!(kind = %kind, batch, "pool arena growth failed");
    let layout = Layout::array::<Cell<T>>(batch).unwrap_or_else(|_| Layout::new::<Cell<T>>());
    handle_alloc_error(layout)
}
