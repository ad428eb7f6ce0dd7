//! The runtime heap: one pool per cell kind.

use std::fmt::Write;

use kiln_core::{CellRef, FreeHook, Kind, KindCounts, Pool, PoolStats};
use num_bigint::BigInt;
use num_traits::ToPrimitive;

use super::buffers::{BinBuf, StrBuf};
use super::env::{Closure, Frame};
use super::value::{BigIntCell, Value, ValueCell};
use crate::object::ObjectRecord;

/// A type-erased handle to any pooled cell, used for rooting and tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Root {
    Value(CellRef<ValueCell>),
    Str(CellRef<StrBuf>),
    Binary(CellRef<BinBuf>),
    BigInt(CellRef<BigIntCell>),
    Closure(CellRef<Closure>),
    Frame(CellRef<Frame>),
    Object(CellRef<ObjectRecord>),
}

impl Root {
    pub fn kind(self) -> Kind {
        match self {
            Root::Value(_) => Kind::Value,
            Root::Str(_) => Kind::StringBuf,
            Root::Binary(_) => Kind::BinBuf,
            Root::BigInt(_) => Kind::BigInt,
            Root::Closure(_) => Kind::Closure,
            Root::Frame(_) => Kind::Frame,
            Root::Object(_) => Kind::Object,
        }
    }
}

impl From<CellRef<Frame>> for Root {
    fn from(r: CellRef<Frame>) -> Self {
        Root::Frame(r)
    }
}

impl From<CellRef<ValueCell>> for Root {
    fn from(r: CellRef<ValueCell>) -> Self {
        Root::Value(r)
    }
}

impl From<CellRef<ObjectRecord>> for Root {
    fn from(r: CellRef<ObjectRecord>) -> Self {
        Root::Object(r)
    }
}

impl From<CellRef<Closure>> for Root {
    fn from(r: CellRef<Closure>) -> Self {
        Root::Closure(r)
    }
}

/// Applies the same pool method to whichever pool a `Root` belongs to.
macro_rules! with_pool {
    ($heap:expr, $root:expr, |$pool:ident, $r:ident| $body:expr) => {
        match $root {
            Root::Value($r) => {
                let $pool = &mut $heap.values;
                $body
            }
            Root::Str($r) => {
                let $pool = &mut $heap.strings;
                $body
            }
            Root::Binary($r) => {
                let $pool = &mut $heap.binaries;
                $body
            }
            Root::BigInt($r) => {
                let $pool = &mut $heap.bigints;
                $body
            }
            Root::Closure($r) => {
                let $pool = &mut $heap.closures;
                $body
            }
            Root::Frame($r) => {
                let $pool = &mut $heap.frames;
                $body
            }
            Root::Object($r) => {
                let $pool = &mut $heap.objects;
                $body
            }
        }
    };
}

pub struct Heap {
    pub(crate) values: Pool<ValueCell>,
    pub(crate) strings: Pool<StrBuf>,
    pub(crate) binaries: Pool<BinBuf>,
    pub(crate) bigints: Pool<BigIntCell>,
    pub(crate) closures: Pool<Closure>,
    pub(crate) frames: Pool<Frame>,
    pub(crate) objects: Pool<ObjectRecord>,
}

impl Heap {
    pub fn new(batch: usize) -> Self {
        Self {
            values: Pool::with_batch(Kind::Value, batch),
            strings: Pool::with_batch(Kind::StringBuf, batch),
            binaries: Pool::with_batch(Kind::BinBuf, batch),
            bigints: Pool::with_batch(Kind::BigInt, batch),
            closures: Pool::with_batch(Kind::Closure, batch),
            frames: Pool::with_batch(Kind::Frame, batch),
            objects: Pool::with_batch(Kind::Object, batch),
        }
    }

    pub fn alloc_str(&mut self, text: String) -> Value {
        Value::Str(self.strings.alloc(StrBuf::new(text)))
    }

    pub fn alloc_binary(&mut self, bytes: Vec<u8>) -> Value {
        Value::Binary(self.binaries.alloc(BinBuf::new(bytes)))
    }

    /// Demotes to `Int` whenever the value fits in 64 bits.
    pub fn alloc_bigint(&mut self, big: BigInt) -> Value {
        match big.to_i64() {
            Some(i) => Value::Int(i),
            None => Value::BigInt(self.bigints.alloc(BigIntCell(big))),
        }
    }

    pub fn alloc_object(&mut self, record: ObjectRecord) -> CellRef<ObjectRecord> {
        self.objects.alloc(record)
    }

    pub fn alloc_closure(&mut self, closure: Closure) -> CellRef<Closure> {
        self.closures.alloc(closure)
    }

    pub fn alloc_frame(&mut self, frame: Frame) -> CellRef<Frame> {
        self.frames.alloc(frame)
    }

    pub fn alloc_value_cell(&mut self, value: Value) -> CellRef<ValueCell> {
        self.values.alloc(ValueCell(value))
    }

    pub fn string(&self, r: CellRef<StrBuf>) -> Option<&str> {
        self.strings.get(r).map(StrBuf::as_str)
    }

    pub fn bytes(&self, r: CellRef<BinBuf>) -> Option<&[u8]> {
        self.binaries.get(r).map(BinBuf::as_bytes)
    }

    pub fn bigint(&self, r: CellRef<BigIntCell>) -> Option<&BigInt> {
        self.bigints.get(r).map(|c| &c.0)
    }

    pub fn object(&self, r: CellRef<ObjectRecord>) -> Option<&ObjectRecord> {
        self.objects.get(r)
    }

    pub fn object_mut(&mut self, r: CellRef<ObjectRecord>) -> Option<&mut ObjectRecord> {
        self.objects.get_mut(r)
    }

    pub fn closure(&self, r: CellRef<Closure>) -> Option<&Closure> {
        self.closures.get(r)
    }

    pub fn closure_mut(&mut self, r: CellRef<Closure>) -> Option<&mut Closure> {
        self.closures.get_mut(r)
    }

    pub fn frame(&self, r: CellRef<Frame>) -> Option<&Frame> {
        self.frames.get(r)
    }

    pub fn frame_mut(&mut self, r: CellRef<Frame>) -> Option<&mut Frame> {
        self.frames.get_mut(r)
    }

    pub fn value_cell(&self, r: CellRef<ValueCell>) -> Option<Value> {
        self.values.get(r).map(|c| c.0)
    }

    pub fn set_value_cell(&mut self, r: CellRef<ValueCell>, value: Value) -> bool {
        match self.values.get_mut(r) {
            Some(cell) => {
                cell.0 = value;
                true
            }
            None => false,
        }
    }

    /// Text of a `Str` value, `None` for any other tag or a dead handle.
    pub fn str_of(&self, value: Value) -> Option<&str> {
        match value {
            Value::Str(r) => self.string(r),
            _ => None,
        }
    }

    pub fn is_live(&self, root: Root) -> bool {
        match root {
            Root::Value(r) => self.values.contains(r),
            Root::Str(r) => self.strings.contains(r),
            Root::Binary(r) => self.binaries.contains(r),
            Root::BigInt(r) => self.bigints.contains(r),
            Root::Closure(r) => self.closures.contains(r),
            Root::Frame(r) => self.frames.contains(r),
            Root::Object(r) => self.objects.contains(r),
        }
    }

    /// True while a value's cell (if it has one) is allocated.
    pub fn value_is_live(&self, value: Value) -> bool {
        value.root().is_none_or(|root| self.is_live(root))
    }

    pub fn hold(&mut self, root: Root) -> bool {
        with_pool!(self, root, |pool, r| pool.hold(r))
    }

    pub fn unhold(&mut self, root: Root) -> bool {
        with_pool!(self, root, |pool, r| pool.unhold(r))
    }

    pub fn is_held(&self, root: Root) -> bool {
        match root {
            Root::Value(r) => self.values.is_held(r),
            Root::Str(r) => self.strings.is_held(r),
            Root::Binary(r) => self.binaries.is_held(r),
            Root::BigInt(r) => self.bigints.is_held(r),
            Root::Closure(r) => self.closures.is_held(r),
            Root::Frame(r) => self.frames.is_held(r),
            Root::Object(r) => self.objects.is_held(r),
        }
    }

    /// Registers cleanup for a cell, e.g. closing a native resource owned by
    /// an object. Runs once, when the collector recycles the cell.
    pub fn set_free_hook(&mut self, root: Root, hook: FreeHook) -> bool {
        with_pool!(self, root, |pool, r| pool.set_free_hook(r, hook))
    }

    pub(crate) fn clear_marks(&mut self) {
        self.values.clear_marks();
        self.strings.clear_marks();
        self.binaries.clear_marks();
        self.bigints.clear_marks();
        self.closures.clear_marks();
        self.frames.clear_marks();
        self.objects.clear_marks();
    }

    pub(crate) fn mark(&mut self, root: Root) -> bool {
        with_pool!(self, root, |pool, r| pool.mark(r))
    }

    pub fn is_marked(&self, root: Root) -> bool {
        match root {
            Root::Value(r) => self.values.is_marked(r),
            Root::Str(r) => self.strings.is_marked(r),
            Root::Binary(r) => self.binaries.is_marked(r),
            Root::BigInt(r) => self.bigints.is_marked(r),
            Root::Closure(r) => self.closures.is_marked(r),
            Root::Frame(r) => self.frames.is_marked(r),
            Root::Object(r) => self.objects.is_marked(r),
        }
    }

    /// Appends every cell with a non-zero root count.
    pub(crate) fn held_roots(&self, out: &mut Vec<Root>) {
        out.extend(self.values.held_roots().map(Root::Value));
        out.extend(self.strings.held_roots().map(Root::Str));
        out.extend(self.binaries.held_roots().map(Root::Binary));
        out.extend(self.bigints.held_roots().map(Root::BigInt));
        out.extend(self.closures.held_roots().map(Root::Closure));
        out.extend(self.frames.held_roots().map(Root::Frame));
        out.extend(self.objects.held_roots().map(Root::Object));
    }

    /// Appends the cells directly reachable from `root`.
    pub(crate) fn trace_children(&self, root: Root, out: &mut Vec<Root>) {
        let mut push = |v: Value| {
            if let Some(child) = v.root() {
                out.push(child);
            }
        };
        match root {
            Root::Str(_) | Root::Binary(_) | Root::BigInt(_) => {}
            Root::Value(r) => {
                if let Some(cell) = self.values.get(r) {
                    push(cell.0);
                }
            }
            Root::Object(r) => {
                if let Some(record) = self.objects.get(r) {
                    record.values().for_each(push);
                }
            }
            Root::Frame(r) => {
                if let Some(frame) = self.frames.get(r) {
                    frame.slots.iter().copied().for_each(push);
                    if let Some(parent) = frame.parent {
                        out.push(Root::Frame(parent));
                    }
                }
            }
            Root::Closure(r) => {
                if let Some(closure) = self.closures.get(r) {
                    out.extend(closure.frame.map(Root::Frame));
                    out.extend(closure.suspension.snapshot.map(Root::Frame));
                }
            }
        }
    }

    /// Releases every unmarked cell, returning per-kind counts.
    pub(crate) fn sweep(&mut self) -> KindCounts {
        let mut freed = KindCounts::default();
        freed[Kind::Value] = self.values.sweep();
        freed[Kind::StringBuf] = self.strings.sweep();
        freed[Kind::BinBuf] = self.binaries.sweep();
        freed[Kind::BigInt] = self.bigints.sweep();
        freed[Kind::Closure] = self.closures.sweep();
        freed[Kind::Frame] = self.frames.sweep();
        freed[Kind::Object] = self.objects.sweep();
        freed
    }

    pub fn live_counts(&self) -> KindCounts {
        KindCounts(self.pool_stats().map(|s| s.live))
    }

    pub fn pool_stats(&self) -> [PoolStats; Kind::COUNT] {
        [
            self.values.stats(),
            self.strings.stats(),
            self.binaries.stats(),
            self.bigints.stats(),
            self.closures.stats(),
            self.frames.stats(),
            self.objects.stats(),
        ]
    }

    /// Human-readable summary of every pool, one line per kind.
    pub fn memory_stats(&self) -> String {
        let mut out = String::new();
        let mut live = 0;
        let mut capacity = 0;
        for stats in self.pool_stats() {
            live += stats.live;
            capacity += stats.capacity;
            let _ = writeln!(
                out,
                "{:<8} live={:<8} free={:<8} arenas={}",
                stats.kind.name(),
                stats.live,
                stats.free,
                stats.arenas
            );
        }
        let _ = write!(out, "total    live={live:<8} capacity={capacity}");
        out
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new(kiln_core::DEFAULT_BATCH)
    }
}
