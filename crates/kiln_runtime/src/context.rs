//! The runtime context threaded through every entry point.

use kiln_core::{CellRef, FreeHook};
use num_bigint::BigInt;
use smallvec::SmallVec;

use crate::config::RuntimeConfig;
use crate::core::{Closure, Frame, Heap, NativeFn, Root, Value, ValueCell};
use crate::errors::{RuntimeError, messages};
use crate::format::{self, FormatError};
use crate::gc::{Collector, GcPhase, GcReport};
use crate::object::ObjectRecord;
use crate::signal::{ExcKind, Outcome, Signal};
use crate::stack::{FrameStack, ValueStack};

/// Owns the heap, the root stacks and the collector.
///
/// There is no global runtime state: every operation takes `&mut Context`.
pub struct Context {
    pub heap: Heap,
    config: RuntimeConfig,
    stack: ValueStack,
    frames: FrameStack,
    gc: Collector,
    pub(crate) depth: usize,
    /// Closures currently executing, innermost last.
    pub(crate) running: Vec<CellRef<Closure>>,
    /// Set by `suspend`, consumed by `resume`. Held while pending.
    pub(crate) pending_yield: Option<Value>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl Context {
    pub fn new(config: RuntimeConfig) -> Self {
        tracing::debug!(
            gc_interval = config.gc_interval,
            arena_batch = config.arena_batch,
            max_call_depth = config.max_call_depth,
            "runtime context created"
        );
        Self {
            heap: Heap::new(config.arena_batch),
            config,
            stack: ValueStack::new(),
            frames: FrameStack::default(),
            gc: Collector::new(config.gc_interval),
            depth: 0,
            running: Vec::new(),
            pending_yield: None,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Current call depth.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn stack(&self) -> &ValueStack {
        &self.stack
    }

    pub fn frames(&self) -> &FrameStack {
        &self.frames
    }

    // ---- rooting ----

    pub fn hold(&mut self, value: Value) {
        if let Some(root) = value.root() {
            self.heap.hold(root);
        }
    }

    pub fn unhold(&mut self, value: Value) {
        if let Some(root) = value.root() {
            self.heap.unhold(root);
        }
    }

    /// Pushes and roots a value.
    pub fn push_var(&mut self, value: Value) -> Outcome<()> {
        if self.stack.len() >= self.config.max_value_stack {
            return Err(self.throw(ExcKind::StackOverflow, messages::VALUE_STACK_OVERFLOW));
        }
        self.hold(value);
        self.stack.push(value);
        Ok(())
    }

    pub fn pop_var(&mut self) -> Option<Value> {
        let value = self.stack.pop()?;
        self.unhold(value);
        Some(value)
    }

    pub fn stack_pointer(&self) -> usize {
        self.stack.len()
    }

    /// Pops back down to `sp`. Restoring upward is a host bug.
    pub fn restore_stack_pointer(&mut self, sp: usize) -> Result<(), RuntimeError> {
        let top = self.stack.len();
        if sp > top {
            return Err(RuntimeError::StackPointerAbove { requested: sp, top });
        }
        while self.stack.len() > sp {
            self.pop_var();
        }
        Ok(())
    }

    pub fn push_frame(&mut self, frame: CellRef<Frame>) {
        self.heap.hold(Root::Frame(frame));
        self.frames.push(frame);
    }

    pub fn pop_frame(&mut self) -> Option<CellRef<Frame>> {
        let frame = self.frames.pop()?;
        self.heap.unhold(Root::Frame(frame));
        Some(frame)
    }

    pub fn current_frame(&self) -> Option<CellRef<Frame>> {
        self.frames.current()
    }

    /// Unwinds both stacks to marks taken earlier, tolerating callees that
    /// already popped below them.
    pub(crate) fn unwind_to(&mut self, sp: usize, frames: usize) {
        if self.stack.len() < sp {
            tracing::warn!(sp, top = self.stack.len(), "value stack popped below call base");
        }
        while self.stack.len() > sp {
            self.pop_var();
        }
        while self.frames.len() > frames {
            self.pop_frame();
        }
    }

    /// The `argc` arguments of the running native call, first argument first.
    pub fn args(&self, argc: usize) -> SmallVec<[Value; 8]> {
        self.stack.top(argc)
    }

    /// Argument `i` of `argc`; `Undefined` when absent.
    pub fn arg(&self, argc: usize, i: usize) -> Value {
        if i >= argc {
            return Value::Undefined;
        }
        self.stack.peek(argc - 1 - i).unwrap_or_default()
    }

    // ---- lexical variables ----

    /// Reads `slot` from the frame `depth` parents above `frame`.
    pub fn load_var(&self, frame: CellRef<Frame>, depth: usize, slot: usize) -> Option<Value> {
        let target = self.ancestor(frame, depth)?;
        self.heap.frame(target)?.get(slot)
    }

    pub fn store_var(&mut self, frame: CellRef<Frame>, depth: usize, slot: usize, value: Value) -> bool {
        let Some(target) = self.ancestor(frame, depth) else {
            return false;
        };
        match self.heap.frame_mut(target) {
            Some(f) => {
                f.set(slot, value);
                true
            }
            None => false,
        }
    }

    fn ancestor(&self, mut frame: CellRef<Frame>, depth: usize) -> Option<CellRef<Frame>> {
        for _ in 0..depth {
            frame = self.heap.frame(frame)?.parent?;
        }
        Some(frame)
    }

    // ---- collection ----

    /// A safe point. Collects when the countdown reaches zero.
    pub fn tick(&mut self) -> Option<GcReport> {
        if self.gc.tick() { Some(self.collect()) } else { None }
    }

    pub fn collect(&mut self) -> GcReport {
        self.gc.collect(&mut self.heap)
    }

    pub fn gc_phase(&self) -> GcPhase {
        self.gc.phase()
    }

    pub fn gc_cycles(&self) -> u64 {
        self.gc.cycles()
    }

    // ---- construction ----

    pub fn string(&mut self, text: &str) -> Value {
        self.heap.alloc_str(text.to_string())
    }

    pub fn string_from(&mut self, text: String) -> Value {
        self.heap.alloc_str(text)
    }

    pub fn binary(&mut self, bytes: Vec<u8>) -> Value {
        self.heap.alloc_binary(bytes)
    }

    pub fn bigint(&mut self, big: BigInt) -> Value {
        self.heap.alloc_bigint(big)
    }

    pub fn object(&mut self) -> Value {
        Value::Object(self.heap.alloc_object(ObjectRecord::new()))
    }

    pub fn array(&mut self, items: &[Value]) -> Value {
        let record = ObjectRecord::from_values(items.iter().copied());
        Value::Object(self.heap.alloc_object(record))
    }

    pub fn closure(&mut self, name: &str, func: NativeFn, frame: Option<CellRef<Frame>>) -> Value {
        Value::Closure(self.heap.alloc_closure(Closure::new(name, func, frame)))
    }

    pub fn frame(&mut self, slots: usize, parent: Option<CellRef<Frame>>) -> CellRef<Frame> {
        self.heap.alloc_frame(Frame::with_slots(slots, parent))
    }

    pub fn value_cell(&mut self, value: Value) -> CellRef<ValueCell> {
        self.heap.alloc_value_cell(value)
    }

    /// Duplicates exclusively-owned payloads (strings, binaries, big
    /// integers); records and closures are shared.
    pub fn copy(&mut self, value: Value) -> Outcome {
        Ok(match value {
            Value::Str(r) => {
                let text = match self.heap.string(r) {
                    Some(s) => s.to_string(),
                    None => return Err(self.stale("string")),
                };
                self.heap.alloc_str(text)
            }
            Value::Binary(r) => {
                let bytes = match self.heap.bytes(r) {
                    Some(b) => b.to_vec(),
                    None => return Err(self.stale("binary")),
                };
                self.heap.alloc_binary(bytes)
            }
            Value::BigInt(r) => {
                let big = match self.heap.bigint(r) {
                    Some(b) => b.clone(),
                    None => return Err(self.stale("bigint")),
                };
                self.heap.alloc_bigint(big)
            }
            other => other,
        })
    }

    /// Display form of a value; formatter records render here.
    pub fn display(&mut self, value: Value) -> Outcome<String> {
        format::display(&self.heap, value).map_err(|e| self.format_error(e))
    }

    pub(crate) fn format_error(&mut self, err: FormatError) -> Signal {
        let kind = match err {
            FormatError::TooFewArguments { .. } => ExcKind::TooFewArguments,
            FormatError::UnknownConversion(_) | FormatError::Truncated => {
                ExcKind::UnsupportedOperation
            }
            FormatError::BadArgument { .. } | FormatError::Stale(_) => ExcKind::TypeMismatch,
            FormatError::FieldTooWide { .. } => ExcKind::OutOfRange,
        };
        self.throw(kind, err.to_string())
    }

    pub(crate) fn stale(&mut self, kind: &'static str) -> Signal {
        tracing::warn!(kind, depth = self.depth, "access through a collected handle");
        self.throw(ExcKind::TypeMismatch, format!("{}: {kind}", messages::STALE_HANDLE))
    }

    // ---- object records ----

    pub(crate) fn record_ref(&mut self, value: Value) -> Outcome<CellRef<ObjectRecord>> {
        match value {
            Value::Object(r) if self.heap.objects.contains(r) => Ok(r),
            Value::Object(_) => Err(self.stale("object")),
            other => Err(self.throw(
                ExcKind::TypeMismatch,
                format!("{}: found {}", messages::NOT_AN_OBJECT, other.type_name()),
            )),
        }
    }

    fn with_record<R>(&mut self, value: Value, f: impl FnOnce(&ObjectRecord) -> R) -> Outcome<R> {
        let r = self.record_ref(value)?;
        match self.heap.object(r) {
            Some(record) => Ok(f(record)),
            None => Err(self.stale("object")),
        }
    }

    fn with_record_mut<R>(
        &mut self,
        value: Value,
        f: impl FnOnce(&mut ObjectRecord) -> R,
    ) -> Outcome<R> {
        let r = self.record_ref(value)?;
        match self.heap.object_mut(r) {
            Some(record) => Ok(f(record)),
            None => Err(self.stale("object")),
        }
    }

    pub fn obj_get(&mut self, obj: Value, key: &str) -> Outcome<Option<Value>> {
        self.with_record(obj, |r| r.get(key))
    }

    pub fn obj_set(&mut self, obj: Value, key: &str, value: Value) -> Outcome<()> {
        self.with_record_mut(obj, |r| r.set(key, value))
    }

    pub fn obj_remove(&mut self, obj: Value, key: &str) -> Outcome<Option<Value>> {
        self.with_record_mut(obj, |r| r.remove(key))
    }

    pub fn obj_contains(&mut self, obj: Value, key: &str) -> Outcome<bool> {
        self.with_record(obj, |r| r.contains_key(key))
    }

    /// Map keys as fresh string values, in slot order.
    pub fn obj_keys(&mut self, obj: Value) -> Outcome<Value> {
        let keys: Vec<String> = self.with_record(obj, |r| r.keys().map(str::to_string).collect())?;
        let items: Vec<Value> = keys.into_iter().map(|k| self.heap.alloc_str(k)).collect();
        Ok(self.array(&items))
    }

    /// Map values followed by the dense array elements.
    pub fn obj_values(&mut self, obj: Value) -> Outcome<Value> {
        let items: Vec<Value> = self.with_record(obj, |r| {
            r.entries().map(|(_, v)| v).chain(r.dense_values()).collect()
        })?;
        Ok(self.array(&items))
    }

    pub fn index_get(&mut self, obj: Value, index: i64) -> Outcome<Option<Value>> {
        self.with_record(obj, |r| r.index_get(index))
    }

    pub fn index_set(&mut self, obj: Value, index: i64, value: Value) -> Outcome<()> {
        match self.with_record_mut(obj, |r| r.index_set(index, value))? {
            Ok(()) => Ok(()),
            Err(e) => Err(self.throw(ExcKind::OutOfRange, e.to_string())),
        }
    }

    pub fn push(&mut self, obj: Value, value: Value) -> Outcome<()> {
        self.with_record_mut(obj, |r| r.push(value))
    }

    pub fn pop(&mut self, obj: Value) -> Outcome<Option<Value>> {
        self.with_record_mut(obj, |r| r.pop())
    }

    pub fn shift(&mut self, obj: Value) -> Outcome<Option<Value>> {
        self.with_record_mut(obj, |r| r.shift())
    }

    pub fn unshift(&mut self, obj: Value, value: Value) -> Outcome<()> {
        self.with_record_mut(obj, |r| r.unshift(value))
    }

    pub fn len(&mut self, obj: Value) -> Outcome<usize> {
        self.with_record(obj, |r| r.len())
    }

    pub fn slice_from(&mut self, obj: Value, start: i64) -> Outcome<Value> {
        let slice = self.with_record(obj, |r| r.slice_from(start))?;
        Ok(Value::Object(self.heap.alloc_object(slice)))
    }

    /// Ties a native resource's cleanup to the lifetime of a record.
    pub fn attach_native(&mut self, obj: Value, hook: FreeHook) -> Outcome<()> {
        let r = self.record_ref(obj)?;
        if self.heap.set_free_hook(Root::Object(r), hook) {
            Ok(())
        } else {
            Err(self.stale("object"))
        }
    }

    // ---- closures ----

    pub(crate) fn closure_ref(&mut self, value: Value) -> Outcome<CellRef<Closure>> {
        match value {
            Value::Closure(r) if self.heap.closures.contains(r) => Ok(r),
            Value::Closure(_) => Err(self.stale("closure")),
            other => Err(self.throw(
                ExcKind::TypeMismatch,
                format!("{}: found {}", messages::NOT_A_CLOSURE, other.type_name()),
            )),
        }
    }

    pub fn closure_name(&self, closure: CellRef<Closure>) -> String {
        self.heap
            .closure(closure)
            .map(|c| c.display_name().to_string())
            .unwrap_or_default()
    }
}
