//! Explicit root stacks.
//!
//! The collector never scans the host stack. A value is a root only while it
//! sits here (or in a cell reachable from here); `Context` keeps pool root
//! counts in step with pushes and pops.

use kiln_core::CellRef;
use smallvec::SmallVec;

use crate::core::{Frame, Value};

/// Operand and temporary stack.
#[derive(Debug, Default)]
pub struct ValueStack {
    slots: Vec<Value>,
}

impl ValueStack {
    pub fn new() -> Self {
        Self { slots: Vec::with_capacity(256) }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    #[inline]
    pub(crate) fn push(&mut self, v: Value) {
        self.slots.push(v);
    }

    #[inline]
    pub(crate) fn pop(&mut self) -> Option<Value> {
        self.slots.pop()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.slots.get(index).copied()
    }

    /// `depth` 0 is the top of the stack.
    pub fn peek(&self, depth: usize) -> Option<Value> {
        let len = self.slots.len();
        if depth >= len { None } else { Some(self.slots[len - 1 - depth]) }
    }

    /// The top `count` values, bottom first.
    pub fn top(&self, count: usize) -> SmallVec<[Value; 8]> {
        let start = self.slots.len().saturating_sub(count);
        SmallVec::from_slice(&self.slots[start..])
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.slots
    }
}

/// Activation frames of the running closures, innermost last.
#[derive(Debug, Default)]
pub struct FrameStack {
    frames: Vec<CellRef<Frame>>,
}

impl FrameStack {
    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub(crate) fn push(&mut self, frame: CellRef<Frame>) {
        self.frames.push(frame);
    }

    pub(crate) fn pop(&mut self) -> Option<CellRef<Frame>> {
        self.frames.pop()
    }

    pub fn current(&self) -> Option<CellRef<Frame>> {
        self.frames.last().copied()
    }
}
