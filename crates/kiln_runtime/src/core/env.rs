//! Closures and the frames they capture.

use kiln_core::CellRef;

use super::value::Value;
use crate::context::Context;
use crate::signal::Outcome;

/// Native entry point of a closure.
///
/// Receives the captured frame and the argument count; the callee and its
/// arguments sit on top of the value stack (`Context::args`).
pub type NativeFn = fn(&mut Context, Option<CellRef<Frame>>, usize) -> Outcome;

/// Local slots of one activation, chained to the lexically enclosing frame.
#[derive(Clone, Debug, Default)]
pub struct Frame {
    pub slots: Vec<Value>,
    pub parent: Option<CellRef<Frame>>,
}

impl Frame {
    pub fn with_slots(count: usize, parent: Option<CellRef<Frame>>) -> Self {
        Self {
            slots: vec![Value::Undefined; count],
            parent,
        }
    }

    pub fn get(&self, slot: usize) -> Option<Value> {
        self.slots.get(slot).copied()
    }

    /// Grows the frame when `slot` is past the end.
    pub fn set(&mut self, slot: usize, value: Value) {
        if slot >= self.slots.len() {
            self.slots.resize(slot + 1, Value::Undefined);
        }
        self.slots[slot] = value;
    }
}

/// Suspension state. Only closures driven through `Context::resume` use it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GenState {
    /// Locals saved at the last yield.
    pub snapshot: Option<CellRef<Frame>>,
    pub resume_at: u32,
    pub finished: bool,
}

#[derive(Clone, Debug)]
pub struct Closure {
    pub name: String,
    pub func: NativeFn,
    pub frame: Option<CellRef<Frame>>,
    pub suspension: GenState,
}

fn unbound(_: &mut Context, _: Option<CellRef<Frame>>, _: usize) -> Outcome {
    Ok(Value::Undefined)
}

impl Default for Closure {
    fn default() -> Self {
        Self {
            name: String::new(),
            func: unbound,
            frame: None,
            suspension: GenState::default(),
        }
    }
}

impl Closure {
    pub fn new(name: impl Into<String>, func: NativeFn, frame: Option<CellRef<Frame>>) -> Self {
        Self {
            name: name.into(),
            func,
            frame,
            suspension: GenState::default(),
        }
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { "<anonymous>" } else { &self.name }
    }
}
