//! Generators: closures that suspend with `Signal::Yield` and are re-entered
//! by `resume`.
//!
//! A suspending routine saves its locals into a snapshot frame on its own
//! closure; on re-entry it reads them back through `resume_point` and jumps
//! to the saved index. A routine that receives `Yield` from a nested call
//! saves its own state with `save_locals` and returns the signal outward.

use kiln_core::CellRef;

use crate::context::Context;
use crate::core::{Closure, Frame, Value};
use crate::signal::{CallSite, Outcome, Signal};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GenStep {
    Yielded(Value),
    /// The routine returned. Every later resume reports `Done(Undefined)`.
    Done(Value),
}

impl Context {
    /// Snapshots `locals` and `resume_at` onto the running closure without
    /// producing a value.
    pub fn save_locals(&mut self, resume_at: u32, locals: &[Value]) -> Signal {
        let Some(&current) = self.running.last() else {
            return Signal::Yield;
        };
        let parent = self.heap.closure(current).and_then(|c| c.frame);
        let snapshot = self.heap.alloc_frame(Frame {
            slots: locals.to_vec(),
            parent,
        });
        if let Some(c) = self.heap.closure_mut(current) {
            c.suspension.snapshot = Some(snapshot);
            c.suspension.resume_at = resume_at;
        }
        Signal::Yield
    }

    /// Saves state and hands `value` to the resumer.
    pub fn suspend(&mut self, resume_at: u32, locals: &[Value], value: Value) -> Signal {
        self.save_locals(resume_at, locals);
        if let Some(old) = self.pending_yield.replace(value) {
            self.unhold(old);
        }
        self.hold(value);
        Signal::Yield
    }

    /// Where the running closure last suspended, with its saved locals.
    /// `None` on first entry.
    pub fn resume_point(&self) -> Option<(u32, Vec<Value>)> {
        let current = *self.running.last()?;
        let state = &self.heap.closure(current)?.suspension;
        let snapshot = self.heap.frame(state.snapshot?)?;
        Some((state.resume_at, snapshot.slots.clone()))
    }

    pub fn resume(&mut self, generator: Value, site: CallSite) -> Outcome<GenStep> {
        let closure = self.closure_ref(generator)?;
        if self.heap.closure(closure).is_some_and(|c| c.suspension.finished) {
            return Ok(GenStep::Done(Value::Undefined));
        }
        match self.invoke(generator, closure, &[]) {
            Ok(v) => {
                self.finish(closure);
                Ok(GenStep::Done(v))
            }
            Err(Signal::Yield) => Ok(GenStep::Yielded(self.take_pending_yield())),
            Err(Signal::Exception(exc)) => {
                self.finish(closure);
                let name = self.closure_name(closure);
                self.append_trace(exc, &name, site.file, i64::from(site.line));
                Err(Signal::Exception(exc))
            }
        }
    }

    pub fn is_finished(&self, generator: Value) -> bool {
        match generator {
            Value::Closure(r) => self.heap.closure(r).is_some_and(|c| c.suspension.finished),
            _ => false,
        }
    }

    fn finish(&mut self, closure: CellRef<Closure>) {
        if let Some(c) = self.heap.closure_mut(closure) {
            c.suspension.finished = true;
            c.suspension.snapshot = None;
        }
    }

    fn take_pending_yield(&mut self) -> Value {
        match self.pending_yield.take() {
            Some(v) => {
                self.unhold(v);
                v
            }
            None => Value::Undefined,
        }
    }
}
