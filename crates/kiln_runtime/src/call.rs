//! Calls, handlers and the outermost entry point.

use kiln_core::CellRef;

use crate::context::Context;
use crate::core::{Closure, Value, ValueCell};
use crate::errors::{RuntimeError, messages};
use crate::signal::{CallSite, ExcKind, ExceptionInfo, Outcome, Signal};

impl Context {
    /// Calls `callee` with `args`, rooting both for the duration of the call.
    ///
    /// An exception leaving the callee gains one trace entry naming the
    /// callee and `site`, so traces read innermost first.
    pub fn call(&mut self, callee: Value, args: &[Value], site: CallSite) -> Outcome {
        let closure = self.closure_ref(callee)?;
        match self.invoke(callee, closure, args) {
            Err(Signal::Exception(exc)) => {
                let name = self.closure_name(closure);
                self.append_trace(exc, &name, site.file, i64::from(site.line));
                Err(Signal::Exception(exc))
            }
            other => other,
        }
    }

    /// Like `call`, storing the result in a value cell.
    pub fn call_into(
        &mut self,
        callee: Value,
        args: &[Value],
        site: CallSite,
        out: CellRef<ValueCell>,
    ) -> Outcome<()> {
        let result = self.call(callee, args, site)?;
        if self.heap.set_value_cell(out, result) {
            Ok(())
        } else {
            Err(self.stale("value"))
        }
    }

    pub(crate) fn invoke(
        &mut self,
        callee: Value,
        closure: CellRef<Closure>,
        args: &[Value],
    ) -> Outcome {
        if self.depth >= self.config().max_call_depth {
            return Err(self.throw(ExcKind::StackOverflow, messages::STACK_OVERFLOW));
        }
        let (func, env) = match self.heap.closure(closure) {
            Some(c) => (c.func, c.frame),
            None => return Err(self.stale("closure")),
        };
        let sp = self.stack_pointer();
        let frames = self.frames().len();
        for &v in std::iter::once(&callee).chain(args) {
            if let Err(signal) = self.push_var(v) {
                self.unwind_to(sp, frames);
                return Err(signal);
            }
        }

        self.depth += 1;
        self.running.push(closure);
        self.tick();
        let result = func(self, env, args.len());
        self.running.pop();
        self.depth -= 1;
        self.unwind_to(sp, frames);

        if !matches!(result, Err(Signal::Yield)) {
            if let Some(c) = self.heap.closure_mut(closure) {
                c.suspension.snapshot = None;
                c.suspension.resume_at = 0;
            }
        }
        result
    }

    /// Runs `body`; an exception escaping it unwinds both stacks to their
    /// depth at entry and is passed to `handler`. Yields pass through.
    pub fn try_catch<B, H>(&mut self, body: B, handler: H) -> Outcome
    where
        B: FnOnce(&mut Context) -> Outcome,
        H: FnOnce(&mut Context, Value) -> Outcome,
    {
        let sp = self.stack_pointer();
        let frames = self.frames().len();
        let depth = self.depth;
        let running = self.running.len();
        match body(self) {
            Err(Signal::Exception(exc)) => {
                self.unwind_to(sp, frames);
                self.depth = depth;
                self.running.truncate(running);
                tracing::trace!(depth, "exception caught");
                // The handler may allocate and collect; keep the exception alive.
                self.push_var(exc)?;
                let result = handler(self, exc);
                self.unwind_to(sp, frames);
                result
            }
            other => other,
        }
    }

    /// Runs the program's entry closure. Anything escaping it becomes a
    /// host error.
    pub fn run_main(&mut self, main: Value) -> Result<Value, RuntimeError> {
        match self.call(main, &[], CallSite::new("<main>", 0)) {
            Ok(v) => Ok(v),
            Err(Signal::Exception(exc)) => {
                let info = match self.exception_info(exc) {
                    Some(info) => info,
                    None => ExceptionInfo {
                        kind: "Exception".to_string(),
                        message: self.display(exc).unwrap_or_default(),
                        trace: Vec::new(),
                    },
                };
                tracing::debug!(kind = %info.kind, frames = info.trace.len(), "uncaught exception");
                Err(RuntimeError::Uncaught {
                    kind: info.kind,
                    message: info.message,
                    trace: info.trace,
                })
            }
            Err(Signal::Yield) => {
                if let Some(v) = self.pending_yield.take() {
                    self.unhold(v);
                }
                Err(RuntimeError::YieldOutsideGenerator)
            }
        }
    }
}

/// Prints an escaped error with its trace to stderr and exits with status 1.
pub fn report_fatal(err: &RuntimeError) -> ! {
    eprintln!("{err}");
    if let RuntimeError::Uncaught { trace, .. } = err {
        for entry in trace {
            eprintln!("    {entry}");
        }
    }
    std::process::exit(1)
}
