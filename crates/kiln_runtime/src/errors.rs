//! Host-level errors and shared exception message text.

use crate::signal::TraceEntry;

pub mod messages {
    pub const DIVISION_BY_ZERO: &str = "Division by zero";
    pub const STACK_OVERFLOW: &str = "Maximum call depth exceeded";
    pub const VALUE_STACK_OVERFLOW: &str = "Value stack exhausted";
    pub const NEGATIVE_REPEAT: &str = "Repeat count must not be negative";
    pub const REPEAT_TOO_LARGE: &str = "Repeat result is too large";
    pub const SHIFT_TOO_LARGE: &str = "Shift count is too large";
    pub const NEGATIVE_SHIFT: &str = "Shift count must not be negative";
    pub const NAN_ORDER: &str = "NaN has no ordering";
    pub const NOT_AN_OBJECT: &str = "Not an object";
    pub const NOT_A_CLOSURE: &str = "Not a closure";
    pub const STALE_HANDLE: &str = "Handle refers to a collected cell";
}

/// Failures that escape the script entirely.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error("Uncaught {kind}: {message}")]
    Uncaught {
        kind: String,
        message: String,
        trace: Vec<TraceEntry>,
    },
    #[error("yield outside of a generator")]
    YieldOutsideGenerator,
    #[error("stack pointer {requested} is above the stack top {top}")]
    StackPointerAbove { requested: usize, top: usize },
}
