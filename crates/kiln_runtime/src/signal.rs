//! Non-local control flow: exceptions and generator yields.
//!
//! Every fallible runtime entry point returns `Outcome`. An `Err(Signal)`
//! propagates with `?` until a `try_catch` or `resume` boundary consumes it.

use std::fmt;

use crate::context::Context;
use crate::core::Value;
use crate::object::ObjectRecord;

pub const TYPE_KEY: &str = "_type";
pub const WHAT_KEY: &str = "_what";
pub const TRACE_KEY: &str = "_trace";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Signal {
    /// Carries the exception record (or any thrown value).
    Exception(Value),
    /// The yielded value waits in the context until a `resume` collects it.
    Yield,
}

pub type Outcome<T = Value> = Result<T, Signal>;

/// Built-in exception kinds, stored by name in `_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExcKind {
    StackOverflow,
    DivideByZero,
    UnsupportedOperation,
    MethodMissing,
    NoMatchingPattern,
    TooFewArguments,
    TypeMismatch,
    OutOfRange,
    Regex,
    Archive,
    Xml,
    File,
}

impl ExcKind {
    pub const ALL: [ExcKind; 12] = [
        ExcKind::StackOverflow,
        ExcKind::DivideByZero,
        ExcKind::UnsupportedOperation,
        ExcKind::MethodMissing,
        ExcKind::NoMatchingPattern,
        ExcKind::TooFewArguments,
        ExcKind::TypeMismatch,
        ExcKind::OutOfRange,
        ExcKind::Regex,
        ExcKind::Archive,
        ExcKind::Xml,
        ExcKind::File,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ExcKind::StackOverflow => "StackOverflow",
            ExcKind::DivideByZero => "DivideByZero",
            ExcKind::UnsupportedOperation => "UnsupportedOperation",
            ExcKind::MethodMissing => "MethodMissing",
            ExcKind::NoMatchingPattern => "NoMatchingPattern",
            ExcKind::TooFewArguments => "TooFewArguments",
            ExcKind::TypeMismatch => "TypeMismatch",
            ExcKind::OutOfRange => "OutOfRange",
            ExcKind::Regex => "RegexException",
            ExcKind::Archive => "ArchiveException",
            ExcKind::Xml => "XmlException",
            ExcKind::File => "FileException",
        }
    }

    pub fn from_name(name: &str) -> Option<ExcKind> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }
}

impl fmt::Display for ExcKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Source position of a call, recorded in traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallSite {
    pub file: &'static str,
    pub line: u32,
}

impl CallSite {
    pub const fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }
}

/// The `CallSite` of the macro invocation.
#[macro_export]
macro_rules! call_site {
    () => {
        $crate::CallSite::new(file!(), line!())
    };
}

/// One frame of an exception trace: `function` is the callee that the
/// exception left, `file` and `line` locate the call that entered it. The
/// innermost entry therefore names the function that threw together with
/// the place it was called from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEntry {
    pub function: String,
    pub file: String,
    pub line: i64,
}

impl fmt::Display for TraceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at {} ({}:{})", self.function, self.file, self.line)
    }
}

/// Host-side copy of an exception record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionInfo {
    pub kind: String,
    pub message: String,
    /// Innermost call first.
    pub trace: Vec<TraceEntry>,
}

impl Context {
    /// Allocates an exception record `{_type, _what, _trace: []}`.
    pub fn new_exception(&mut self, kind: &str, message: &str) -> Value {
        let kind = self.heap.alloc_str(kind.to_string());
        let what = self.heap.alloc_str(message.to_string());
        let trace = self.heap.alloc_object(ObjectRecord::new());
        let mut record = ObjectRecord::new();
        record.set(TYPE_KEY, kind);
        record.set(WHAT_KEY, what);
        record.set(TRACE_KEY, Value::Object(trace));
        Value::Object(self.heap.alloc_object(record))
    }

    /// Builds a built-in exception and wraps it for propagation.
    pub fn throw(&mut self, kind: ExcKind, message: impl AsRef<str>) -> Signal {
        let message = message.as_ref();
        tracing::debug!(kind = kind.name(), message, depth = self.depth(), "exception raised");
        Signal::Exception(self.new_exception(kind.name(), message))
    }

    /// Throws a user-defined exception kind.
    pub fn throw_named(&mut self, kind: &str, message: impl AsRef<str>) -> Signal {
        Signal::Exception(self.new_exception(kind, message.as_ref()))
    }

    /// Appends one trace entry. Thrown values that are not records are left
    /// alone; records without a trace get one.
    pub(crate) fn append_trace(&mut self, exception: Value, function: &str, file: &str, line: i64) {
        let Value::Object(exc) = exception else {
            return;
        };
        let existing = match self.heap.object(exc) {
            Some(record) => record.get(TRACE_KEY),
            None => return,
        };
        let trace = match existing {
            Some(Value::Object(t)) if self.heap.object(t).is_some() => t,
            _ => {
                let t = self.heap.alloc_object(ObjectRecord::new());
                if let Some(record) = self.heap.object_mut(exc) {
                    record.set(TRACE_KEY, Value::Object(t));
                }
                t
            }
        };
        let function = self.heap.alloc_str(function.to_string());
        let file = self.heap.alloc_str(file.to_string());
        let mut entry = ObjectRecord::new();
        entry.set("function", function);
        entry.set("file", file);
        entry.set("line", Value::Int(line));
        let entry = Value::Object(self.heap.alloc_object(entry));
        if let Some(trace) = self.heap.object_mut(trace) {
            trace.push(entry);
        }
    }

    /// Reads an exception record back into host types.
    pub fn exception_info(&self, exception: Value) -> Option<ExceptionInfo> {
        let Value::Object(exc) = exception else {
            return None;
        };
        let record = self.heap.object(exc)?;
        let text = |key: &str| {
            record
                .get(key)
                .and_then(|v| self.heap.str_of(v))
                .map(str::to_string)
        };
        let kind = text(TYPE_KEY)?;
        let message = text(WHAT_KEY).unwrap_or_default();
        let mut trace = Vec::new();
        let entries = match record.get(TRACE_KEY) {
            Some(Value::Object(t)) => self.heap.object(t),
            _ => None,
        };
        if let Some(entries) = entries {
            for entry in entries.dense_values() {
                let Value::Object(e) = entry else { continue };
                let Some(e) = self.heap.object(e) else { continue };
                let field = |key: &str| {
                    e.get(key)
                        .and_then(|v| self.heap.str_of(v))
                        .unwrap_or_default()
                        .to_string()
                };
                trace.push(TraceEntry {
                    function: field("function"),
                    file: field("file"),
                    line: e.get("line").and_then(|v| v.as_int()).unwrap_or(0),
                });
            }
        }
        Some(ExceptionInfo {
            kind,
            message,
            trace,
        })
    }

    /// The `_type` name of an exception record.
    pub fn exception_kind(&self, exception: Value) -> Option<&str> {
        let Value::Object(exc) = exception else {
            return None;
        };
        let kind = self.heap.object(exc)?.get(TYPE_KEY)?;
        self.heap.str_of(kind)
    }

    /// True when `exception` is a record whose `_type` is `kind`.
    pub fn is_exception(&self, exception: Value, kind: ExcKind) -> bool {
        self.exception_kind(exception) == Some(kind.name())
    }
}
