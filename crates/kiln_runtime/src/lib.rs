//! Kiln language runtime: values, heap, operators, collection and signals.

#![allow(clippy::new_without_default)]
#![allow(clippy::len_without_is_empty)]

pub mod call;
pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod format;
pub mod gc;
pub mod generator;
pub mod numeric;
pub mod object;
pub mod ops;
pub mod signal;
pub mod stack;

use std::sync::Once;

pub use call::report_fatal;
pub use config::RuntimeConfig;
pub use context::Context;
pub use crate::core::{
    BigIntCell, BinBuf, Closure, Frame, GenState, Heap, NativeFn, Root, StrBuf, Value, ValueCell,
    path_join,
};
pub use errors::RuntimeError;
pub use format::{Appendable, FormatError};
pub use gc::{Collector, GcPhase, GcReport};
pub use generator::GenStep;
pub use object::{ObjectRecord, RecordMode};
pub use signal::{CallSite, ExcKind, ExceptionInfo, Outcome, Signal, TraceEntry};

pub use kiln_core::{CellRef, Kind, KindCounts};

static TRACING_INIT: Once = Once::new();

/// Installs a `tracing` subscriber filtered by `RUST_LOG`. Does nothing when
/// `RUST_LOG` is unset or on every call after the first.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
