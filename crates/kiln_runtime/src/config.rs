//! Runtime configuration.

use std::str::FromStr;

/// Tunables fixed for the lifetime of a `Context`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Safe points between two collections.
    pub gc_interval: u32,
    /// Cells added to a pool each time it runs dry.
    pub arena_batch: usize,
    /// Nested calls allowed before `StackOverflow`. The default leaves room
    /// for native recursion on a 2 MB thread stack.
    pub max_call_depth: usize,
    pub max_value_stack: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            gc_interval: 4096,
            arena_batch: 1024,
            max_call_depth: 1000,
            max_value_stack: 1 << 20,
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden by `KILN_GC_INTERVAL`, `KILN_ARENA_BATCH`,
    /// `KILN_MAX_CALL_DEPTH` and `KILN_MAX_VALUE_STACK`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(v) = env_number("KILN_GC_INTERVAL") {
            config.gc_interval = v;
        }
        if let Some(v) = env_number("KILN_ARENA_BATCH") {
            config.arena_batch = v;
        }
        if let Some(v) = env_number("KILN_MAX_CALL_DEPTH") {
            config.max_call_depth = v;
        }
        if let Some(v) = env_number("KILN_MAX_VALUE_STACK") {
            config.max_value_stack = v;
        }
        config
    }
}

fn env_number<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "ignoring malformed setting");
            None
        }
    }
}
