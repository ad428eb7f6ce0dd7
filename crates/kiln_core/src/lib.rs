//! Core allocation types for the Kiln runtime.
//!
//! This crate is independent of the value model:
//! - `Pool` - per-kind cell arena with free-list recycling and an alive list
//! - `CellRef` - generational handle to a pooled cell
//! - `Kind` - the fixed set of pooled cell kinds
//! - `BitSet` - mark bits used by the collector

pub mod bits;
pub mod kind;
pub mod pool;

pub use bits::BitSet;
pub use kind::{Kind, KindCounts};
pub use pool::{CellRef, FreeHook, Pool, PoolStats, DEFAULT_BATCH};
