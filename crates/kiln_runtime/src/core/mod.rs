pub mod buffers;
pub mod env;
pub mod heap;
pub mod value;

pub use buffers::{BinBuf, StrBuf, path_join};
pub use env::{Closure, Frame, GenState, NativeFn};
pub use heap::{Heap, Root};
pub use value::{BigIntCell, Value, ValueCell};
