//! Operator entry points. Each takes the context and its operands and either
//! produces a value or throws.

mod bits;
mod compare;
mod convert;
mod math;

pub use bits::{bit_and, bit_not, bit_or, bit_xor, dec, inc, neg, shl, shr};
pub use compare::{cmp3, eq, equals, ge, gt, le, lt, ne};
pub use convert::{to_f64, to_i64, truthy};
pub use math::{add, add_int, div, mul, mul_int, rem, sub, sub_int};

use crate::context::Context;
use crate::core::Value;
use crate::signal::{ExcKind, Signal};

pub(crate) fn unsupported(ctx: &mut Context, op: &str, a: Value, b: Value) -> Signal {
    ctx.throw(
        ExcKind::UnsupportedOperation,
        format!(
            "unsupported operand types for {op}: {} and {}",
            a.type_name(),
            b.type_name()
        ),
    )
}

pub(crate) fn unsupported_unary(ctx: &mut Context, op: &str, a: Value) -> Signal {
    ctx.throw(
        ExcKind::UnsupportedOperation,
        format!("unsupported operand type for {op}: {}", a.type_name()),
    )
}
