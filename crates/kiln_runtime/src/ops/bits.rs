//! Unary arithmetic and bitwise operators over the integer tower.

use num_bigint::BigInt;
use num_traits::Signed;

use super::{unsupported, unsupported_unary};
use crate::context::Context;
use crate::core::Value;
use crate::errors::messages;
use crate::numeric::{Num, checked_add, checked_neg, checked_sub};
use crate::signal::{ExcKind, Outcome};

/// Larger shifts are refused rather than allocating a huge integer.
const MAX_SHIFT: u64 = 1 << 20;

pub fn neg(ctx: &mut Context, a: Value) -> Outcome {
    match Num::read(&ctx.heap, a) {
        Some(Num::Int(i)) => Ok(match checked_neg(i) {
            Some(n) => Value::Int(n),
            None => ctx.heap.alloc_bigint(-BigInt::from(i)),
        }),
        Some(Num::Big(b)) => Ok(ctx.heap.alloc_bigint(-b)),
        Some(Num::Double(f)) => Ok(Value::Double(-f)),
        None => Err(unsupported_unary(ctx, "-", a)),
    }
}

fn step(ctx: &mut Context, a: Value, delta: i64, op: &str) -> Outcome {
    let checked = if delta > 0 { checked_add } else { checked_sub };
    match Num::read(&ctx.heap, a) {
        Some(Num::Int(i)) => Ok(match checked(i, 1) {
            Some(n) => Value::Int(n),
            None => ctx.heap.alloc_bigint(BigInt::from(i) + delta),
        }),
        Some(Num::Big(b)) => Ok(ctx.heap.alloc_bigint(b + delta)),
        Some(Num::Double(f)) => Ok(Value::Double(f + delta as f64)),
        None => Err(unsupported_unary(ctx, op, a)),
    }
}

pub fn inc(ctx: &mut Context, a: Value) -> Outcome {
    step(ctx, a, 1, "++")
}

pub fn dec(ctx: &mut Context, a: Value) -> Outcome {
    step(ctx, a, -1, "--")
}

pub fn bit_not(ctx: &mut Context, a: Value) -> Outcome {
    match Num::read(&ctx.heap, a) {
        Some(Num::Int(i)) => Ok(Value::Int(!i)),
        Some(Num::Big(b)) => Ok(ctx.heap.alloc_bigint(!b)),
        _ => Err(unsupported_unary(ctx, "~", a)),
    }
}

/// Both operands as integers, or `None` if either is a double or non-numeric.
fn integers(ctx: &Context, a: Value, b: Value) -> Option<(Num, Num)> {
    let x = Num::read(&ctx.heap, a)?;
    let y = Num::read(&ctx.heap, b)?;
    if x.is_double() || y.is_double() { None } else { Some((x, y)) }
}

fn bitwise(
    ctx: &mut Context,
    op: &str,
    a: Value,
    b: Value,
    small: fn(i64, i64) -> i64,
    big: fn(BigInt, BigInt) -> BigInt,
) -> Outcome {
    match integers(ctx, a, b) {
        Some((Num::Int(x), Num::Int(y))) => Ok(Value::Int(small(x, y))),
        Some((x, y)) => match (x.into_big(), y.into_big()) {
            (Some(x), Some(y)) => Ok(ctx.heap.alloc_bigint(big(x, y))),
            _ => Err(unsupported(ctx, op, a, b)),
        },
        None => Err(unsupported(ctx, op, a, b)),
    }
}

pub fn bit_and(ctx: &mut Context, a: Value, b: Value) -> Outcome {
    bitwise(ctx, "&", a, b, |x, y| x & y, |x, y| x & y)
}

pub fn bit_or(ctx: &mut Context, a: Value, b: Value) -> Outcome {
    bitwise(ctx, "|", a, b, |x, y| x | y, |x, y| x | y)
}

pub fn bit_xor(ctx: &mut Context, a: Value, b: Value) -> Outcome {
    bitwise(ctx, "^", a, b, |x, y| x ^ y, |x, y| x ^ y)
}

fn shift_count(ctx: &mut Context, op: &str, a: Value, b: Value) -> Outcome<(Num, u64)> {
    let Some((x, y)) = integers(ctx, a, b) else {
        return Err(unsupported(ctx, op, a, b));
    };
    match y {
        Num::Int(n) if n < 0 => Err(ctx.throw(ExcKind::OutOfRange, messages::NEGATIVE_SHIFT)),
        Num::Big(n) if n.is_negative() => {
            Err(ctx.throw(ExcKind::OutOfRange, messages::NEGATIVE_SHIFT))
        }
        Num::Int(n) if (n as u64) <= MAX_SHIFT => Ok((x, n as u64)),
        _ => Err(ctx.throw(ExcKind::OutOfRange, messages::SHIFT_TOO_LARGE)),
    }
}

/// Left shift, promoting when bits would be lost.
pub fn shl(ctx: &mut Context, a: Value, b: Value) -> Outcome {
    let (x, n) = shift_count(ctx, "<<", a, b)?;
    if let Num::Int(i) = x {
        if n < 63 {
            let shifted = i << n;
            if shifted >> n == i {
                return Ok(Value::Int(shifted));
            }
        }
        if i == 0 {
            return Ok(Value::Int(0));
        }
    }
    match x.into_big() {
        Some(big) => Ok(ctx.heap.alloc_bigint(big << n as usize)),
        None => Err(unsupported(ctx, "<<", a, b)),
    }
}

/// Arithmetic right shift (rounds toward negative infinity).
pub fn shr(ctx: &mut Context, a: Value, b: Value) -> Outcome {
    let (x, n) = shift_count(ctx, ">>", a, b)?;
    match x {
        Num::Int(i) => Ok(Value::Int(if n >= 64 { i >> 63 } else { i >> n })),
        other => match other.into_big() {
            Some(big) => Ok(ctx.heap.alloc_bigint(big >> n as usize)),
            None => Err(unsupported(ctx, ">>", a, b)),
        },
    }
}
