//! Arithmetic across the numeric tower, plus the string, binary and
//! formatter overloads.

use num_bigint::BigInt;
use num_traits::Zero;

use super::unsupported;
use crate::context::Context;
use crate::core::{BinBuf, Value, path_join};
use crate::errors::messages;
use crate::numeric::{Num, checked_add, checked_mul, checked_sub};
use crate::object::ObjectRecord;
use crate::signal::{ExcKind, Outcome};

#[derive(Clone, Copy)]
enum IntOp {
    Add,
    Sub,
    Mul,
}

impl IntOp {
    fn checked(self, a: i64, b: i64) -> Option<i64> {
        match self {
            IntOp::Add => checked_add(a, b),
            IntOp::Sub => checked_sub(a, b),
            IntOp::Mul => checked_mul(a, b),
        }
    }

    fn big(self, a: BigInt, b: BigInt) -> BigInt {
        match self {
            IntOp::Add => a + b,
            IntOp::Sub => a - b,
            IntOp::Mul => a * b,
        }
    }

    fn float(self, a: f64, b: f64) -> f64 {
        match self {
            IntOp::Add => a + b,
            IntOp::Sub => a - b,
            IntOp::Mul => a * b,
        }
    }
}

/// `None` unless both operands are numeric.
fn tower(ctx: &mut Context, op: IntOp, a: Value, b: Value) -> Option<Value> {
    let x = Num::read(&ctx.heap, a)?;
    let y = Num::read(&ctx.heap, b)?;
    if x.is_double() || y.is_double() {
        return Some(Value::Double(op.float(x.to_f64(), y.to_f64())));
    }
    if let (Num::Int(x), Num::Int(y)) = (&x, &y) {
        if let Some(v) = op.checked(*x, *y) {
            return Some(Value::Int(v));
        }
    }
    let (x, y) = (x.into_big()?, y.into_big()?);
    Some(ctx.heap.alloc_bigint(op.big(x, y)))
}

fn int_fast(ctx: &mut Context, op: IntOp, a: Value, b: i64) -> Outcome {
    if let Value::Int(x) = a {
        if let Some(v) = op.checked(x, b) {
            return Ok(Value::Int(v));
        }
    }
    let symbol = match op {
        IntOp::Add => "+",
        IntOp::Sub => "-",
        IntOp::Mul => "*",
    };
    tower(ctx, op, a, Value::Int(b)).ok_or_else(|| unsupported(ctx, symbol, a, Value::Int(b)))
}

pub fn add(ctx: &mut Context, a: Value, b: Value) -> Outcome {
    if let Some(v) = tower(ctx, IntOp::Add, a, b) {
        return Ok(v);
    }
    match (a, b) {
        (Value::Binary(x), Value::Binary(y)) => {
            let joined = match (ctx.heap.bytes(x), ctx.heap.bytes(y)) {
                (Some(x), Some(y)) => BinBuf::concat(x, y),
                _ => return Err(ctx.stale("binary")),
            };
            Ok(Value::Binary(ctx.heap.binaries.alloc(joined)))
        }
        (Value::Str(_), _) | (_, Value::Str(_)) => {
            let mut text = ctx.display(a)?;
            text.push_str(&ctx.display(b)?);
            Ok(ctx.heap.alloc_str(text))
        }
        _ => Err(unsupported(ctx, "+", a, b)),
    }
}

pub fn sub(ctx: &mut Context, a: Value, b: Value) -> Outcome {
    tower(ctx, IntOp::Sub, a, b).ok_or_else(|| unsupported(ctx, "-", a, b))
}

pub fn mul(ctx: &mut Context, a: Value, b: Value) -> Outcome {
    if let Some(v) = tower(ctx, IntOp::Mul, a, b) {
        return Ok(v);
    }
    match (a, b) {
        (Value::Str(s), Value::Int(n)) | (Value::Int(n), Value::Str(s)) => {
            if n < 0 {
                return Err(ctx.throw(ExcKind::OutOfRange, messages::NEGATIVE_REPEAT));
            }
            let repeated = match ctx.heap.strings.get(s) {
                Some(text) => text.repeat(n as usize),
                None => return Err(ctx.stale("string")),
            };
            match repeated {
                Some(text) => Ok(ctx.heap.alloc_str(text)),
                None => Err(ctx.throw(ExcKind::OutOfRange, messages::REPEAT_TOO_LARGE)),
            }
        }
        (Value::Str(_), Value::BigInt(_)) | (Value::BigInt(_), Value::Str(_)) => {
            Err(ctx.throw(ExcKind::OutOfRange, messages::REPEAT_TOO_LARGE))
        }
        _ => Err(unsupported(ctx, "*", a, b)),
    }
}

/// Real division: the quotient is always a `Double`.
pub fn div(ctx: &mut Context, a: Value, b: Value) -> Outcome {
    if let (Value::Str(x), Value::Str(y)) = (a, b) {
        let joined = match (ctx.heap.string(x), ctx.heap.string(y)) {
            (Some(x), Some(y)) => path_join(x, y),
            _ => return Err(ctx.stale("string")),
        };
        return Ok(ctx.heap.alloc_str(joined));
    }
    let (Some(x), Some(y)) = (Num::read(&ctx.heap, a), Num::read(&ctx.heap, b)) else {
        return Err(unsupported(ctx, "/", a, b));
    };
    if y.is_zero() {
        return Err(ctx.throw(ExcKind::DivideByZero, messages::DIVISION_BY_ZERO));
    }
    Ok(Value::Double(x.to_f64() / y.to_f64()))
}

/// Truncated remainder for integers, `f64` remainder once a double is
/// involved. On a string, `%` starts a formatter instead.
pub fn rem(ctx: &mut Context, a: Value, b: Value) -> Outcome {
    match a {
        Value::Str(_) => {
            let template = ctx.copy(a)?;
            let mut record = ObjectRecord::formatter(template);
            record.push(b);
            return Ok(Value::Object(ctx.heap.alloc_object(record)));
        }
        Value::Object(r) if ctx.heap.object(r).is_some_and(ObjectRecord::is_formatter) => {
            let mut record = match ctx.heap.object(r) {
                Some(existing) => {
                    let mut next = ObjectRecord::formatter(existing.template().unwrap_or_default());
                    existing.dense_values().for_each(|v| next.push(v));
                    next
                }
                None => return Err(ctx.stale("object")),
            };
            record.push(b);
            return Ok(Value::Object(ctx.heap.alloc_object(record)));
        }
        _ => {}
    }
    let (Some(x), Some(y)) = (Num::read(&ctx.heap, a), Num::read(&ctx.heap, b)) else {
        return Err(unsupported(ctx, "%", a, b));
    };
    if y.is_zero() {
        return Err(ctx.throw(ExcKind::DivideByZero, messages::DIVISION_BY_ZERO));
    }
    if x.is_double() || y.is_double() {
        return Ok(Value::Double(x.to_f64() % y.to_f64()));
    }
    if let (Num::Int(x), Num::Int(y)) = (&x, &y) {
        // Only i64::MIN % -1 fails, and its remainder is zero.
        return Ok(Value::Int(x.checked_rem(*y).unwrap_or(0)));
    }
    match (x.into_big(), y.into_big()) {
        (Some(x), Some(y)) => {
            let r = x % y;
            Ok(if r.is_zero() { Value::Int(0) } else { ctx.heap.alloc_bigint(r) })
        }
        _ => Err(unsupported(ctx, "%", a, b)),
    }
}

pub fn add_int(ctx: &mut Context, a: Value, b: i64) -> Outcome {
    int_fast(ctx, IntOp::Add, a, b)
}

pub fn sub_int(ctx: &mut Context, a: Value, b: i64) -> Outcome {
    int_fast(ctx, IntOp::Sub, a, b)
}

pub fn mul_int(ctx: &mut Context, a: Value, b: i64) -> Outcome {
    int_fast(ctx, IntOp::Mul, a, b)
}
