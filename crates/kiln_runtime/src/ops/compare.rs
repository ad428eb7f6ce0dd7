//! Ordering and equality.

use std::cmp::Ordering;

use super::unsupported;
use crate::context::Context;
use crate::core::{Heap, Value};
use crate::errors::messages;
use crate::numeric::Num;
use crate::signal::{ExcKind, Outcome};

fn num_cmp(x: &Num, y: &Num) -> Option<Ordering> {
    match (x, y) {
        (Num::Int(a), Num::Int(b)) => Some(a.cmp(b)),
        (Num::Double(_), _) | (_, Num::Double(_)) => x.to_f64().partial_cmp(&y.to_f64()),
        (Num::Big(a), Num::Big(b)) => Some(a.cmp(b)),
        (Num::Big(a), Num::Int(b)) => Some(a.cmp(&(*b).into())),
        (Num::Int(a), Num::Big(b)) => Some(num_bigint::BigInt::from(*a).cmp(b)),
    }
}

/// `Ok(None)` when the operands are unordered (NaN).
fn compare(ctx: &mut Context, op: &str, a: Value, b: Value) -> Outcome<Option<Ordering>> {
    if let (Some(x), Some(y)) = (Num::read(&ctx.heap, a), Num::read(&ctx.heap, b)) {
        return Ok(num_cmp(&x, &y));
    }
    let ordering = match (a, b) {
        (Value::Str(x), Value::Str(y)) => match (ctx.heap.string(x), ctx.heap.string(y)) {
            (Some(x), Some(y)) => Some(x.cmp(y)),
            _ => None,
        },
        (Value::Binary(x), Value::Binary(y)) => match (ctx.heap.bytes(x), ctx.heap.bytes(y)) {
            (Some(x), Some(y)) => Some(x.cmp(y)),
            _ => None,
        },
        _ => return Err(unsupported(ctx, op, a, b)),
    };
    match ordering {
        Some(o) => Ok(Some(o)),
        None => Err(ctx.stale(a.type_name())),
    }
}

pub fn lt(ctx: &mut Context, a: Value, b: Value) -> Outcome {
    Ok(Value::bool(compare(ctx, "<", a, b)? == Some(Ordering::Less)))
}

pub fn le(ctx: &mut Context, a: Value, b: Value) -> Outcome {
    let o = compare(ctx, "<=", a, b)?;
    Ok(Value::bool(matches!(o, Some(Ordering::Less | Ordering::Equal))))
}

pub fn gt(ctx: &mut Context, a: Value, b: Value) -> Outcome {
    Ok(Value::bool(compare(ctx, ">", a, b)? == Some(Ordering::Greater)))
}

pub fn ge(ctx: &mut Context, a: Value, b: Value) -> Outcome {
    let o = compare(ctx, ">=", a, b)?;
    Ok(Value::bool(matches!(o, Some(Ordering::Greater | Ordering::Equal))))
}

/// Three-way comparison answering -1, 0 or 1.
pub fn cmp3(ctx: &mut Context, a: Value, b: Value) -> Outcome {
    match compare(ctx, "<=>", a, b)? {
        Some(o) => Ok(Value::Int(o as i64)),
        None => Err(ctx.throw(ExcKind::UnsupportedOperation, messages::NAN_ORDER)),
    }
}

pub fn eq(ctx: &mut Context, a: Value, b: Value) -> Outcome {
    Ok(Value::bool(equals(&ctx.heap, a, b)))
}

pub fn ne(ctx: &mut Context, a: Value, b: Value) -> Outcome {
    Ok(Value::bool(!equals(&ctx.heap, a, b)))
}

/// Total equality. Numbers compare by value across the tower, strings and
/// binaries by content, records and closures by identity.
pub fn equals(heap: &Heap, a: Value, b: Value) -> bool {
    if let (Some(x), Some(y)) = (Num::read(heap, a), Num::read(heap, b)) {
        return num_cmp(&x, &y) == Some(Ordering::Equal);
    }
    match (a, b) {
        (Value::Undefined, Value::Undefined) => true,
        (Value::Str(x), Value::Str(y)) => x == y || heap.string(x) == heap.string(y),
        (Value::Binary(x), Value::Binary(y)) => x == y || heap.bytes(x) == heap.bytes(y),
        (Value::Object(x), Value::Object(y)) => x == y,
        (Value::Closure(x), Value::Closure(y)) => x == y,
        _ => false,
    }
}
