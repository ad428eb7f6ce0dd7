use crate::context::Context;
use crate::core::Value;
use crate::numeric;
use crate::signal::{ExcKind, Outcome};

pub fn to_f64(ctx: &mut Context, v: Value) -> Outcome<f64> {
    match numeric::to_f64(&ctx.heap, v) {
        Some(f) => Ok(f),
        None => Err(ctx.throw(
            ExcKind::TypeMismatch,
            format!("expected a number, found {}", v.type_name()),
        )),
    }
}

pub fn to_i64(ctx: &mut Context, v: Value) -> Outcome<i64> {
    if let Some(i) = numeric::to_i64(&ctx.heap, v) {
        return Ok(i);
    }
    if v.is_numeric() {
        let shown = ctx.display(v)?;
        return Err(ctx.throw(ExcKind::OutOfRange, format!("{shown} does not fit in 64 bits")));
    }
    Err(ctx.throw(
        ExcKind::TypeMismatch,
        format!("expected an integer, found {}", v.type_name()),
    ))
}

/// `Undefined`, zero, `0.0`, NaN, the empty string and empty binary are false.
pub fn truthy(ctx: &Context, v: Value) -> bool {
    match v {
        Value::Undefined => false,
        Value::Int(i) => i != 0,
        Value::Double(f) => f != 0.0 && !f.is_nan(),
        Value::BigInt(_) => true,
        Value::Str(r) => ctx.heap.string(r).is_some_and(|s| !s.is_empty()),
        Value::Binary(r) => ctx.heap.bytes(r).is_some_and(|b| !b.is_empty()),
        Value::Object(_) | Value::Closure(_) => true,
    }
}
