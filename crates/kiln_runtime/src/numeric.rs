//! The numeric tower.
//!
//! Integers live as `i64` until an operation would overflow, then continue as
//! `BigInt`; any `BigInt` result that fits in 64 bits is demoted again (see
//! `Heap::alloc_bigint`). Overflow is detected by comparing operands against
//! the bounds before the operation, never by inspecting a wrapped result.

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use crate::core::{Heap, Value};

#[inline]
pub fn checked_add(a: i64, b: i64) -> Option<i64> {
    if (b > 0 && a > i64::MAX - b) || (b < 0 && a < i64::MIN - b) {
        return None;
    }
    Some(a + b)
}

#[inline]
pub fn checked_sub(a: i64, b: i64) -> Option<i64> {
    if (b < 0 && a > i64::MAX + b) || (b > 0 && a < i64::MIN + b) {
        return None;
    }
    Some(a - b)
}

#[inline]
pub fn checked_mul(a: i64, b: i64) -> Option<i64> {
    if a == 0 || b == 0 {
        return Some(0);
    }
    let overflows = if a > 0 {
        if b > 0 { a > i64::MAX / b } else { b < i64::MIN / a }
    } else if b > 0 {
        a < i64::MIN / b
    } else {
        b < i64::MAX / a
    };
    if overflows { None } else { Some(a * b) }
}

#[inline]
pub fn checked_neg(a: i64) -> Option<i64> {
    if a == i64::MIN { None } else { Some(-a) }
}

/// A numeric operand read out of the heap.
#[derive(Debug, Clone, PartialEq)]
pub enum Num {
    Int(i64),
    Big(BigInt),
    Double(f64),
}

impl Num {
    /// `None` for non-numeric values and dead `BigInt` handles.
    pub fn read(heap: &Heap, value: Value) -> Option<Num> {
        match value {
            Value::Int(i) => Some(Num::Int(i)),
            Value::Double(f) => Some(Num::Double(f)),
            Value::BigInt(r) => heap.bigint(r).cloned().map(Num::Big),
            _ => None,
        }
    }

    pub fn to_f64(&self) -> f64 {
        match self {
            Num::Int(i) => *i as f64,
            Num::Big(b) => b.to_f64().unwrap_or(f64::NAN),
            Num::Double(f) => *f,
        }
    }

    /// `None` for doubles; the integer side of the tower only.
    pub fn into_big(self) -> Option<BigInt> {
        match self {
            Num::Int(i) => Some(BigInt::from(i)),
            Num::Big(b) => Some(b),
            Num::Double(_) => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Num::Int(i) => *i == 0,
            Num::Big(b) => b.is_zero(),
            Num::Double(f) => *f == 0.0,
        }
    }

    pub fn is_double(&self) -> bool {
        matches!(self, Num::Double(_))
    }
}

/// Lossy conversion used where a host `f64` is required.
pub fn to_f64(heap: &Heap, value: Value) -> Option<f64> {
    Num::read(heap, value).map(|n| n.to_f64())
}

/// Integer view of a value. Doubles truncate toward zero; NaN, infinities and
/// `BigInt` values have no `i64` form.
pub fn to_i64(heap: &Heap, value: Value) -> Option<i64> {
    match Num::read(heap, value)? {
        Num::Int(i) => Some(i),
        Num::Double(f) if f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
            Some(f as i64)
        }
        Num::Double(_) => None,
        Num::Big(b) => b.to_i64(),
    }
}
