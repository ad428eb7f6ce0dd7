//! Runtime value representation.
//!
//! A `Value` is a tag plus either an immediate (`Int`, `Double`) or a handle to
//! a pooled cell. Handles are `Copy`; who owns a cell is a convention enforced
//! by `Context::copy` and by the collector, not by the type system.

use kiln_core::CellRef;
use num_bigint::BigInt;

use super::buffers::{BinBuf, StrBuf};
use super::env::Closure;
use super::heap::Root;
use crate::object::ObjectRecord;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Undefined,
    Int(i64),
    /// Always outside the `i64` range; see `Heap::alloc_bigint`.
    BigInt(CellRef<BigIntCell>),
    Double(f64),
    Str(CellRef<StrBuf>),
    Binary(CellRef<BinBuf>),
    Object(CellRef<ObjectRecord>),
    Closure(CellRef<Closure>),
}

/// Payload of an arbitrary-precision integer cell.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BigIntCell(pub BigInt);

/// A boxed value slot, used as an out-parameter or a shared mutable variable.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ValueCell(pub Value);

impl Value {
    pub const TRUE: Value = Value::Int(1);
    pub const FALSE: Value = Value::Int(0);

    /// The language has no boolean tag; predicates answer `1` or `0`.
    #[inline]
    pub fn bool(b: bool) -> Self {
        if b { Self::TRUE } else { Self::FALSE }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Int(_) => "int",
            Value::BigInt(_) => "bigint",
            Value::Double(_) => "double",
            Value::Str(_) => "string",
            Value::Binary(_) => "binary",
            Value::Object(_) => "object",
            Value::Closure(_) => "closure",
        }
    }

    #[inline]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    #[inline]
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Int(_) | Value::BigInt(_) | Value::Double(_))
    }

    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    #[inline]
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(f) => Some(*f),
            _ => None,
        }
    }

    /// The pooled cell this value points at, if any.
    pub fn root(&self) -> Option<Root> {
        match *self {
            Value::Undefined | Value::Int(_) | Value::Double(_) => None,
            Value::BigInt(r) => Some(Root::BigInt(r)),
            Value::Str(r) => Some(Root::Str(r)),
            Value::Binary(r) => Some(Root::Binary(r)),
            Value::Object(r) => Some(Root::Object(r)),
            Value::Closure(r) => Some(Root::Closure(r)),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Double(f)
    }
}
