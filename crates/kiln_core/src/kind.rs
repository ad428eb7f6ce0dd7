use std::fmt;
use std::ops::{Index, IndexMut};

/// The pooled cell kinds. Every kind has its own arena and free list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Value,
    StringBuf,
    BinBuf,
    BigInt,
    Closure,
    Frame,
    Object,
}

impl Kind {
    pub const COUNT: usize = 7;

    pub const ALL: [Kind; Kind::COUNT] = [
        Kind::Value,
        Kind::StringBuf,
        Kind::BinBuf,
        Kind::BigInt,
        Kind::Closure,
        Kind::Frame,
        Kind::Object,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Kind::Value => "value",
            Kind::StringBuf => "string",
            Kind::BinBuf => "binary",
            Kind::BigInt => "bigint",
            Kind::Closure => "closure",
            Kind::Frame => "frame",
            Kind::Object => "object",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One counter per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindCounts(pub [usize; Kind::COUNT]);

impl KindCounts {
    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }
}

impl Index<Kind> for KindCounts {
    type Output = usize;

    fn index(&self, kind: Kind) -> &usize {
        &self.0[kind.index()]
    }
}

impl IndexMut<Kind> for KindCounts {
    fn index_mut(&mut self, kind: Kind) -> &mut usize {
        &mut self.0[kind.index()]
    }
}

impl fmt::Display for KindCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for kind in Kind::ALL {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(f, "{}={}", kind.name(), self[kind])?;
        }
        Ok(())
    }
}
