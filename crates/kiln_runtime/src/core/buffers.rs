//! Byte and text buffers backing `Str` and `Binary` cells.

/// Text payload of a string cell.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct StrBuf {
    text: String,
}

impl StrBuf {
    pub fn new(text: String) -> Self {
        Self { text }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn push_str(&mut self, s: &str) {
        self.text.push_str(s);
    }

    pub fn into_string(self) -> String {
        self.text
    }

    /// `None` when the result would not fit in memory.
    pub fn repeat(&self, count: usize) -> Option<String> {
        let total = self.text.len().checked_mul(count)?;
        if total > isize::MAX as usize {
            return None;
        }
        Some(self.text.repeat(count))
    }
}

/// Joins two path fragments with exactly one `/` between them.
///
/// An empty side yields the other side unchanged.
pub fn path_join(left: &str, right: &str) -> String {
    if left.is_empty() {
        return right.to_string();
    }
    if right.is_empty() {
        return left.to_string();
    }
    let head = if left == "/" { "" } else { left.trim_end_matches('/') };
    let tail = right.trim_start_matches('/');
    let mut out = String::with_capacity(head.len() + tail.len() + 1);
    out.push_str(head);
    out.push('/');
    out.push_str(tail);
    out
}

/// Byte payload of a binary cell.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct BinBuf {
    bytes: Vec<u8>,
}

impl BinBuf {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    pub fn concat(left: &[u8], right: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(left.len() + right.len());
        bytes.extend_from_slice(left);
        bytes.extend_from_slice(right);
        Self { bytes }
    }
}
