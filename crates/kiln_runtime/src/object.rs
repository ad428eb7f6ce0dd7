//! Hybrid object records.
//!
//! Every record carries two facets at once:
//! - a string-keyed map using open addressing with linear probing, where
//!   removal leaves a tombstone so probe chains stay intact
//! - an integer-indexed array split into a dense deque prefix and a sparse
//!   overflow map for indices past the first hole
//!
//! Array invariant: every sparse key lies in `[dense.len(), len)`. After any
//! mutation that grows the dense prefix, entries that have become contiguous
//! are pulled out of the sparse map.

use std::collections::VecDeque;
use std::hash::{BuildHasher, Hasher};

use ahash::RandomState;
use hashbrown::HashMap;

use crate::core::Value;

const INITIAL_BUCKETS: usize = 7;

/// Map key holding a formatter's template string.
pub const FORMAT_KEY: &str = "_format";

#[inline]
fn fast_hasher() -> RandomState {
    RandomState::with_seeds(0, 0, 0, 0)
}

/// Stable hash of a map key; identical across records and runs.
pub fn hash_key(key: &str) -> u64 {
    let mut hasher = fast_hasher().build_hasher();
    hasher.write(key.as_bytes());
    hasher.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordMode {
    #[default]
    Plain,
    /// A pending `template % args` expression. The template lives under
    /// `FORMAT_KEY`; arguments are the array facet in order.
    Formatter,
}

#[derive(Debug, Clone, Default)]
enum Bucket {
    #[default]
    Empty,
    Tombstone,
    Full {
        hash: u64,
        key: Box<str>,
        value: Value,
    },
}

#[derive(Debug, thiserror::Error, Clone, Copy, PartialEq, Eq)]
#[error("index {index} out of range for length {len}")]
pub struct IndexOutOfRange {
    pub index: i64,
    pub len: usize,
}

#[derive(Debug, Clone)]
pub struct ObjectRecord {
    buckets: Vec<Bucket>,
    live: usize,
    tombstones: usize,
    dense: VecDeque<Value>,
    sparse: HashMap<usize, Value, RandomState>,
    len: usize,
    mode: RecordMode,
}

impl Default for ObjectRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectRecord {
    pub fn new() -> Self {
        Self {
            buckets: Vec::new(),
            live: 0,
            tombstones: 0,
            dense: VecDeque::new(),
            sparse: HashMap::with_hasher(fast_hasher()),
            len: 0,
            mode: RecordMode::Plain,
        }
    }

    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        let mut record = Self::new();
        record.dense.extend(values);
        record.len = record.dense.len();
        record
    }

    pub fn formatter(template: Value) -> Self {
        let mut record = Self::new();
        record.mode = RecordMode::Formatter;
        record.set(FORMAT_KEY, template);
        record
    }

    #[inline]
    pub fn mode(&self) -> RecordMode {
        self.mode
    }

    #[inline]
    pub fn is_formatter(&self) -> bool {
        self.mode == RecordMode::Formatter
    }

    pub fn template(&self) -> Option<Value> {
        if self.is_formatter() { self.get(FORMAT_KEY) } else { None }
    }

    // ---- map facet ----

    pub fn map_len(&self) -> usize {
        self.live
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn tombstones(&self) -> usize {
        self.tombstones
    }

    fn find(&self, key: &str, hash: u64) -> Option<usize> {
        let cap = self.buckets.len();
        if cap == 0 {
            return None;
        }
        let mut i = (hash % cap as u64) as usize;
        for _ in 0..cap {
            match &self.buckets[i] {
                Bucket::Empty => return None,
                Bucket::Full { hash: h, key: k, .. } if *h == hash && **k == *key => {
                    return Some(i);
                }
                _ => {}
            }
            i = (i + 1) % cap;
        }
        None
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let i = self.find(key, hash_key(key))?;
        match &self.buckets[i] {
            Bucket::Full { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.find(key, hash_key(key)).is_some()
    }

    /// Inserts or overwrites. A fresh key lands in the first free or
    /// tombstoned bucket on its probe path.
    pub fn set(&mut self, key: &str, value: Value) {
        let hash = hash_key(key);
        if let Some(i) = self.find(key, hash) {
            if let Bucket::Full { value: slot, .. } = &mut self.buckets[i] {
                *slot = value;
            }
            return;
        }
        self.reserve_one();
        let cap = self.buckets.len();
        let mut i = (hash % cap as u64) as usize;
        loop {
            match &self.buckets[i] {
                Bucket::Empty => break,
                Bucket::Tombstone => {
                    self.tombstones -= 1;
                    break;
                }
                Bucket::Full { .. } => i = (i + 1) % cap,
            }
        }
        self.buckets[i] = Bucket::Full {
            hash,
            key: key.into(),
            value,
        };
        self.live += 1;
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let i = self.find(key, hash_key(key))?;
        match std::mem::replace(&mut self.buckets[i], Bucket::Tombstone) {
            Bucket::Full { value, .. } => {
                self.live -= 1;
                self.tombstones += 1;
                Some(value)
            }
            other => {
                self.buckets[i] = other;
                None
            }
        }
    }

    /// Keeps the load (live plus tombstones) under three quarters.
    fn reserve_one(&mut self) {
        let cap = self.buckets.len();
        if cap != 0 && (self.live + self.tombstones + 1) * 4 <= cap * 3 {
            return;
        }
        let new_cap = if cap == 0 {
            INITIAL_BUCKETS
        } else if (self.live + 1) * 2 <= cap {
            // Mostly tombstones: rebuild at the same size.
            cap
        } else {
            cap * 2 + 1
        };
        self.rehash(new_cap);
    }

    fn rehash(&mut self, new_cap: usize) {
        let old = std::mem::replace(&mut self.buckets, vec![Bucket::Empty; new_cap]);
        self.tombstones = 0;
        for bucket in old {
            if let Bucket::Full { hash, key, value } = bucket {
                let mut i = (hash % new_cap as u64) as usize;
                while !matches!(self.buckets[i], Bucket::Empty) {
                    i = (i + 1) % new_cap;
                }
                self.buckets[i] = Bucket::Full { hash, key, value };
            }
        }
    }

    /// Keys in bucket order.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries().map(|(k, _)| k)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, Value)> + '_ {
        self.buckets.iter().filter_map(|b| match b {
            Bucket::Full { key, value, .. } => Some((&**key, *value)),
            _ => None,
        })
    }

    // ---- array facet ----

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn dense_len(&self) -> usize {
        self.dense.len()
    }

    pub fn sparse_len(&self) -> usize {
        self.sparse.len()
    }

    fn resolve(&self, index: i64) -> Option<usize> {
        if index < 0 {
            let wrapped = self.len as i64 + index;
            (wrapped >= 0).then_some(wrapped as usize)
        } else {
            Some(index as usize)
        }
    }

    fn slot(&self, i: usize) -> Option<Value> {
        if i < self.dense.len() {
            self.dense.get(i).copied()
        } else {
            self.sparse.get(&i).copied()
        }
    }

    /// `None` for a hole or an index past the end. Negative indices count
    /// from the end.
    pub fn index_get(&self, index: i64) -> Option<Value> {
        self.resolve(index).and_then(|i| self.slot(i))
    }

    pub fn index_set(&mut self, index: i64, value: Value) -> Result<(), IndexOutOfRange> {
        let i = self.resolve(index).ok_or(IndexOutOfRange {
            index,
            len: self.len,
        })?;
        if i < self.dense.len() {
            self.dense[i] = value;
        } else if i == self.dense.len() {
            self.sparse.remove(&i);
            self.dense.push_back(value);
            self.densify();
        } else {
            self.sparse.insert(i, value);
        }
        self.len = self.len.max(i + 1);
        Ok(())
    }

    fn densify(&mut self) {
        while let Some(v) = self.sparse.remove(&self.dense.len()) {
            self.dense.push_back(v);
        }
    }

    fn rekey_sparse(&mut self, shift_down: bool) {
        if self.sparse.is_empty() {
            return;
        }
        let old = std::mem::replace(&mut self.sparse, HashMap::with_hasher(fast_hasher()));
        self.sparse.extend(
            old.into_iter()
                .map(|(k, v)| (if shift_down { k - 1 } else { k + 1 }, v)),
        );
    }

    pub fn push(&mut self, value: Value) {
        let i = self.len;
        if i == self.dense.len() {
            self.dense.push_back(value);
        } else {
            self.sparse.insert(i, value);
        }
        self.len += 1;
    }

    /// Removes the last element. A hole pops as `Undefined`.
    pub fn pop(&mut self) -> Option<Value> {
        if self.len == 0 {
            return None;
        }
        let last = self.len - 1;
        self.len = last;
        if last < self.dense.len() {
            return self.dense.pop_back();
        }
        Some(self.sparse.remove(&last).unwrap_or_default())
    }

    /// Removes the first element, moving every later index down by one.
    pub fn shift(&mut self) -> Option<Value> {
        if self.len == 0 {
            return None;
        }
        let first = self.dense.pop_front().unwrap_or_default();
        self.rekey_sparse(true);
        self.len -= 1;
        self.densify();
        Some(first)
    }

    pub fn unshift(&mut self, value: Value) {
        self.dense.push_front(value);
        self.rekey_sparse(false);
        self.len += 1;
        self.densify();
    }

    /// A new record holding elements `[start, len)`, holes preserved.
    pub fn slice_from(&self, start: i64) -> ObjectRecord {
        let len = self.len as i64;
        let start = if start < 0 {
            (len + start).max(0)
        } else {
            start.min(len)
        } as usize;
        let mut out = ObjectRecord::new();
        out.dense.extend(self.dense.iter().skip(start).copied());
        for (&k, &v) in &self.sparse {
            if k >= start {
                out.sparse.insert(k - start, v);
            }
        }
        out.len = self.len - start;
        out.densify();
        out
    }

    /// The contiguous prefix of the array facet.
    pub fn dense_values(&self) -> impl Iterator<Item = Value> + '_ {
        self.dense.iter().copied()
    }

    /// Sparse entries ordered by index.
    pub fn sparse_entries(&self) -> Vec<(usize, Value)> {
        let mut entries: Vec<_> = self.sparse.iter().map(|(&k, &v)| (k, v)).collect();
        entries.sort_unstable_by_key(|&(k, _)| k);
        entries
    }

    /// Every value held by either facet; the collector's view of the record.
    pub fn values(&self) -> impl Iterator<Item = Value> + '_ {
        self.entries()
            .map(|(_, v)| v)
            .chain(self.dense.iter().copied())
            .chain(self.sparse.values().copied())
    }
}
