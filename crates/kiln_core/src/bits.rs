//! Word-packed bit set keyed by cell index.

#[derive(Clone, Debug, Default)]
pub struct BitSet {
    words: Vec<u64>,
}

impl BitSet {
    pub fn new() -> Self {
        Self { words: Vec::new() }
    }

    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        let word = index >> 6;
        let bit = index & 63;
        self.words
            .get(word)
            .is_some_and(|w| (w & (1 << bit)) != 0)
    }

    /// Sets the bit; returns `false` if it was already set.
    #[inline]
    pub fn insert(&mut self, index: usize) -> bool {
        let word = index >> 6;
        let bit = index & 63;
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let w = &mut self.words[word];
        let mask = 1 << bit;
        if (*w & mask) != 0 {
            return false;
        }
        *w |= mask;
        true
    }

    #[inline]
    pub fn remove(&mut self, index: usize) {
        let word = index >> 6;
        let bit = index & 63;
        if let Some(w) = self.words.get_mut(word) {
            *w &= !(1 << bit);
        }
    }

    /// Clears every bit but keeps the word buffer for the next cycle.
    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
    }

    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}
