#![forbid(unsafe_code)]

/// A fixed-length bit vector backing the 1-bit row→code map.
///
/// Bits are stored little-endian within each `u64` word:
/// - bit 0 is the LSB of word 0
/// - bit 63 is the MSB of word 0
///
/// The word buffer always holds exactly `ceil(len / 64)` words and bits at positions `>= len`
/// are kept at zero, so word-level population counts never see padding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BitVec {
    words: Vec<u64>,
    len: usize,
    ones: usize,
}

pub(crate) const WORD_BITS: usize = 64;

pub(crate) fn words_for(bits: usize) -> usize {
    (bits + WORD_BITS - 1) / WORD_BITS
}

fn tail_mask(len: usize) -> u64 {
    match len % WORD_BITS {
        0 => u64::MAX,
        rem => (1u64 << rem) - 1,
    }
}

impl BitVec {
    pub fn with_len_all_false(bits: usize) -> Self {
        Self {
            words: vec![0u64; words_for(bits)],
            len: bits,
            ones: 0,
        }
    }

    pub fn with_len_all_true(bits: usize) -> Self {
        let mut out = Self::with_len_all_false(bits);
        out.set_all();
        out
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> bool {
        debug_assert!(index < self.len, "BitVec index out of bounds");
        let word = self.words[index / WORD_BITS];
        let bit = index % WORD_BITS;
        ((word >> bit) & 1) == 1
    }

    pub fn set(&mut self, index: usize, value: bool) {
        debug_assert!(index < self.len, "BitVec index out of bounds");
        let word_idx = index / WORD_BITS;
        let mask = 1u64 << (index % WORD_BITS);
        let was_set = (self.words[word_idx] & mask) != 0;

        match (was_set, value) {
            (true, false) => {
                self.words[word_idx] &= !mask;
                self.ones -= 1;
            }
            (false, true) => {
                self.words[word_idx] |= mask;
                self.ones += 1;
            }
            _ => {}
        }
    }

    /// Set every bit in `0..len`.
    pub fn set_all(&mut self) {
        for w in &mut self.words {
            *w = u64::MAX;
        }
        if let Some(last) = self.words.last_mut() {
            *last &= tail_mask(self.len);
        }
        self.ones = self.len;
    }

    pub fn clear_all(&mut self) {
        for w in &mut self.words {
            *w = 0;
        }
        self.ones = 0;
    }

    pub fn count_ones(&self) -> usize {
        self.ones
    }

    pub fn as_words(&self) -> &[u64] {
        &self.words
    }

    /// The word buffer without its trailing all-zero words.
    ///
    /// This is the form persisted on disk and the form the join kernels consume, so two vectors
    /// of the same length can expose word slices of different lengths.
    pub fn significant_words(&self) -> &[u64] {
        let end = self
            .words
            .iter()
            .rposition(|w| *w != 0)
            .map_or(0, |idx| idx + 1);
        &self.words[..end]
    }

    /// Reconstruct a [`BitVec`] from a (possibly trimmed) word buffer and a bit length.
    ///
    /// Missing trailing words are treated as zero. Returns `None` if `words` has more words than
    /// `len` needs or if any bit at a position `>= len` is set.
    pub fn from_words(mut words: Vec<u64>, len: usize) -> Option<Self> {
        let word_len = words_for(len);
        if words.len() > word_len {
            return None;
        }
        if words.len() == word_len {
            if let Some(last) = words.last() {
                if last & !tail_mask(len) != 0 {
                    return None;
                }
            }
        }
        words.resize(word_len, 0);
        let ones = words.iter().map(|w| w.count_ones() as usize).sum();
        Some(Self { words, len, ones })
    }
}
