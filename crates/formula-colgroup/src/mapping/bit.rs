use super::{check_same_size, read_len, write_header, MapToData, MapType, RowCodes};
use crate::bitmap::{words_for, BitVec};
use crate::block::MatrixBlock;
use crate::dictionary::Dictionary;
use crate::error::{MapError, MapResult};
use crate::join::{self, JoinCounts};
use crate::offset::OffsetList;
use crate::preagg;
use std::io::{Read, Write};

/// Fixed bytes of the serialized form: tag, unique, size, word count.
const HEADER_BYTES: u64 = 1 + 4 + 4 + 4;

/// Row→code map for column groups with at most two distinct codes, one bit per row.
///
/// A set bit is code 1, a clear bit code 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapToBit {
    unique: u32,
    bits: BitVec,
}

/// Build/merge phase of a [`MapToBit`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapToBitBuilder {
    unique: u32,
    bits: BitVec,
}

impl MapToBitBuilder {
    /// All rows start at code 0. `unique` is clamped to `1..=2`.
    pub fn new(unique: u32, size: usize) -> Self {
        Self {
            unique: unique.clamp(1, 2),
            bits: BitVec::with_len_all_false(size),
        }
    }

    pub fn size(&self) -> usize {
        self.bits.len()
    }

    pub fn unique(&self) -> u32 {
        self.unique
    }

    pub fn get_index(&self, pos: usize) -> u32 {
        self.bits.get(pos) as u32
    }

    pub fn set(&mut self, pos: usize, code: u32) -> MapResult<()> {
        if code > 1 {
            return Err(MapError::InvalidCode {
                code,
                upper_bound: 1,
            });
        }
        if pos >= self.bits.len() {
            return Err(MapError::OutOfBounds {
                pos,
                size: self.bits.len(),
            });
        }
        self.bits.set(pos, code == 1);
        Ok(())
    }

    /// Sets **every row to code 1, whatever `code` is**.
    ///
    /// `fill(0)` therefore yields an all-ones map rather than an all-zeros one. Existing column
    /// groups were written with this behaviour, so callers that want all zeros must use
    /// `replace(1, 0)` instead.
    pub fn fill(&mut self, _code: u32) {
        self.bits.set_all();
    }

    /// Swap the two codes wholesale: `replace(0, 1)` sets every row to 1, `replace(1, 0)` sets
    /// every row to 0. Any other pair is rejected.
    pub fn replace(&mut self, from: u32, to: u32) -> MapResult<()> {
        match (from, to) {
            (0, 1) => self.bits.set_all(),
            (1, 0) => self.bits.clear_all(),
            _ => return Err(MapError::InvalidReplace { from, to }),
        }
        Ok(())
    }

    pub fn finish(self) -> MapToBit {
        log::debug!(
            "finished 1-bit map: {} rows, {} set",
            self.bits.len(),
            self.bits.count_ones()
        );
        MapToBit {
            unique: self.unique,
            bits: self.bits,
        }
    }
}

impl MapToBit {
    pub fn builder(unique: u32, size: usize) -> MapToBitBuilder {
        MapToBitBuilder::new(unique, size)
    }

    pub fn into_builder(self) -> MapToBitBuilder {
        MapToBitBuilder {
            unique: self.unique,
            bits: self.bits,
        }
    }

    pub fn bits(&self) -> &BitVec {
        &self.bits
    }

    pub fn estimate_in_memory_size(size: usize) -> u64 {
        std::mem::size_of::<MapToBit>() as u64 + 8 * words_for(size) as u64
    }

    pub fn in_memory_size(&self) -> u64 {
        Self::estimate_in_memory_size(self.bits.len())
    }

    /// Header plus `floor(size / 64)` words.
    ///
    /// This leaves out the final partial word, so it undercounts by 8 bytes whenever `size` is
    /// not a multiple of 64 and that word holds a set bit. Use [`MapToBit::serialized_len`] to
    /// size buffers.
    pub fn exact_size_on_disk(&self) -> u64 {
        HEADER_BYTES + (self.bits.len() / 64) as u64 * 8
    }

    pub fn serialized_len(&self) -> u64 {
        HEADER_BYTES + self.bits.significant_words().len() as u64 * 8
    }

    /// Tag, unique, size, word count, then the words with trailing zero words omitted. All
    /// integers are big-endian.
    pub fn write<W: Write>(&self, out: &mut W) -> MapResult<()> {
        let words = self.bits.significant_words();
        write_header(out, MapType::Bit, self.unique, self.bits.len())?;
        out.write_all(&(words.len() as i32).to_be_bytes())?;
        for w in words {
            out.write_all(&w.to_be_bytes())?;
        }
        Ok(())
    }

    /// Read everything after the tag byte.
    pub(crate) fn read_fields<R: Read>(input: &mut R) -> MapResult<Self> {
        let unique = read_len(input, "unique count")?;
        if !(1..=2).contains(&unique) {
            return Err(MapError::Corrupt(format!(
                "1-bit map with {unique} distinct codes"
            )));
        }
        let unique = unique as u32;
        let size = read_len(input, "row count")?;
        let word_count = read_len(input, "word count")?;
        if word_count > words_for(size) {
            return Err(MapError::Corrupt(format!(
                "{word_count} words for {size} rows"
            )));
        }

        let mut words = Vec::with_capacity(word_count.min(1 << 12));
        let mut buf = [0u8; 8];
        for _ in 0..word_count {
            input.read_exact(&mut buf)?;
            words.push(u64::from_be_bytes(buf));
        }

        let bits = BitVec::from_words(words, size).ok_or_else(|| {
            MapError::Corrupt(format!("bit set past the last of {size} rows"))
        })?;
        Ok(Self { unique, bits })
    }

    pub fn pre_aggregate_dense_to_row(
        &self,
        mv: &[f64],
        off: usize,
        pre_av: &mut [f64],
        cl: usize,
        cu: usize,
    ) -> MapResult<()> {
        preagg::dense_to_row(&self.bits, self.size(), mv, off, pre_av, cl, cu)
    }

    /// Row-block pre-aggregation over contiguous dense storage.
    ///
    /// `pre_av` is laid out `[row - rl][code]` with `unique` slots per row. Fails with
    /// [`MapError::NotImplemented`] for blocked or sparse storage, before touching `pre_av`.
    pub fn pre_aggregate_dense_rows(
        &self,
        m: &MatrixBlock,
        pre_av: &mut [f64],
        rl: usize,
        ru: usize,
        cl: usize,
        cu: usize,
    ) -> MapResult<()> {
        preagg::check_extents(m, self.size(), rl, ru, cl, cu)?;
        preagg::dense_rows(
            &self.bits,
            self.unique as usize,
            m,
            pre_av,
            rl,
            ru,
            cl,
            cu,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn pre_aggregate_dense(
        &self,
        m: &MatrixBlock,
        pre_av: &mut [f64],
        rl: usize,
        ru: usize,
        cl: usize,
        cu: usize,
        indexes: &OffsetList,
    ) -> MapResult<()> {
        check_same_size(self.size(), indexes.len())?;
        indexes.pre_aggregate_dense_map(
            m,
            pre_av,
            rl,
            ru,
            cl,
            cu,
            self.unique as usize,
            &self.bits,
        )
    }

    pub fn pre_aggregate_sparse(
        &self,
        m: &MatrixBlock,
        pre_av: &mut [f64],
        rl: usize,
        ru: usize,
        indexes: &OffsetList,
    ) -> MapResult<()> {
        check_same_size(self.size(), indexes.len())?;
        indexes.pre_aggregate_sparse_map(m, pre_av, rl, ru, self.unique as usize, &self.bits)
    }

    /// Contingency table with `other` as `t` and `self` as `o`.
    pub fn join_counts(&self, other: &MapToBit) -> MapResult<JoinCounts> {
        check_same_size(self.size(), other.size())?;
        Ok(join::join_counts(
            other.bits.significant_words(),
            self.bits.significant_words(),
            self.size(),
        ))
    }

    /// The bitwise join addresses both codes of each side, so it needs two codes on each.
    fn bitwise_join_with(&self, other: &MapToData) -> Option<JoinCounts> {
        match other {
            MapToData::Bit(tm) if self.unique == 2 && tm.unique == 2 => self.join_counts(tm).ok(),
            _ => None,
        }
    }

    pub fn pre_aggregate_ddc_single_col<D: Dictionary + ?Sized>(
        &self,
        other: &MapToData,
        dict: &D,
        ret: &mut [f64],
    ) -> MapResult<()> {
        check_same_size(self.size(), other.size())?;
        match self.bitwise_join_with(other) {
            Some(counts) => {
                log::trace!("bitwise single-column join over {} rows", self.size());
                join::ddc_single_col_bits(counts, dict.values(), ret);
            }
            None => {
                log::trace!("per-row single-column join over {} rows", self.size());
                join::ddc_single_col_fallback(self, other, dict, ret);
            }
        }
        Ok(())
    }

    pub fn pre_aggregate_ddc_multi_col<D: Dictionary + ?Sized>(
        &self,
        other: &MapToData,
        dict: &D,
        ret: &mut [f64],
        n_col: usize,
    ) -> MapResult<()> {
        check_same_size(self.size(), other.size())?;
        match self.bitwise_join_with(other) {
            Some(counts) => {
                log::trace!("bitwise {n_col}-column join over {} rows", self.size());
                join::ddc_multi_col_bits(counts, dict.values(), ret, n_col);
            }
            None => {
                log::trace!("per-row {n_col}-column join over {} rows", self.size());
                join::ddc_multi_col_fallback(self, other, dict, ret, n_col);
            }
        }
        Ok(())
    }
}

impl RowCodes for MapToBit {
    fn size(&self) -> usize {
        self.bits.len()
    }

    fn unique(&self) -> u32 {
        self.unique
    }

    fn get_index(&self, pos: usize) -> u32 {
        self.bits.get(pos) as u32
    }

    fn upper_bound_value(&self) -> u32 {
        1
    }

    fn counts<'a>(&self, counts: &'a mut [usize]) -> &'a mut [usize] {
        let size = self.size();
        match &mut counts[..] {
            [] => {}
            [only] => *only = size,
            [zeros, ones, ..] => {
                *ones = self.bits.count_ones();
                *zeros = size - *ones;
            }
        }
        counts
    }
}
