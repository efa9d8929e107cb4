//! Offset lists for column groups that only store a subset of positions.
//!
//! Map index `i` refers to position `offsets[i]`, so the map never has to materialize the
//! positions it does not cover.

use crate::block::MatrixBlock;
use crate::error::{MapError, MapResult};
use crate::preagg::CodeSource;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OffsetList {
    offsets: Vec<u32>,
}

impl OffsetList {
    /// Offsets must be strictly increasing.
    pub fn new(offsets: Vec<u32>) -> MapResult<Self> {
        if let Some(w) = offsets.windows(2).find(|w| w[0] >= w[1]) {
            return Err(MapError::InvalidOffsets(format!(
                "offsets must be strictly increasing, found {} followed by {}",
                w[0], w[1]
            )));
        }
        Ok(Self { offsets })
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    /// Map indexes whose offsets fall in `cl..cu`.
    fn index_range(&self, cl: usize, cu: usize) -> std::ops::Range<usize> {
        let lo = self.offsets.partition_point(|&o| (o as usize) < cl);
        let hi = self.offsets.partition_point(|&o| (o as usize) < cu);
        lo..hi.max(lo)
    }

    fn check(&self, m: &MatrixBlock, rl: usize, ru: usize) -> MapResult<()> {
        if rl > ru || ru > m.rows() {
            return Err(MapError::InvalidBlock(format!(
                "row range {rl}..{ru} outside of {} rows",
                m.rows()
            )));
        }
        if let Some(&last) = self.offsets.last() {
            if last as usize >= m.cols() {
                return Err(MapError::InvalidOffsets(format!(
                    "offset {last} outside of {} columns",
                    m.cols()
                )));
            }
        }
        Ok(())
    }

    /// Dense pre-aggregation through the offsets.
    ///
    /// For each row `r in rl..ru` and each map index `i` with `cl <= offsets[i] < cu`, adds
    /// `m[r][offsets[i]]` to `pre_av[(r - rl) * n_val + code(i)]`. Works for both contiguous and
    /// row-blocked dense storage.
    #[allow(clippy::too_many_arguments)]
    pub fn pre_aggregate_dense_map<C: CodeSource + ?Sized>(
        &self,
        m: &MatrixBlock,
        pre_av: &mut [f64],
        rl: usize,
        ru: usize,
        cl: usize,
        cu: usize,
        n_val: usize,
        codes: &C,
    ) -> MapResult<()> {
        self.check(m, rl, ru)?;
        let db = m.dense_block().ok_or(MapError::NotImplemented(
            "dense offset pre-aggregation over sparse storage",
        ))?;
        let cols = m.cols();
        let indexes = self.index_range(cl, cu);

        for r in rl..ru {
            let base = (r - rl) * n_val;
            for i in indexes.clone() {
                let col = self.offsets[i] as usize;
                pre_av[base + codes.code(i) as usize] += db.get(r, col, cols);
            }
        }
        Ok(())
    }

    /// Sparse pre-aggregation through the offsets.
    ///
    /// Stored entries of row `r` whose column matches `offsets[i]` are added into
    /// `pre_av[(r - rl) * n_val + code(i)]`. Rows and offsets are both sorted, so each row is a
    /// single merge pass.
    pub fn pre_aggregate_sparse_map<C: CodeSource + ?Sized>(
        &self,
        m: &MatrixBlock,
        pre_av: &mut [f64],
        rl: usize,
        ru: usize,
        n_val: usize,
        codes: &C,
    ) -> MapResult<()> {
        self.check(m, rl, ru)?;
        let sb = m.sparse_block().ok_or(MapError::NotImplemented(
            "sparse offset pre-aggregation over dense storage",
        ))?;

        for r in rl..ru {
            if sb.is_empty_row(r) {
                continue;
            }
            let (cols, values) = sb.row(r);
            let base = (r - rl) * n_val;
            let (mut i, mut j) = (0, 0);
            while i < self.offsets.len() && j < cols.len() {
                match self.offsets[i].cmp(&cols[j]) {
                    std::cmp::Ordering::Less => i += 1,
                    std::cmp::Ordering::Greater => j += 1,
                    std::cmp::Ordering::Equal => {
                        pre_av[base + codes.code(i) as usize] += values[j];
                        i += 1;
                        j += 1;
                    }
                }
            }
        }
        Ok(())
    }
}
