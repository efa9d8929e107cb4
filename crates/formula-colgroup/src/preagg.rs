//! Pre-aggregation of uncompressed matrix values into per-code buckets.
//!
//! The map positions of a column group line up with the *columns* of the matrix being
//! aggregated (the left operand of a matrix multiply). Output is laid out `[row - rl][code]`.

use crate::bitmap::BitVec;
use crate::block::{DenseBlock, MatrixBlock};
use crate::error::{MapError, MapResult};

/// Per-index code lookup over the raw storage of a map.
pub trait CodeSource {
    fn code(&self, index: usize) -> u32;
}

impl CodeSource for BitVec {
    #[inline]
    fn code(&self, index: usize) -> u32 {
        self.get(index) as u32
    }
}

impl CodeSource for [u32] {
    #[inline]
    fn code(&self, index: usize) -> u32 {
        self[index]
    }
}

pub(crate) fn check_extents(
    m: &MatrixBlock,
    map_size: usize,
    rl: usize,
    ru: usize,
    cl: usize,
    cu: usize,
) -> MapResult<()> {
    if rl > ru || ru > m.rows() {
        return Err(MapError::InvalidBlock(format!(
            "row range {rl}..{ru} outside of {} rows",
            m.rows()
        )));
    }
    if cl > cu || cu > m.cols() {
        return Err(MapError::InvalidBlock(format!(
            "column range {cl}..{cu} outside of {} columns",
            m.cols()
        )));
    }
    if cu > map_size {
        return Err(MapError::OutOfBounds {
            pos: cu - 1,
            size: map_size,
        });
    }
    Ok(())
}

/// Row-block kernel over contiguous dense storage.
///
/// For each column `c in cl..cu` the matching strided positions of rows `rl..ru` are added into
/// the bucket of `c`'s code. Output slots of consecutive rows are `n_val` apart.
#[allow(clippy::too_many_arguments)]
pub(crate) fn dense_rows<C: CodeSource + ?Sized>(
    codes: &C,
    n_val: usize,
    m: &MatrixBlock,
    pre_av: &mut [f64],
    rl: usize,
    ru: usize,
    cl: usize,
    cu: usize,
) -> MapResult<()> {
    let values = m
        .dense_block()
        .and_then(DenseBlock::values)
        .ok_or(MapError::NotImplemented(
            "row-block dense pre-aggregation over non-contiguous storage",
        ))?;
    if cl >= cu || rl >= ru {
        return Ok(());
    }

    let n_col = m.cols();
    for c in cl..cu {
        let idx = codes.code(c) as usize;
        let start = c + n_col * rl;
        let end = c + n_col * ru;
        let mut off_out = idx;
        for off in (start..end).step_by(n_col) {
            pre_av[off_out] += values[off];
            off_out += n_val;
        }
    }
    Ok(())
}

/// Single-row kernel: `pre_av[code(c)] += mv[off + c]` for `c in cl..cu`.
pub(crate) fn dense_to_row<C: CodeSource + ?Sized>(
    codes: &C,
    map_size: usize,
    mv: &[f64],
    off: usize,
    pre_av: &mut [f64],
    cl: usize,
    cu: usize,
) -> MapResult<()> {
    if cl > cu {
        return Err(MapError::InvalidBlock(format!("column range {cl}..{cu} is reversed")));
    }
    if cu > map_size {
        return Err(MapError::OutOfBounds {
            pos: cu - 1,
            size: map_size,
        });
    }
    let row = off
        .checked_add(cu)
        .and_then(|end| mv.get(off + cl..end))
        .ok_or_else(|| {
            MapError::InvalidBlock(format!(
                "row at offset {off} with columns {cl}..{cu} outside of {} values",
                mv.len()
            ))
        })?;

    for (c, v) in (cl..cu).zip(row) {
        pre_av[codes.code(c) as usize] += *v;
    }
    Ok(())
}
