//! Raw (uncompressed) matrix storage consumed by the pre-aggregation kernels.

use crate::error::{MapError, MapResult};

/// Dense row-major storage.
///
/// Large matrices may be split into row blocks, in which case there is no single contiguous
/// value array to stride over.
#[derive(Clone, Debug, PartialEq)]
pub enum DenseBlock {
    Contiguous {
        values: Vec<f64>,
    },
    Blocked {
        blocks: Vec<Vec<f64>>,
        rows_per_block: usize,
    },
}

impl DenseBlock {
    pub fn is_contiguous(&self) -> bool {
        matches!(self, DenseBlock::Contiguous { .. })
    }

    /// The flat row-major value array, if the block is contiguous.
    pub fn values(&self) -> Option<&[f64]> {
        match self {
            DenseBlock::Contiguous { values } => Some(values),
            DenseBlock::Blocked { .. } => None,
        }
    }

    pub fn get(&self, row: usize, col: usize, cols: usize) -> f64 {
        match self {
            DenseBlock::Contiguous { values } => values[row * cols + col],
            DenseBlock::Blocked {
                blocks,
                rows_per_block,
            } => blocks[row / rows_per_block][(row % rows_per_block) * cols + col],
        }
    }
}

/// Compressed sparse row storage.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseBlock {
    row_ptr: Vec<usize>,
    col_idx: Vec<u32>,
    values: Vec<f64>,
}

impl SparseBlock {
    pub fn new(row_ptr: Vec<usize>, col_idx: Vec<u32>, values: Vec<f64>) -> MapResult<Self> {
        if row_ptr.first() != Some(&0) {
            return Err(MapError::InvalidBlock("row_ptr must start at 0".to_string()));
        }
        if row_ptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(MapError::InvalidBlock(
                "row_ptr must be non-decreasing".to_string(),
            ));
        }
        if row_ptr.last() != Some(&col_idx.len()) || col_idx.len() != values.len() {
            return Err(MapError::InvalidBlock(format!(
                "row_ptr ends at {:?} but there are {} column indexes and {} values",
                row_ptr.last(),
                col_idx.len(),
                values.len()
            )));
        }
        for w in row_ptr.windows(2) {
            if col_idx[w[0]..w[1]].windows(2).any(|c| c[0] >= c[1]) {
                return Err(MapError::InvalidBlock(
                    "column indexes must be strictly increasing within a row".to_string(),
                ));
            }
        }
        Ok(Self {
            row_ptr,
            col_idx,
            values,
        })
    }

    pub fn rows(&self) -> usize {
        self.row_ptr.len() - 1
    }

    pub fn is_empty_row(&self, row: usize) -> bool {
        self.row_ptr[row] == self.row_ptr[row + 1]
    }

    /// Column indexes and values stored for `row`.
    pub fn row(&self, row: usize) -> (&[u32], &[f64]) {
        let (start, end) = (self.row_ptr[row], self.row_ptr[row + 1]);
        (&self.col_idx[start..end], &self.values[start..end])
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Storage {
    Dense(DenseBlock),
    Sparse(SparseBlock),
}

#[derive(Clone, Debug, PartialEq)]
pub struct MatrixBlock {
    rows: usize,
    cols: usize,
    storage: Storage,
}

impl MatrixBlock {
    pub fn dense(rows: usize, cols: usize, values: Vec<f64>) -> MapResult<Self> {
        if values.len() != rows * cols {
            return Err(MapError::InvalidBlock(format!(
                "expected {} dense values for a {rows}x{cols} block, got {}",
                rows * cols,
                values.len()
            )));
        }
        Ok(Self {
            rows,
            cols,
            storage: Storage::Dense(DenseBlock::Contiguous { values }),
        })
    }

    /// Build a dense block split into row blocks of `rows_per_block` rows.
    pub fn dense_blocked(
        rows: usize,
        cols: usize,
        values: Vec<f64>,
        rows_per_block: usize,
    ) -> MapResult<Self> {
        if rows_per_block == 0 {
            return Err(MapError::InvalidBlock(
                "rows_per_block must be positive".to_string(),
            ));
        }
        if values.len() != rows * cols {
            return Err(MapError::InvalidBlock(format!(
                "expected {} dense values for a {rows}x{cols} block, got {}",
                rows * cols,
                values.len()
            )));
        }
        let blocks = if cols == 0 {
            Vec::new()
        } else {
            values
                .chunks(rows_per_block * cols)
                .map(|chunk| chunk.to_vec())
                .collect()
        };
        Ok(Self {
            rows,
            cols,
            storage: Storage::Dense(DenseBlock::Blocked {
                blocks,
                rows_per_block,
            }),
        })
    }

    pub fn sparse(rows: usize, cols: usize, block: SparseBlock) -> MapResult<Self> {
        if block.rows() != rows {
            return Err(MapError::InvalidBlock(format!(
                "sparse block has {} rows, expected {rows}",
                block.rows()
            )));
        }
        if block.col_idx.iter().any(|&c| c as usize >= cols) {
            return Err(MapError::InvalidBlock(format!(
                "sparse column index out of range for {cols} columns"
            )));
        }
        Ok(Self {
            rows,
            cols,
            storage: Storage::Sparse(block),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn dense_block(&self) -> Option<&DenseBlock> {
        match &self.storage {
            Storage::Dense(db) => Some(db),
            Storage::Sparse(_) => None,
        }
    }

    pub fn sparse_block(&self) -> Option<&SparseBlock> {
        match &self.storage {
            Storage::Sparse(sb) => Some(sb),
            Storage::Dense(_) => None,
        }
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        match &self.storage {
            Storage::Dense(db) => db.get(row, col, self.cols),
            Storage::Sparse(sb) => {
                let (cols, values) = sb.row(row);
                cols.binary_search(&(col as u32))
                    .map_or(0.0, |idx| values[idx])
            }
        }
    }
}
