//! Row→code maps for dictionary-compressed column groups.
//!
//! A column group compresses a set of matrix columns by replacing every row with a code into a
//! shared dictionary of distinct value-combinations. This crate provides:
//! - Row→code maps, with a 1-bit specialization for groups that have at most two codes.
//! - A stable big-endian binary encoding for persisted maps.
//! - Pre-aggregation kernels that fold raw matrix values into per-code buckets.
//! - DDC joins that combine two column groups without decompressing either, using word-level
//!   population counts when both sides are 1-bit maps.

#![forbid(unsafe_code)]

mod bitmap;
mod block;
mod dictionary;
mod error;
mod join;
mod mapping;
mod offset;
mod preagg;

pub use crate::bitmap::BitVec;
pub use crate::block::{DenseBlock, MatrixBlock, SparseBlock};
pub use crate::dictionary::{Dictionary, ValueDictionary};
pub use crate::error::{MapError, MapResult};
pub use crate::join::{ddc_multi_col_fallback, ddc_single_col_fallback, join_counts, JoinCounts};
pub use crate::mapping::{
    builder_for, estimate_in_memory_size, read_map, MapBuilder, MapToBit, MapToBitBuilder,
    MapToData, MapToInt, MapToIntBuilder, MapType, RowCodes,
};
pub use crate::offset::OffsetList;
pub use crate::preagg::CodeSource;
