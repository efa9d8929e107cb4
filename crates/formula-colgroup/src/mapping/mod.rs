//! Row→code maps.
//!
//! A column group replaces each row with a code into its dictionary. The map storing those codes
//! comes in several widths; [`builder_for`] picks the narrowest one able to hold the requested
//! number of distinct codes. Maps are mutated only through their builders and become immutable
//! once finished.

mod bit;
mod int;

pub use bit::{MapToBit, MapToBitBuilder};
pub use int::{MapToInt, MapToIntBuilder};

use crate::block::MatrixBlock;
use crate::dictionary::Dictionary;
use crate::error::{MapError, MapResult};
use crate::offset::OffsetList;
use std::io::{Read, Write};

/// Read access shared by every map width.
pub trait RowCodes {
    /// Number of rows.
    fn size(&self) -> usize;

    /// Number of distinct codes the map was built for.
    fn unique(&self) -> u32;

    fn get_index(&self, pos: usize) -> u32;

    /// Largest code the representation can hold.
    fn upper_bound_value(&self) -> u32;

    /// Per-code row frequencies written into `counts`.
    fn counts<'a>(&self, counts: &'a mut [usize]) -> &'a mut [usize] {
        counts.iter_mut().for_each(|c| *c = 0);
        for r in 0..self.size() {
            counts[self.get_index(r) as usize] += 1;
        }
        counts
    }
}

/// Type tag written as the first byte of a serialized map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MapType {
    Bit = 0,
    // 1 and 2 are the byte and char widths, which this crate does not produce.
    Int = 3,
}

impl MapType {
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> MapResult<Self> {
        match tag {
            0 => Ok(MapType::Bit),
            3 => Ok(MapType::Int),
            other => Err(MapError::UnknownMapType(other)),
        }
    }

    /// Narrowest width that can hold `unique` distinct codes.
    pub fn for_unique(unique: u32) -> Self {
        if unique <= 2 {
            MapType::Bit
        } else {
            MapType::Int
        }
    }
}

/// A finished, read-only map of any width.
#[derive(Clone, Debug, PartialEq)]
pub enum MapToData {
    Bit(MapToBit),
    Int(MapToInt),
}

/// A map in its build/merge phase.
#[derive(Clone, Debug, PartialEq)]
pub enum MapBuilder {
    Bit(MapToBitBuilder),
    Int(MapToIntBuilder),
}

/// Start building a map of `size` rows able to hold `unique` distinct codes.
pub fn builder_for(unique: u32, size: usize) -> MapBuilder {
    let map_type = MapType::for_unique(unique);
    log::debug!("allocating {map_type:?} map for {unique} codes over {size} rows");
    match map_type {
        MapType::Bit => MapBuilder::Bit(MapToBitBuilder::new(unique, size)),
        MapType::Int => MapBuilder::Int(MapToIntBuilder::new(unique, size)),
    }
}

/// Estimated heap + inline footprint of a map before it is built.
pub fn estimate_in_memory_size(unique: u32, size: usize) -> u64 {
    match MapType::for_unique(unique) {
        MapType::Bit => MapToBit::estimate_in_memory_size(size),
        MapType::Int => MapToInt::estimate_in_memory_size(size),
    }
}

/// Parse a map written by [`MapToData::write`].
pub fn read_map<R: Read>(input: &mut R) -> MapResult<MapToData> {
    let mut tag = [0u8; 1];
    input.read_exact(&mut tag)?;
    let map = match MapType::from_tag(tag[0])? {
        MapType::Bit => MapToData::Bit(MapToBit::read_fields(input)?),
        MapType::Int => MapToData::Int(MapToInt::read_fields(input)?),
    };
    log::debug!(
        "read {:?} map with {} rows and {} codes",
        map.map_type(),
        map.size(),
        map.unique()
    );
    Ok(map)
}

pub(crate) fn read_i32<R: Read>(input: &mut R) -> MapResult<i32> {
    let mut buf = [0u8; 4];
    input.read_exact(&mut buf)?;
    Ok(i32::from_be_bytes(buf))
}

pub(crate) fn read_len<R: Read>(input: &mut R, context: &str) -> MapResult<usize> {
    let v = read_i32(input)?;
    usize::try_from(v).map_err(|_| MapError::Corrupt(format!("negative {context}: {v}")))
}

pub(crate) fn write_header<W: Write>(
    out: &mut W,
    map_type: MapType,
    unique: u32,
    size: usize,
) -> MapResult<()> {
    let size_i32 = i32::try_from(size).map_err(|_| MapError::TooLarge { size })?;
    let unique_i32 = i32::try_from(unique).map_err(|_| MapError::TooManyCodes { unique })?;
    out.write_all(&[map_type.tag()])?;
    out.write_all(&unique_i32.to_be_bytes())?;
    out.write_all(&size_i32.to_be_bytes())?;
    Ok(())
}

impl MapToData {
    pub fn map_type(&self) -> MapType {
        match self {
            MapToData::Bit(_) => MapType::Bit,
            MapToData::Int(_) => MapType::Int,
        }
    }

    pub fn as_bit(&self) -> Option<&MapToBit> {
        match self {
            MapToData::Bit(m) => Some(m),
            MapToData::Int(_) => None,
        }
    }

    /// Reopen the map for a merge phase.
    pub fn into_builder(self) -> MapBuilder {
        match self {
            MapToData::Bit(m) => MapBuilder::Bit(m.into_builder()),
            MapToData::Int(m) => MapBuilder::Int(m.into_builder()),
        }
    }

    pub fn in_memory_size(&self) -> u64 {
        match self {
            MapToData::Bit(m) => m.in_memory_size(),
            MapToData::Int(m) => m.in_memory_size(),
        }
    }

    /// Planning estimate of the serialized size. See [`MapToBit::exact_size_on_disk`].
    pub fn exact_size_on_disk(&self) -> u64 {
        match self {
            MapToData::Bit(m) => m.exact_size_on_disk(),
            MapToData::Int(m) => m.exact_size_on_disk(),
        }
    }

    /// Number of bytes [`MapToData::write`] produces.
    pub fn serialized_len(&self) -> u64 {
        match self {
            MapToData::Bit(m) => m.serialized_len(),
            MapToData::Int(m) => m.serialized_len(),
        }
    }

    pub fn write<W: Write>(&self, out: &mut W) -> MapResult<()> {
        match self {
            MapToData::Bit(m) => m.write(out),
            MapToData::Int(m) => m.write(out),
        }
    }

    pub fn pre_aggregate_dense_to_row(
        &self,
        mv: &[f64],
        off: usize,
        pre_av: &mut [f64],
        cl: usize,
        cu: usize,
    ) -> MapResult<()> {
        match self {
            MapToData::Bit(m) => m.pre_aggregate_dense_to_row(mv, off, pre_av, cl, cu),
            MapToData::Int(m) => m.pre_aggregate_dense_to_row(mv, off, pre_av, cl, cu),
        }
    }

    pub fn pre_aggregate_dense_rows(
        &self,
        m: &MatrixBlock,
        pre_av: &mut [f64],
        rl: usize,
        ru: usize,
        cl: usize,
        cu: usize,
    ) -> MapResult<()> {
        match self {
            MapToData::Bit(map) => map.pre_aggregate_dense_rows(m, pre_av, rl, ru, cl, cu),
            MapToData::Int(map) => map.pre_aggregate_dense_rows(m, pre_av, rl, ru, cl, cu),
        }
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
        match self {
            MapToData::Bit(map) => map.pre_aggregate_dense(m, pre_av, rl, ru, cl, cu, indexes),
            MapToData::Int(map) => map.pre_aggregate_dense(m, pre_av, rl, ru, cl, cu, indexes),
        }
    }

    pub fn pre_aggregate_sparse(
        &self,
        m: &MatrixBlock,
        pre_av: &mut [f64],
        rl: usize,
        ru: usize,
        indexes: &OffsetList,
    ) -> MapResult<()> {
        match self {
            MapToData::Bit(map) => map.pre_aggregate_sparse(m, pre_av, rl, ru, indexes),
            MapToData::Int(map) => map.pre_aggregate_sparse(m, pre_av, rl, ru, indexes),
        }
    }

    /// For every row `r`: `ret[self(r)] += dict[other(r)]`.
    pub fn pre_aggregate_ddc_single_col<D: Dictionary + ?Sized>(
        &self,
        other: &MapToData,
        dict: &D,
        ret: &mut [f64],
    ) -> MapResult<()> {
        match self {
            MapToData::Bit(m) => m.pre_aggregate_ddc_single_col(other, dict, ret),
            MapToData::Int(m) => m.pre_aggregate_ddc_single_col(other, dict, ret),
        }
    }

    /// For every row `r`: row `self(r)` of `ret` += row `other(r)` of `dict`.
    pub fn pre_aggregate_ddc_multi_col<D: Dictionary + ?Sized>(
        &self,
        other: &MapToData,
        dict: &D,
        ret: &mut [f64],
        n_col: usize,
    ) -> MapResult<()> {
        match self {
            MapToData::Bit(m) => m.pre_aggregate_ddc_multi_col(other, dict, ret, n_col),
            MapToData::Int(m) => m.pre_aggregate_ddc_multi_col(other, dict, ret, n_col),
        }
    }
}

impl RowCodes for MapToData {
    fn size(&self) -> usize {
        match self {
            MapToData::Bit(m) => m.size(),
            MapToData::Int(m) => m.size(),
        }
    }

    fn unique(&self) -> u32 {
        match self {
            MapToData::Bit(m) => m.unique(),
            MapToData::Int(m) => m.unique(),
        }
    }

    fn get_index(&self, pos: usize) -> u32 {
        match self {
            MapToData::Bit(m) => m.get_index(pos),
            MapToData::Int(m) => m.get_index(pos),
        }
    }

    fn upper_bound_value(&self) -> u32 {
        match self {
            MapToData::Bit(m) => m.upper_bound_value(),
            MapToData::Int(m) => m.upper_bound_value(),
        }
    }

    fn counts<'a>(&self, counts: &'a mut [usize]) -> &'a mut [usize] {
        match self {
            MapToData::Bit(m) => m.counts(counts),
            MapToData::Int(m) => m.counts(counts),
        }
    }
}

impl MapBuilder {
    pub fn size(&self) -> usize {
        match self {
            MapBuilder::Bit(b) => b.size(),
            MapBuilder::Int(b) => b.size(),
        }
    }

    pub fn get_index(&self, pos: usize) -> u32 {
        match self {
            MapBuilder::Bit(b) => b.get_index(pos),
            MapBuilder::Int(b) => b.get_index(pos),
        }
    }

    pub fn set(&mut self, pos: usize, code: u32) -> MapResult<()> {
        match self {
            MapBuilder::Bit(b) => b.set(pos, code),
            MapBuilder::Int(b) => b.set(pos, code),
        }
    }

    pub fn fill(&mut self, code: u32) -> MapResult<()> {
        match self {
            MapBuilder::Bit(b) => {
                b.fill(code);
                Ok(())
            }
            MapBuilder::Int(b) => b.fill(code),
        }
    }

    pub fn replace(&mut self, from: u32, to: u32) -> MapResult<()> {
        match self {
            MapBuilder::Bit(b) => b.replace(from, to),
            MapBuilder::Int(b) => b.replace(from, to),
        }
    }

    pub fn finish(self) -> MapToData {
        match self {
            MapBuilder::Bit(b) => MapToData::Bit(b.finish()),
            MapBuilder::Int(b) => MapToData::Int(b.finish()),
        }
    }
}

pub(crate) fn check_same_size(this: usize, other: usize) -> MapResult<()> {
    if this != other {
        return Err(MapError::SizeMismatch {
            expected: this,
            actual: other,
        });
    }
    Ok(())
}
