use super::{check_same_size, read_i32, read_len, write_header, MapToData, MapType, RowCodes};
use crate::block::MatrixBlock;
use crate::dictionary::Dictionary;
use crate::error::{MapError, MapResult};
use crate::join;
use crate::offset::OffsetList;
use crate::preagg;
use std::io::{Read, Write};

const HEADER_BYTES: u64 = 1 + 4 + 4;

/// Largest code the serialized form can carry.
const MAX_CODE: u32 = i32::MAX as u32;

/// Row→code map storing one `u32` code per row.
///
/// Used for column groups with more than two distinct codes. It has no bitwise join path: any
/// join that involves it goes through the per-row loop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapToInt {
    unique: u32,
    data: Vec<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapToIntBuilder {
    unique: u32,
    data: Vec<u32>,
}

impl MapToIntBuilder {
    pub fn new(unique: u32, size: usize) -> Self {
        Self {
            unique,
            data: vec![0; size],
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn get_index(&self, pos: usize) -> u32 {
        self.data[pos]
    }

    fn check_code(&self, code: u32) -> MapResult<()> {
        let upper_bound = self.unique.saturating_sub(1).min(MAX_CODE);
        if code >= self.unique || code > MAX_CODE {
            return Err(MapError::InvalidCode { code, upper_bound });
        }
        Ok(())
    }

    pub fn set(&mut self, pos: usize, code: u32) -> MapResult<()> {
        self.check_code(code)?;
        let size = self.data.len();
        let slot = self
            .data
            .get_mut(pos)
            .ok_or(MapError::OutOfBounds { pos, size })?;
        *slot = code;
        Ok(())
    }

    pub fn fill(&mut self, code: u32) -> MapResult<()> {
        self.check_code(code)?;
        self.data.iter_mut().for_each(|c| *c = code);
        Ok(())
    }

    /// Rewrite every occurrence of `from` as `to`.
    pub fn replace(&mut self, from: u32, to: u32) -> MapResult<()> {
        self.check_code(to)?;
        for c in self.data.iter_mut().filter(|c| **c == from) {
            *c = to;
        }
        Ok(())
    }

    pub fn finish(self) -> MapToInt {
        log::debug!(
            "finished int map: {} rows, {} codes",
            self.data.len(),
            self.unique
        );
        MapToInt {
            unique: self.unique,
            data: self.data,
        }
    }
}

impl MapToInt {
    pub fn builder(unique: u32, size: usize) -> MapToIntBuilder {
        MapToIntBuilder::new(unique, size)
    }

    pub fn into_builder(self) -> MapToIntBuilder {
        MapToIntBuilder {
            unique: self.unique,
            data: self.data,
        }
    }

    pub fn codes(&self) -> &[u32] {
        &self.data
    }

    pub fn estimate_in_memory_size(size: usize) -> u64 {
        std::mem::size_of::<MapToInt>() as u64 + 4 * size as u64
    }

    pub fn in_memory_size(&self) -> u64 {
        Self::estimate_in_memory_size(self.data.len())
    }

    pub fn exact_size_on_disk(&self) -> u64 {
        self.serialized_len()
    }

    pub fn serialized_len(&self) -> u64 {
        HEADER_BYTES + 4 * self.data.len() as u64
    }

    pub fn write<W: Write>(&self, out: &mut W) -> MapResult<()> {
        write_header(out, MapType::Int, self.unique, self.data.len())?;
        for &c in &self.data {
            out.write_all(&(c as i32).to_be_bytes())?;
        }
        Ok(())
    }

    pub(crate) fn read_fields<R: Read>(input: &mut R) -> MapResult<Self> {
        let unique = read_len(input, "unique count")? as u32;
        let size = read_len(input, "row count")?;
        let mut data = Vec::with_capacity(size.min(1 << 14));
        for pos in 0..size {
            let code = read_i32(input)?;
            if code < 0 || code as u32 >= unique {
                return Err(MapError::Corrupt(format!(
                    "code {code} at row {pos} outside of {unique} codes"
                )));
            }
            data.push(code as u32);
        }
        Ok(Self { unique, data })
    }

    pub fn pre_aggregate_dense_to_row(
        &self,
        mv: &[f64],
        off: usize,
        pre_av: &mut [f64],
        cl: usize,
        cu: usize,
    ) -> MapResult<()> {
        preagg::dense_to_row(self.data.as_slice(), self.size(), mv, off, pre_av, cl, cu)
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
        preagg::check_extents(m, self.size(), rl, ru, cl, cu)?;
        preagg::dense_rows(
            self.data.as_slice(),
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
            self.data.as_slice(),
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
        indexes.pre_aggregate_sparse_map(
            m,
            pre_av,
            rl,
            ru,
            self.unique as usize,
            self.data.as_slice(),
        )
    }

    pub fn pre_aggregate_ddc_single_col<D: Dictionary + ?Sized>(
        &self,
        other: &MapToData,
        dict: &D,
        ret: &mut [f64],
    ) -> MapResult<()> {
        check_same_size(self.size(), other.size())?;
        join::ddc_single_col_fallback(self, other, dict, ret);
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
        join::ddc_multi_col_fallback(self, other, dict, ret, n_col);
        Ok(())
    }
}

impl RowCodes for MapToInt {
    fn size(&self) -> usize {
        self.data.len()
    }

    fn unique(&self) -> u32 {
        self.unique
    }

    fn get_index(&self, pos: usize) -> u32 {
        self.data[pos]
    }

    fn upper_bound_value(&self) -> u32 {
        MAX_CODE
    }
}
