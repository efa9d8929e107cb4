//! Joining two DDC column groups through their row→code maps.
//!
//! A join accumulates, for every row `r`, the dictionary entry selected by the *other* map's
//! code into the output row selected by *this* map's code. When both maps are 1-bit, the whole
//! join collapses into a 2×2 contingency table computed with word-level population counts.

use crate::dictionary::Dictionary;
use crate::mapping::RowCodes;

/// Contingency table of two bit vectors `t` and `o`.
///
/// The first letter is `t`'s bit, the second `o`'s bit: `tf` counts positions where `t` is set
/// and `o` is clear.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct JoinCounts {
    pub tt: usize,
    pub tf: usize,
    pub ft: usize,
    pub ff: usize,
}

impl JoinCounts {
    pub fn total(&self) -> usize {
        self.tt + self.tf + self.ft + self.ff
    }
}

/// Count the four bit combinations of `t` and `o` over positions `0..size`.
///
/// Either word slice may be shorter than `ceil(size / 64)`; missing words are all-zero. Bits at
/// positions `>= size` must be zero.
pub fn join_counts(t: &[u64], o: &[u64], size: usize) -> JoinCounts {
    let common = t.len().min(o.len());
    let (mut tt, mut tf, mut ft) = (0usize, 0usize, 0usize);
    // Signed: padding bits of the last word are counted here and cancelled below.
    let mut ff: i64 = 0;

    for (&tw, &ow) in t[..common].iter().zip(&o[..common]) {
        tt += (tw & ow).count_ones() as usize;
        tf += (tw & !ow).count_ones() as usize;
        ft += (!tw & ow).count_ones() as usize;
        ff += (!tw & !ow).count_ones() as i64;
    }

    if t.len() > common {
        for &tw in &t[common..] {
            let v = tw.count_ones();
            tf += v as usize;
            ff += 64 - v as i64;
        }
    } else if o.len() > common {
        for &ow in &o[common..] {
            let v = ow.count_ones();
            ft += v as usize;
            ff += 64 - v as i64;
        }
    }

    let longest = t.len().max(o.len());
    ff += size as i64 - (longest as i64) * 64;

    let out = JoinCounts {
        tt,
        tf,
        ft,
        ff: ff.max(0) as usize,
    };
    debug_assert_eq!(out.total(), size, "join counts must cover every row");
    out
}

/// `ret[1] += d[1]·tt + d[0]·ft`, `ret[0] += d[1]·tf + d[0]·ff` with `t` the other map.
pub(crate) fn ddc_single_col_bits(j: JoinCounts, tv: &[f64], rv: &mut [f64]) {
    rv[1] += tv[1] * j.tt as f64;
    rv[0] += tv[1] * j.tf as f64;
    rv[1] += tv[0] * j.ft as f64;
    rv[0] += tv[0] * j.ff as f64;
}

pub(crate) fn ddc_multi_col_bits(j: JoinCounts, tv: &[f64], rv: &mut [f64], n_col: usize) {
    for i in 0..n_col {
        let off = n_col + i;
        rv[i] += tv[i] * j.ff as f64;
        rv[off] += tv[i] * j.ft as f64;
        rv[off] += tv[off] * j.tt as f64;
        rv[i] += tv[off] * j.tf as f64;
    }
}

/// Per-row single-column join, valid for any pair of map variants.
///
/// Both maps must have the same size.
pub fn ddc_single_col_fallback<T, O, D>(this: &T, other: &O, dict: &D, ret: &mut [f64])
where
    T: RowCodes + ?Sized,
    O: RowCodes + ?Sized,
    D: Dictionary + ?Sized,
{
    for r in 0..this.size() {
        dict.add_to_entry(ret, other.get_index(r), this.get_index(r));
    }
}

/// Per-row multi-column join, valid for any pair of map variants.
pub fn ddc_multi_col_fallback<T, O, D>(
    this: &T,
    other: &O,
    dict: &D,
    ret: &mut [f64],
    n_col: usize,
) where
    T: RowCodes + ?Sized,
    O: RowCodes + ?Sized,
    D: Dictionary + ?Sized,
{
    for r in 0..this.size() {
        dict.add_to_entry_multi(ret, other.get_index(r), this.get_index(r), n_col);
    }
}
