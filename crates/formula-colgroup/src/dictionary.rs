/// A table of distinct value-combinations for a column group, indexed by code.
///
/// Values are laid out row-major as `[code][column]`.
pub trait Dictionary {
    fn values(&self) -> &[f64];

    /// `ret[to] += values[fr]` for a single-column dictionary.
    fn add_to_entry(&self, ret: &mut [f64], fr: u32, to: u32) {
        ret[to as usize] += self.values()[fr as usize];
    }

    /// Add row `fr` of an `n_col`-wide dictionary onto row `to` of `ret`.
    fn add_to_entry_multi(&self, ret: &mut [f64], fr: u32, to: u32, n_col: usize) {
        let src = &self.values()[fr as usize * n_col..(fr as usize + 1) * n_col];
        let dst = &mut ret[to as usize * n_col..(to as usize + 1) * n_col];
        for (d, s) in dst.iter_mut().zip(src) {
            *d += *s;
        }
    }
}

/// Dictionary backed by a flat `f64` array.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValueDictionary {
    values: Vec<f64>,
}

impl ValueDictionary {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values }
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

impl Dictionary for ValueDictionary {
    fn values(&self) -> &[f64] {
        &self.values
    }
}
