//! Resting shape of a 2-port S-parameter measurement.

use ndarray::{Array1, Array3, ArrayView2};
use num_complex::Complex64;

use crate::{Error, Result};

/// A frequency vector paired with one 2x2 complex scattering matrix per
/// point, indexed `[point, port_out, port_in]`, plus the port reference
/// impedances.
#[derive(Debug, Clone, PartialEq)]
pub struct TwoPortNetwork {
    name: String,
    freq_ghz: Array1<f64>,
    s: Array3<Complex64>,
    z0: [Complex64; 2],
}

impl TwoPortNetwork {
    pub fn new(name: &str, freq_ghz: Vec<f64>, s: Array3<Complex64>,
               z0: [Complex64; 2]) -> Result<TwoPortNetwork> {
        if s.dim() != (freq_ghz.len(), 2, 2) {
            return Err(Error::TraceLength {
                expected: freq_ghz.len(),
                actual: s.dim().0,
            });
        }
        Ok(TwoPortNetwork {
            name: name.to_owned(),
            freq_ghz: Array1::from(freq_ghz),
            s,
            z0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of frequency points.
    pub fn points(&self) -> usize {
        self.freq_ghz.len()
    }

    pub fn frequency_ghz(&self) -> &Array1<f64> {
        &self.freq_ghz
    }

    /// Full S-parameter tensor.
    pub fn s(&self) -> &Array3<Complex64> {
        &self.s
    }

    /// The 2x2 scattering matrix at one frequency point.
    pub fn point(&self, index: usize) -> ArrayView2<Complex64> {
        self.s.index_axis(ndarray::Axis(0), index)
    }

    pub fn z0(&self) -> [Complex64; 2] {
        self.z0
    }
}
