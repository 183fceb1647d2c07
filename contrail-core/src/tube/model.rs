//! The fitted confidence tube artifact
//!
//! A [`ConfidenceTube`] is immutable once built and owns no reference to
//! the signals used to fit it: it can be persisted, reloaded, and scored
//! against signals unseen during fitting. Immutability is the key
//! correctness property here; concurrent scoring against a shared tube
//! needs no synchronization.

use crate::tube::interp::sample_at;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Lower/upper bound curves for one variable over the normalized grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TubeBand {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

/// Per-variable bound curves over a fixed grid of normalized positions,
/// plus the fitting metadata.
///
/// Invariants: `lower <= upper` at every grid point, grid resolution >= 2.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceTube {
    grid: Vec<f64>,
    bands: BTreeMap<String, TubeBand>,
    robustness_quantile: f64,
    reference_count: usize,
}

impl ConfidenceTube {
    pub(crate) fn new(
        grid: Vec<f64>,
        bands: BTreeMap<String, TubeBand>,
        robustness_quantile: f64,
        reference_count: usize,
    ) -> Self {
        Self {
            grid,
            bands,
            robustness_quantile,
            reference_count,
        }
    }

    /// The normalized grid positions, 0.0 to 1.0 inclusive.
    pub fn grid(&self) -> &[f64] {
        &self.grid
    }

    pub fn grid_resolution(&self) -> usize {
        self.grid.len()
    }

    /// Tail mass trimmed on each side when the bounds were computed.
    pub fn robustness_quantile(&self) -> f64 {
        self.robustness_quantile
    }

    /// Number of reference signals consumed by the fit. Downstream
    /// consumers use this to discount tubes fitted from populations too
    /// small for the requested quantile.
    pub fn reference_count(&self) -> usize {
        self.reference_count
    }

    /// Variable names covered by this tube, in deterministic order.
    pub fn variables(&self) -> Vec<String> {
        self.bands.keys().cloned().collect()
    }

    pub fn band(&self, variable: &str) -> Option<&TubeBand> {
        self.bands.get(variable)
    }

    /// Iterate (variable, band) pairs in deterministic order.
    pub fn bands(&self) -> impl Iterator<Item = (&String, &TubeBand)> {
        self.bands.iter()
    }

    /// Interpolated (lower, upper) bounds for one variable at an exact
    /// normalized position. `None` when the tube has no such variable.
    pub fn bounds_at(&self, variable: &str, normalized: f64) -> Option<(f64, f64)> {
        let band = self.bands.get(variable)?;
        Some((
            sample_at(&self.grid, &band.lower, normalized),
            sample_at(&self.grid, &band.upper, normalized),
        ))
    }

    /// Persist the full artifact (bounds plus metadata) as JSON.
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Reload a previously saved tube.
    ///
    /// The file contents are untrusted: a tube that deserializes but
    /// violates the structural invariants is rejected rather than handed
    /// to the scorer.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let tube: Self = serde_json::from_reader(BufReader::new(file))?;
        tube.validate()?;
        Ok(tube)
    }

    fn validate(&self) -> Result<()> {
        if self.grid.len() < 2 {
            return Err(Error::InvalidParameter(format!(
                "tube grid has {} points, need at least 2",
                self.grid.len()
            )));
        }
        for (variable, band) in &self.bands {
            if band.lower.len() != self.grid.len() || band.upper.len() != self.grid.len() {
                return Err(Error::InvalidParameter(format!(
                    "band for '{variable}' does not match the {}-point grid",
                    self.grid.len()
                )));
            }
            if band.lower.iter().zip(&band.upper).any(|(lo, hi)| lo > hi) {
                return Err(Error::InvalidParameter(format!(
                    "band for '{variable}' has lower bound above upper bound"
                )));
            }
        }
        Ok(())
    }
}
