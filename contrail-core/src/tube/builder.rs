//! Tube fitting over a reference population
//!
//! Every reference signal is rescaled to the normalized [0,1] axis,
//! resampled onto a fixed grid by linear interpolation, and the
//! per-grid-point empirical quantiles across the population become the
//! tube bounds. Fitting is a pure function of its inputs.

use crate::tube::interp::{grid_points, normalize_positions, quantile, sample_at};
use crate::tube::model::{ConfidenceTube, TubeBand};
use crate::{Error, Result, SignalTable};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Default grid resolution; fine enough for slow-moving flight or
/// machining parameters without inflating the artifact.
pub const DEFAULT_GRID_RESOLUTION: usize = 101;

/// Default tail mass trimmed on each side of the population.
pub const DEFAULT_ROBUSTNESS_QUANTILE: f64 = 0.05;

/// Fits a [`ConfidenceTube`] from a reference population of signals.
#[derive(Debug, Clone)]
pub struct TubeBuilder {
    grid_resolution: usize,
    robustness_quantile: f64,
}

impl Default for TubeBuilder {
    fn default() -> Self {
        Self {
            grid_resolution: DEFAULT_GRID_RESOLUTION,
            robustness_quantile: DEFAULT_ROBUSTNESS_QUANTILE,
        }
    }
}

impl TubeBuilder {
    /// Configure a builder.
    ///
    /// `grid_resolution` must be at least 2. `robustness_quantile` is the
    /// tail mass excluded on each side and must lie in [0, 0.5); 0.0
    /// reproduces the true min/max envelope, which is sensitive to
    /// outliers.
    pub fn new(grid_resolution: usize, robustness_quantile: f64) -> Result<Self> {
        if grid_resolution < 2 {
            return Err(Error::InvalidParameter(format!(
                "grid resolution must be at least 2, got {}",
                grid_resolution
            )));
        }
        if !(0.0..0.5).contains(&robustness_quantile) {
            return Err(Error::InvalidParameter(format!(
                "robustness quantile must lie in [0, 0.5), got {}",
                robustness_quantile
            )));
        }
        Ok(Self {
            grid_resolution,
            robustness_quantile,
        })
    }

    pub fn grid_resolution(&self) -> usize {
        self.grid_resolution
    }

    pub fn robustness_quantile(&self) -> f64 {
        self.robustness_quantile
    }

    /// Fit a tube over `reference` for the requested `variables`.
    ///
    /// Fails with [`Error::InsufficientReferenceSignals`] only when the
    /// population is empty, and with [`Error::VariableMissing`] when any
    /// reference signal lacks a requested variable. A population smaller
    /// than `1/(2*quantile)` yields degenerate (possibly equal) quantile
    /// estimates; that is accepted and recorded through the tube's
    /// reference-count metadata so consumers can discount it.
    pub fn fit(&self, reference: &[SignalTable], variables: &[String]) -> Result<ConfidenceTube> {
        if reference.is_empty() {
            return Err(Error::InsufficientReferenceSignals);
        }
        if self.robustness_quantile > 0.0 {
            let needed = (0.5 / self.robustness_quantile).ceil() as usize;
            if reference.len() < needed {
                warn!(
                    references = reference.len(),
                    needed,
                    quantile = self.robustness_quantile,
                    "population too small for requested quantile, bounds will be degenerate"
                );
            }
        }

        let grid = grid_points(self.grid_resolution);

        // Resample every variable of every signal onto the grid.
        // var -> one grid-sized value vector per reference signal.
        let mut per_var: BTreeMap<String, Vec<Vec<f64>>> = BTreeMap::new();
        for (idx, table) in reference.iter().enumerate() {
            let norm = normalize_positions(table.positions());
            for var in variables {
                let ys = table.column(var).ok_or_else(|| Error::VariableMissing {
                    context: format!(
                        "reference signal {} of {} (variables: {})",
                        idx + 1,
                        reference.len(),
                        table.variables().join(", ")
                    ),
                    variable: var.clone(),
                })?;
                let resampled: Vec<f64> = grid.iter().map(|&g| sample_at(&norm, ys, g)).collect();
                per_var.entry(var.clone()).or_default().push(resampled);
            }
            debug!(signal = idx, rows = table.len(), "resampled reference signal");
        }

        // Per grid point and variable, the trimmed quantiles across the
        // population become the bounds.
        let mut bands = BTreeMap::new();
        for (var, samples) in per_var {
            let mut lower = Vec::with_capacity(self.grid_resolution);
            let mut upper = Vec::with_capacity(self.grid_resolution);
            for gi in 0..self.grid_resolution {
                let mut column: Vec<f64> = samples.iter().map(|s| s[gi]).collect();
                column.sort_by(f64::total_cmp);
                lower.push(quantile(&column, self.robustness_quantile));
                upper.push(quantile(&column, 1.0 - self.robustness_quantile));
            }
            bands.insert(var, TubeBand { lower, upper });
        }

        info!(
            references = reference.len(),
            variables = variables.len(),
            grid = self.grid_resolution,
            quantile = self.robustness_quantile,
            "fitted confidence tube"
        );
        Ok(ConfidenceTube::new(
            grid,
            bands,
            self.robustness_quantile,
            reference.len(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn constant_signal(value: f64, rows: usize) -> SignalTable {
        let positions: Vec<f64> = (0..rows).map(|i| i as f64).collect();
        let mut columns = BTreeMap::new();
        columns.insert("x".to_string(), vec![value; rows]);
        SignalTable::new(positions, columns).unwrap()
    }

    #[test]
    fn empty_population_is_rejected() {
        let builder = TubeBuilder::new(5, 0.0).unwrap();
        let err = builder.fit(&[], &["x".to_string()]).unwrap_err();
        assert!(matches!(err, Error::InsufficientReferenceSignals));
    }

    #[test]
    fn missing_variable_is_rejected() {
        let builder = TubeBuilder::new(5, 0.0).unwrap();
        let signals = vec![constant_signal(1.0, 10)];
        let err = builder
            .fit(&signals, &["x".to_string(), "y".to_string()])
            .unwrap_err();
        match err {
            Error::VariableMissing { variable, .. } => assert_eq!(variable, "y"),
            other => panic!("expected VariableMissing, got {other:?}"),
        }
    }

    #[test]
    fn minmax_envelope_over_constant_population() {
        // Three constant signals 0, 5, 10 with alpha = 0: bounds are
        // exactly (0, 10) at every grid point.
        let signals = vec![
            constant_signal(0.0, 10),
            constant_signal(5.0, 10),
            constant_signal(10.0, 10),
        ];
        let builder = TubeBuilder::new(5, 0.0).unwrap();
        let tube = builder.fit(&signals, &["x".to_string()]).unwrap();
        let band = tube.band("x").unwrap();
        assert_eq!(band.lower, vec![0.0; 5]);
        assert_eq!(band.upper, vec![10.0; 5]);
        assert_eq!(tube.reference_count(), 3);
        assert_eq!(tube.grid_resolution(), 5);
    }

    #[test]
    fn bounds_are_ordered_everywhere() {
        let signals: Vec<SignalTable> = (0..7)
            .map(|i| {
                let positions: Vec<f64> = (0..20).map(|j| j as f64 * 0.5).collect();
                let values: Vec<f64> = (0..20)
                    .map(|j| (j as f64 * 0.37 + i as f64).sin() * (i + 1) as f64)
                    .collect();
                let mut columns = BTreeMap::new();
                columns.insert("v".to_string(), values);
                SignalTable::new(positions, columns).unwrap()
            })
            .collect();
        let builder = TubeBuilder::new(33, 0.1).unwrap();
        let tube = builder.fit(&signals, &["v".to_string()]).unwrap();
        let band = tube.band("v").unwrap();
        for (lo, hi) in band.lower.iter().zip(&band.upper) {
            assert!(lo <= hi);
        }
    }

    #[test]
    fn fitting_is_idempotent() {
        let signals = vec![
            constant_signal(1.0, 8),
            constant_signal(2.0, 12),
            constant_signal(3.0, 5),
        ];
        let builder = TubeBuilder::new(17, 0.25).unwrap();
        let a = builder.fit(&signals, &["x".to_string()]).unwrap();
        let b = builder.fit(&signals, &["x".to_string()]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn raising_quantile_never_widens() {
        let signals: Vec<SignalTable> = (0..10).map(|i| constant_signal(i as f64, 6)).collect();
        let vars = ["x".to_string()];
        let narrow = TubeBuilder::new(9, 0.2).unwrap().fit(&signals, &vars).unwrap();
        let wide = TubeBuilder::new(9, 0.05).unwrap().fit(&signals, &vars).unwrap();
        let nb = narrow.band("x").unwrap();
        let wb = wide.band("x").unwrap();
        for gi in 0..9 {
            assert!(nb.lower[gi] >= wb.lower[gi]);
            assert!(nb.upper[gi] <= wb.upper[gi]);
        }
    }

    #[test]
    fn single_row_reference_resamples_as_constant() {
        let mut columns = BTreeMap::new();
        columns.insert("x".to_string(), vec![4.0]);
        let one_row = SignalTable::new(vec![100.0], columns).unwrap();
        let builder = TubeBuilder::new(4, 0.0).unwrap();
        let tube = builder.fit(&[one_row], &["x".to_string()]).unwrap();
        let band = tube.band("x").unwrap();
        assert_eq!(band.lower, vec![4.0; 4]);
        assert_eq!(band.upper, vec![4.0; 4]);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(TubeBuilder::new(1, 0.1).is_err());
        assert!(TubeBuilder::new(5, 0.5).is_err());
        assert!(TubeBuilder::new(5, -0.01).is_err());
        assert!(TubeBuilder::new(2, 0.0).is_ok());
    }
}
