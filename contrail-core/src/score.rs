//! Scoring signals against a fitted tube
//!
//! Margins follow the sign convention: negative inside the tube (how
//! much headroom remains), positive outside (how far the value
//! overshoots the nearest bound). Evaluation is side-effect free and
//! safe to run concurrently on a shared tube.

use crate::tube::interp::{normalize_positions, sample_at};
use crate::{ConfidenceTube, Error, Result, SignalTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-row, per-variable signed margins for one (signal, tube) pair.
///
/// Derived, caller-owned; never persisted independently of its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreSeries {
    positions: Vec<f64>,
    normalized: Vec<f64>,
    margins: BTreeMap<String, Vec<f64>>,
}

impl ScoreSeries {
    /// Number of scored rows.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Original positions of the scored signal.
    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    /// The scored signal's positions on the normalized [0,1] axis.
    pub fn normalized_positions(&self) -> &[f64] {
        &self.normalized
    }

    /// Variables carried by this series, in deterministic order.
    pub fn variables(&self) -> Vec<String> {
        self.margins.keys().cloned().collect()
    }

    /// Signed per-row margins for one variable.
    pub fn margins(&self, variable: &str) -> Option<&[f64]> {
        self.margins.get(variable).map(Vec::as_slice)
    }

    /// Worst-case excursion for one variable: the maximum margin over
    /// all rows. This is the scalar that detection logic thresholds
    /// against.
    pub fn max_margin(&self, variable: &str) -> Option<f64> {
        self.margins
            .get(variable)
            .map(|m| m.iter().copied().fold(f64::NEG_INFINITY, f64::max))
    }

    /// Whole-signal aggregate: the worst-case excursion over every
    /// variable. `None` when the series carries no variables.
    pub fn max_margin_overall(&self) -> Option<f64> {
        self.margins
            .keys()
            .filter_map(|v| self.max_margin(v))
            .fold(None, |acc, m| Some(acc.map_or(m, |a: f64| a.max(m))))
    }
}

/// Evaluates signals against a [`ConfidenceTube`].
pub struct TubeScorer;

impl TubeScorer {
    /// Score every row of `signal` against `tube`.
    ///
    /// Each position is mapped to normalized space using the signal's
    /// own (min, max) range, the tube bounds are interpolated at that
    /// exact normalized position, and the margin per variable is
    /// `max(lower - value, value - upper)`.
    ///
    /// Fails with [`Error::VariableMissing`] when the signal lacks a
    /// variable present in the tube.
    pub fn evaluate(tube: &ConfidenceTube, signal: &SignalTable) -> Result<ScoreSeries> {
        let normalized = normalize_positions(signal.positions());
        let mut margins = BTreeMap::new();
        for (var, band) in tube.bands() {
            let values = signal.column(var).ok_or_else(|| Error::VariableMissing {
                context: format!(
                    "scored signal (variables: {})",
                    signal.variables().join(", ")
                ),
                variable: var.clone(),
            })?;
            let m: Vec<f64> = normalized
                .iter()
                .zip(values)
                .map(|(&x, &v)| {
                    let lower = sample_at(tube.grid(), &band.lower, x);
                    let upper = sample_at(tube.grid(), &band.upper, x);
                    (lower - v).max(v - upper)
                })
                .collect();
            margins.insert(var.clone(), m);
        }
        Ok(ScoreSeries {
            positions: signal.positions().to_vec(),
            normalized,
            margins,
        })
    }
}
