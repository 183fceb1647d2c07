//! Extraction of contiguous out-of-tube segments from a score series

use crate::{Error, Result, ScoreSeries};
use serde::{Deserialize, Serialize};

/// One maximal contiguous run of rows where a variable's margin is
/// strictly positive. Row indices are inclusive. Computed on demand,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcursionSegment {
    pub variable: String,
    pub start_row: usize,
    pub end_row: usize,
    pub start_position: f64,
    pub end_position: f64,
    pub peak_margin: f64,
}

impl ExcursionSegment {
    /// Number of rows covered by this segment.
    pub fn row_count(&self) -> usize {
        self.end_row - self.start_row + 1
    }
}

/// Marks contiguous out-of-tube runs in scorer output. Stateless; the
/// segment extraction is a pure function over the [`ScoreSeries`].
pub struct ExcursionHighlighter;

impl ExcursionHighlighter {
    /// Segments for one variable, in position order, non-overlapping.
    /// Empty when the signal never exits the tube for that variable.
    pub fn segments(series: &ScoreSeries, variable: &str) -> Result<Vec<ExcursionSegment>> {
        let margins = series
            .margins(variable)
            .ok_or_else(|| Error::VariableMissing {
                context: format!("score series (variables: {})", series.variables().join(", ")),
                variable: variable.to_string(),
            })?;
        let positions = series.positions();

        let mut out = Vec::new();
        let mut open: Option<(usize, f64)> = None; // (start_row, peak)
        for (i, &m) in margins.iter().enumerate() {
            if m > 0.0 {
                open = match open {
                    None => Some((i, m)),
                    Some((start, peak)) => Some((start, peak.max(m))),
                };
            } else if let Some((start, peak)) = open.take() {
                out.push(ExcursionSegment {
                    variable: variable.to_string(),
                    start_row: start,
                    end_row: i - 1,
                    start_position: positions[start],
                    end_position: positions[i - 1],
                    peak_margin: peak,
                });
            }
        }
        if let Some((start, peak)) = open {
            let last = margins.len() - 1;
            out.push(ExcursionSegment {
                variable: variable.to_string(),
                start_row: start,
                end_row: last,
                start_position: positions[start],
                end_position: positions[last],
                peak_margin: peak,
            });
        }
        Ok(out)
    }

    /// Segments for every variable in the series, grouped per variable
    /// in deterministic order.
    pub fn all_segments(series: &ScoreSeries) -> Result<Vec<ExcursionSegment>> {
        let mut out = Vec::new();
        for variable in series.variables() {
            out.extend(Self::segments(series, &variable)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SignalTable, TubeBuilder, TubeScorer};
    use std::collections::BTreeMap;

    fn signal(values: &[f64]) -> SignalTable {
        let positions: Vec<f64> = (0..values.len()).map(|i| i as f64).collect();
        let mut columns = BTreeMap::new();
        columns.insert("x".to_string(), values.to_vec());
        SignalTable::new(positions, columns).unwrap()
    }

    fn unit_tube() -> crate::ConfidenceTube {
        // Min/max envelope spanning [0, 1] everywhere.
        let refs = vec![signal(&[0.0; 8]), signal(&[1.0; 8])];
        TubeBuilder::new(5, 0.0)
            .unwrap()
            .fit(&refs, &["x".to_string()])
            .unwrap()
    }

    #[test]
    fn no_excursion_yields_no_segments() {
        let tube = unit_tube();
        let series = TubeScorer::evaluate(&tube, &signal(&[0.5; 6])).unwrap();
        let segs = ExcursionHighlighter::segments(&series, "x").unwrap();
        assert!(segs.is_empty());
    }

    #[test]
    fn full_excursion_is_one_segment() {
        let tube = unit_tube();
        let series = TubeScorer::evaluate(&tube, &signal(&[3.0; 6])).unwrap();
        let segs = ExcursionHighlighter::segments(&series, "x").unwrap();
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].start_row, 0);
        assert_eq!(segs[0].end_row, 5);
        assert_eq!(segs[0].peak_margin, 2.0);
        assert_eq!(segs[0].row_count(), 6);
    }

    #[test]
    fn separate_runs_become_separate_segments() {
        let tube = unit_tube();
        // Outside at rows 1-2 (above) and row 5 (below).
        let series =
            TubeScorer::evaluate(&tube, &signal(&[0.5, 2.0, 1.5, 0.5, 0.5, -1.0, 0.5])).unwrap();
        let segs = ExcursionHighlighter::segments(&series, "x").unwrap();
        assert_eq!(segs.len(), 2);
        assert_eq!((segs[0].start_row, segs[0].end_row), (1, 2));
        assert_eq!(segs[0].peak_margin, 1.0);
        assert_eq!((segs[1].start_row, segs[1].end_row), (5, 5));
        assert_eq!(segs[1].peak_margin, 1.0);
        // Non-overlapping and in position order.
        assert!(segs[0].end_row < segs[1].start_row);
    }

    #[test]
    fn segments_match_positive_margins_exactly() {
        let tube = unit_tube();
        let series =
            TubeScorer::evaluate(&tube, &signal(&[2.0, 0.5, 2.0, 2.0, 0.5, 2.0, 0.5])).unwrap();
        let segs = ExcursionHighlighter::segments(&series, "x").unwrap();
        let margins = series.margins("x").unwrap();
        let mut covered = vec![false; margins.len()];
        for seg in &segs {
            for row in seg.start_row..=seg.end_row {
                covered[row] = true;
            }
        }
        for (row, &m) in margins.iter().enumerate() {
            assert_eq!(covered[row], m > 0.0);
        }
    }

    #[test]
    fn unknown_variable_is_surfaced() {
        let tube = unit_tube();
        let series = TubeScorer::evaluate(&tube, &signal(&[0.5; 4])).unwrap();
        let err = ExcursionHighlighter::segments(&series, "nope").unwrap_err();
        assert!(matches!(err, Error::VariableMissing { .. }));
    }
}
