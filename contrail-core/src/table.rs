//! In-memory representation of one signal
//!
//! A [`SignalTable`] is an ordered sequence of rows over a fixed set of
//! named numeric variables, indexed by a monotone non-decreasing position
//! column (typically elapsed time). Tables are value-like: cloning or
//! sharing them across threads needs no synchronization.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Opaque key identifying one signal within a store.
pub type SignalId = String;

/// One signal: a position column plus named numeric columns of equal length.
///
/// Invariants (checked at construction):
/// - at least one row
/// - positions sorted ascending (ties allowed)
/// - every column has exactly one value per row
///
/// Columns are kept in a `BTreeMap` so variable order is deterministic,
/// which keeps fitting and serialization bit-for-bit reproducible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalTable {
    positions: Vec<f64>,
    columns: BTreeMap<String, Vec<f64>>,
}

impl SignalTable {
    /// Build a table from a position column and named value columns.
    pub fn new(positions: Vec<f64>, columns: BTreeMap<String, Vec<f64>>) -> Result<Self> {
        if positions.is_empty() {
            return Err(Error::InvalidTable(
                "a signal table needs at least one row".to_string(),
            ));
        }
        if positions.windows(2).any(|w| w[1] < w[0]) {
            return Err(Error::InvalidTable(
                "positions must be sorted ascending".to_string(),
            ));
        }
        for (name, values) in &columns {
            if values.len() != positions.len() {
                return Err(Error::InvalidTable(format!(
                    "column '{}' has {} values for {} positions",
                    name,
                    values.len(),
                    positions.len()
                )));
            }
        }
        Ok(Self { positions, columns })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Always false for a validly constructed table.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// The position column, sorted ascending.
    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    /// Variable names, in deterministic (lexicographic) order.
    pub fn variables(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Values of one variable, or `None` if this table never had it.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Iterate (variable, values) pairs in deterministic order.
    pub fn columns(&self) -> impl Iterator<Item = (&String, &[f64])> {
        self.columns.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// First and last position (the table's own time span).
    pub fn position_span(&self) -> (f64, f64) {
        (self.positions[0], self.positions[self.positions.len() - 1])
    }

    /// Positions rescaled to [0,1] by linear mapping from this table's
    /// own (min, max). A degenerate span (single row, or all positions
    /// equal) maps every row to 0.0.
    pub fn normalized_positions(&self) -> Vec<f64> {
        crate::tube::interp::normalize_positions(&self.positions)
    }

    /// Copy of this table with one column added or replaced.
    pub fn with_column(&self, name: &str, values: Vec<f64>) -> Result<Self> {
        if values.len() != self.positions.len() {
            return Err(Error::InvalidTable(format!(
                "column '{}' has {} values for {} positions",
                name,
                values.len(),
                self.positions.len()
            )));
        }
        let mut columns = self.columns.clone();
        columns.insert(name.to_string(), values);
        Ok(Self {
            positions: self.positions.clone(),
            columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(values: &[f64]) -> Vec<f64> {
        values.to_vec()
    }

    #[test]
    fn rejects_empty_table() {
        let err = SignalTable::new(vec![], BTreeMap::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidTable(_)));
    }

    #[test]
    fn rejects_unsorted_positions() {
        let err = SignalTable::new(vec![0.0, 2.0, 1.0], BTreeMap::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidTable(_)));
    }

    #[test]
    fn rejects_ragged_columns() {
        let mut columns = BTreeMap::new();
        columns.insert("x".to_string(), col(&[1.0, 2.0]));
        let err = SignalTable::new(vec![0.0, 1.0, 2.0], columns).unwrap_err();
        assert!(matches!(err, Error::InvalidTable(_)));
    }

    #[test]
    fn accepts_duplicate_positions() {
        let mut columns = BTreeMap::new();
        columns.insert("x".to_string(), col(&[1.0, 2.0, 3.0]));
        let table = SignalTable::new(vec![0.0, 1.0, 1.0], columns).unwrap();
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn normalized_positions_rescale_span() {
        let mut columns = BTreeMap::new();
        columns.insert("x".to_string(), col(&[0.0, 0.0, 0.0]));
        let table = SignalTable::new(vec![10.0, 15.0, 20.0], columns).unwrap();
        assert_eq!(table.normalized_positions(), vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn degenerate_span_normalizes_to_zero() {
        let mut columns = BTreeMap::new();
        columns.insert("x".to_string(), col(&[7.0]));
        let table = SignalTable::new(vec![3.0], columns).unwrap();
        assert_eq!(table.normalized_positions(), vec![0.0]);
    }

    #[test]
    fn with_column_replaces_existing() {
        let mut columns = BTreeMap::new();
        columns.insert("x".to_string(), col(&[1.0, 2.0]));
        let table = SignalTable::new(vec![0.0, 1.0], columns).unwrap();
        let marked = table.with_column("x", col(&[9.0, 9.0])).unwrap();
        assert_eq!(marked.column("x").unwrap(), &[9.0, 9.0]);
        assert_eq!(marked.len(), 2);
    }
}
