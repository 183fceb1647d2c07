//! Per-row indicators and derived highlight stores
//!
//! Labeled instants come from an upstream producer (originally an
//! interactive labeling UI); here they are turned into plain per-row
//! boolean indicators by pure functions, and [`highlight`] materializes
//! an indicator as an extra column in a derived store. The core never
//! interprets an indicator beyond carrying it.

use crate::{Error, ExcursionSegment, Result, SignalStore, SignalTable};
use tracing::info;

/// Default name of the column added by [`highlight`].
pub const INTERVAL_COLUMN: &str = "interval";

/// Mark, for each labeled instant, the nearest row whose position lies
/// within `tolerance` of it. Instants falling outside every row's
/// tolerance window mark nothing.
pub fn mark_instants(table: &SignalTable, instants: &[f64], tolerance: f64) -> Vec<bool> {
    let positions = table.positions();
    let mut flags = vec![false; positions.len()];
    for &instant in instants {
        let row = nearest_row(positions, instant);
        if (positions[row] - instant).abs() <= tolerance {
            flags[row] = true;
        }
    }
    flags
}

/// Mark every row covered by the given excursion segments.
pub fn from_segments(table: &SignalTable, segments: &[ExcursionSegment]) -> Vec<bool> {
    let mut flags = vec![false; table.len()];
    for segment in segments {
        let end = segment.end_row.min(table.len() - 1);
        for flag in &mut flags[segment.start_row.min(end)..=end] {
            *flag = true;
        }
    }
    flags
}

/// Index of the row whose position is closest to `target`.
fn nearest_row(positions: &[f64], target: f64) -> usize {
    let hi = positions.partition_point(|&p| p < target);
    if hi == 0 {
        return 0;
    }
    if hi == positions.len() {
        return positions.len() - 1;
    }
    let lo = hi - 1;
    if (target - positions[lo]) <= (positions[hi] - target) {
        lo
    } else {
        hi
    }
}

/// Copy every signal from `origin` into `dest` with one extra 0.0/1.0
/// column named `column`, computed by `indicator` per signal.
///
/// Both stores are explicit handles; `dest` must be writable. Returns
/// the number of signals copied.
pub async fn highlight<F>(
    origin: &SignalStore,
    dest: &SignalStore,
    column: &str,
    mut indicator: F,
) -> Result<usize>
where
    F: FnMut(&str, &SignalTable) -> Vec<bool>,
{
    let ids = origin.list_ids().await?;
    let mut copied = 0;
    for id in ids {
        let table = origin.get(&id).await?;
        let flags = indicator(&id, &table);
        if flags.len() != table.len() {
            return Err(Error::InvalidTable(format!(
                "indicator returned {} flags for the {} rows of '{}'",
                flags.len(),
                table.len(),
                id
            )));
        }
        let values: Vec<f64> = flags.iter().map(|&b| if b { 1.0 } else { 0.0 }).collect();
        let marked = table.with_column(column, values)?;
        dest.put(&id, &marked).await?;
        copied += 1;
    }
    info!(copied, column, "highlighted store");
    Ok(copied)
}
