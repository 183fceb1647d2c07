//! Shared numeric helpers: normalized axes, linear interpolation,
//! empirical quantiles
//!
//! Everything here is deterministic, so fitting the same inputs twice
//! yields bit-for-bit identical tubes.

/// Rescale a sorted position column to [0,1] from its own (min, max).
///
/// A degenerate span (single row, or all positions equal) maps every row
/// to 0.0.
pub(crate) fn normalize_positions(positions: &[f64]) -> Vec<f64> {
    let first = positions[0];
    let last = positions[positions.len() - 1];
    let span = last - first;
    if span <= 0.0 {
        return vec![0.0; positions.len()];
    }
    positions
        .iter()
        .map(|p| ((p - first) / span).clamp(0.0, 1.0))
        .collect()
}

/// The fixed grid of `k` normalized positions, 0.0 to 1.0 inclusive.
/// Caller guarantees `k >= 2`.
pub(crate) fn grid_points(k: usize) -> Vec<f64> {
    (0..k).map(|i| i as f64 / (k - 1) as f64).collect()
}

/// Linearly interpolate `ys` at `x` over the sorted axis `xs`.
///
/// No extrapolation: outside the sampled range the nearest real sample
/// is returned. A zero-width bracket (duplicate positions) yields the
/// right-hand sample.
pub(crate) fn sample_at(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    debug_assert_eq!(xs.len(), ys.len());
    let last = xs.len() - 1;
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[last] {
        return ys[last];
    }
    // First index with xs[hi] > x; the guards above keep hi in 1..=last.
    let hi = xs.partition_point(|&p| p <= x);
    let lo = hi - 1;
    let span = xs[hi] - xs[lo];
    if span <= 0.0 {
        return ys[hi];
    }
    let t = (x - xs[lo]) / span;
    ys[lo] + t * (ys[hi] - ys[lo])
}

/// Empirical quantile of an ascending-sorted sample, linear interpolation
/// between order statistics (Hyndman-Fan type 7).
///
/// Monotone in `q` for a fixed sample, so raising the robustness
/// quantile never widens a tube; q = 0 and q = 1 reproduce exact
/// min/max.
pub(crate) fn quantile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let h = q * (n - 1) as f64;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let t = h - lo as f64;
    sorted[lo] + t * (sorted[hi] - sorted[lo])
}
