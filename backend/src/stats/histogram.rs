//! Equal-width histogram binning.

use serde::Serialize;

use super::describe::min_max;

/// Binned distribution of a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Histogram {
    /// `bins + 1` ascending edges.
    pub edges: Vec<f64>,
    /// `"lo - hi"` with two decimals, one per bin.
    pub labels: Vec<String>,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn bins(&self) -> usize {
        self.counts.len()
    }

    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

/// Upper bound on the bin count Sturges' rule may pick.
pub const MAX_AUTO_BINS: usize = 30;

/// Sturges' rule: `ceil(log2 n) + 1`.
pub fn sturges_bins(n: usize) -> usize {
    if n <= 1 {
        return 1;
    }
    (n as f64).log2().ceil() as usize + 1
}

/// Bin count used when none is requested: Sturges' rule capped at
/// [`MAX_AUTO_BINS`].
pub fn auto_bins(n: usize) -> usize {
    sturges_bins(n).min(MAX_AUTO_BINS)
}

/// Bin `values` into `bins` equal-width intervals; the last bin is closed.
///
/// `bins == 0` picks the count with [`auto_bins`]. A constant column gets a
/// single unit-wide bin centred on the value. Returns `None` for no values.
pub fn histogram(values: &[f64], bins: usize) -> Option<Histogram> {
    let (lo, hi) = min_max(values)?;
    let bins = if bins == 0 { auto_bins(values.len()) } else { bins };

    let (lo, hi, bins) = if hi > lo { (lo, hi, bins) } else { (lo - 0.5, hi + 0.5, 1) };
    let width = (hi - lo) / bins as f64;

    let edges: Vec<f64> = (0..=bins)
        .map(|i| if i == bins { hi } else { lo + width * i as f64 })
        .collect();

    let mut counts = vec![0usize; bins];
    for &v in values {
        let index = (((v - lo) / width).floor() as usize).min(bins - 1);
        counts[index] += 1;
    }

    let labels = edges
        .windows(2)
        .map(|w| format!("{:.2} - {:.2}", w[0], w[1]))
        .collect();

    Some(Histogram { edges, labels, counts })
}
