//! Numeric helpers shared by the statistics, transformation and analysis
//! modules.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::{Cell, ColumnType};

/// Non-null numeric values of a column view.
pub fn present(values: &[Option<f64>]) -> Vec<f64> {
    values.iter().flatten().copied().collect()
}

/// Arithmetic mean, `None` when empty.
pub fn mean(values: &[f64]) -> Option<f64> {
    u_numflow::stats::mean(values)
}

/// Sample standard deviation (ddof = 1). `None` below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    u_numflow::stats::std_dev(values)
}

pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    Some((u_numflow::stats::min(values)?, u_numflow::stats::max(values)?))
}

/// Quantile `q` in [0, 1], linear interpolation between the two closest
/// ranks.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    u_numflow::stats::quantile(values, q.clamp(0.0, 1.0))
}

pub fn median(values: &[f64]) -> Option<f64> {
    u_numflow::stats::median(values)
}

/// Distinct non-null category keys, in first-seen order.
pub fn categories(cells: &[Cell]) -> Vec<String> {
    let mut seen = HashMap::new();
    let mut order = Vec::new();
    for key in cells.iter().filter_map(Cell::category_key) {
        if !seen.contains_key(&key) {
            seen.insert(key.clone(), order.len());
            order.push(key);
        }
    }
    order
}

/// Category frequencies, most frequent first; ties keep first-seen order.
pub fn value_counts(cells: &[Cell]) -> Vec<(String, usize)> {
    let order = categories(cells);
    let mut counts: HashMap<String, usize> = HashMap::with_capacity(order.len());
    for key in cells.iter().filter_map(Cell::category_key) {
        *counts.entry(key).or_default() += 1;
    }
    let mut out: Vec<(String, usize)> = order
        .into_iter()
        .map(|k| {
            let n = counts.get(&k).copied().unwrap_or(0);
            (k, n)
        })
        .collect();
    // stable sort keeps first-seen order among equal counts
    out.sort_by(|a, b| b.1.cmp(&a.1));
    out
}

/// Compact before/after description of a column's values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ValueStats {
    #[serde(rename_all = "camelCase")]
    Numeric {
        count: usize,
        mean: Option<f64>,
        std: Option<f64>,
        min: Option<f64>,
        max: Option<f64>,
    },
    #[serde(rename_all = "camelCase")]
    Categorical {
        count: usize,
        unique_values: usize,
        /// Up to three most frequent categories.
        top_values: Vec<(String, usize)>,
    },
}

impl ValueStats {
    pub fn of(cells: &[Cell], column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Numeric => {
                let values: Vec<f64> = cells.iter().filter_map(Cell::as_f64).collect();
                let range = min_max(&values);
                ValueStats::Numeric {
                    count: values.len(),
                    mean: mean(&values),
                    std: sample_std(&values),
                    min: range.map(|r| r.0),
                    max: range.map(|r| r.1),
                }
            }
            ColumnType::Categorical => {
                let counts = value_counts(cells);
                ValueStats::Categorical {
                    count: cells.iter().filter(|c| !c.is_null()).count(),
                    unique_values: counts.len(),
                    top_values: counts.into_iter().take(3).collect(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantiles_interpolate() {
        let values = [4.0, 1.0, 3.0, 2.0];
        assert!((quantile(&values, 0.25).unwrap() - 1.75).abs() < 1e-12);
        assert!((quantile(&values, 0.75).unwrap() - 3.25).abs() < 1e-12);
        assert!((median(&values).unwrap() - 2.5).abs() < 1e-12);
        assert_eq!(quantile(&[], 0.5), None);
        assert_eq!(min_max(&values), Some((1.0, 4.0)));
    }

    #[test]
    fn test_sample_std() {
        let std = sample_std(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((std - 1.290_994).abs() < 1e-5);
        assert_eq!(sample_std(&[5.0]), None);
    }

    #[test]
    fn test_value_counts_order() {
        let cells: Vec<Cell> = ["b", "a", "a", "c", "b"]
            .iter()
            .map(|s| Cell::Text(s.to_string()))
            .collect();
        let counts = value_counts(&cells);
        assert_eq!(counts[0], ("b".to_string(), 2));
        assert_eq!(counts[1], ("a".to_string(), 2));
        assert_eq!(counts[2], ("c".to_string(), 1));
        assert_eq!(categories(&cells), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_value_stats_numeric() {
        let cells = vec![Cell::Number(1.0), Cell::Null, Cell::Number(3.0)];
        match ValueStats::of(&cells, ColumnType::Numeric) {
            ValueStats::Numeric { count, mean, min, max, .. } => {
                assert_eq!(count, 2);
                assert_eq!(mean, Some(2.0));
                assert_eq!(min, Some(1.0));
                assert_eq!(max, Some(3.0));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
