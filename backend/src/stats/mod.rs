//! Statistics computer.
//!
//! Produces per-column descriptive statistics for a requested column subset:
//!
//! - [`summarize`] - one [`SummaryRecord`] per selected requested column
//! - [`null_report`] - null counts for every column
//! - [`histogram`] - equal-width binning (Sturges' rule when unspecified)

pub mod describe;
pub mod histogram;

use serde::Serialize;
use std::collections::HashSet;

use crate::error::StoreResult;
use crate::models::{Cell, ColumnType};
use crate::store::Dataset;

pub use describe::{mean, median, quantile, sample_std, ValueStats};
pub use histogram::{auto_bins, histogram, sturges_bins, Histogram, MAX_AUTO_BINS};

/// Descriptive statistics of one column.
///
/// Numeric fields are `None` for categorical columns and for columns with no
/// usable values.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRecord {
    pub column: String,
    pub column_type: ColumnType,
    pub count: usize,
    pub unique_count: usize,
    pub null_count: usize,
    pub null_percentage: f64,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub p25: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub max: Option<f64>,
}

/// Ordered `column -> SummaryRecord` mapping, in request order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Summary {
    pub records: Vec<SummaryRecord>,
}

impl Summary {
    pub fn get(&self, column: &str) -> Option<&SummaryRecord> {
        self.records.iter().find(|r| r.column == column)
    }

    pub fn columns(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.column.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Summarize the selected columns among `columns`.
///
/// Unselected columns are skipped; an empty request is an
/// `EmptySelection` error and an unknown name an `UnknownColumn` error.
pub fn summarize(dataset: &Dataset, columns: &[String]) -> StoreResult<Summary> {
    let descriptors = dataset.selected(columns, "summarize")?;
    let mut seen = HashSet::new();

    let records = descriptors
        .into_iter()
        .filter(|d| seen.insert(d.name.clone()))
        .map(|d| {
            let cells = dataset.cells(&d.name)?;
            Ok(summarize_cells(&d.name, d.column_type, cells, dataset.row_count()))
        })
        .collect::<StoreResult<Vec<_>>>()?;

    Ok(Summary { records })
}

fn summarize_cells(name: &str, column_type: ColumnType, cells: &[Cell], row_count: usize) -> SummaryRecord {
    let count = cells.iter().filter(|c| !c.is_null()).count();
    let unique_count = describe::categories(cells).len();
    let null_count = row_count - count;

    let mut record = SummaryRecord {
        column: name.to_string(),
        column_type,
        count,
        unique_count,
        null_count,
        null_percentage: percentage(null_count, row_count),
        mean: None,
        std: None,
        min: None,
        p25: None,
        p50: None,
        p75: None,
        max: None,
    };

    if column_type == ColumnType::Numeric {
        let values: Vec<f64> = cells.iter().filter_map(Cell::as_f64).collect();
        let range = describe::min_max(&values);
        record.mean = mean(&values);
        record.std = sample_std(&values);
        record.min = range.map(|r| r.0);
        record.p25 = quantile(&values, 0.25);
        record.p50 = median(&values);
        record.p75 = quantile(&values, 0.75);
        record.max = range.map(|r| r.1);
    }

    record
}

fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

// =============================================================================
// Null analysis
// =============================================================================

/// Null counts of one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NullCount {
    pub column: String,
    pub null_count: usize,
    pub null_percentage: f64,
    pub total_rows: usize,
}

/// Null counts of every registered column, in registry order.
pub fn null_report(dataset: &Dataset) -> StoreResult<Vec<NullCount>> {
    dataset
        .registry()
        .iter()
        .map(|d| {
            let null_count = dataset.cells(&d.name)?.iter().filter(|c| c.is_null()).count();
            Ok(NullCount {
                column: d.name.clone(),
                null_count,
                null_percentage: percentage(null_count, dataset.row_count()),
                total_rows: dataset.row_count(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::models::{Column, Table};
    use std::collections::HashMap;

    fn dataset() -> Dataset {
        let table = Table::new(vec![
            Column::numeric("A", &[Some(1.0), Some(2.0), Some(3.0), Some(4.0)]),
            Column::text("B", &[Some("x"), Some("y"), Some("x"), None]),
            Column::numeric("C", &[None, None, None, None]),
        ]);
        Dataset::from_table(table, &HashMap::new()).unwrap()
    }

    fn close(a: Option<f64>, b: f64) -> bool {
        a.map(|a| (a - b).abs() < 1e-2).unwrap_or(false)
    }

    #[test]
    fn test_numeric_summary() {
        let summary = summarize(&dataset(), &["A".to_string()]).unwrap();
        let a = summary.get("A").unwrap();

        assert_eq!(a.count, 4);
        assert_eq!(a.unique_count, 4);
        assert_eq!(a.null_count, 0);
        assert_eq!(a.mean, Some(2.5));
        assert!(close(a.std, 1.29));
        assert_eq!(a.min, Some(1.0));
        assert_eq!(a.p25, Some(1.75));
        assert_eq!(a.p50, Some(2.5));
        assert_eq!(a.p75, Some(3.25));
        assert_eq!(a.max, Some(4.0));
    }

    #[test]
    fn test_categorical_and_all_null() {
        let summary = summarize(&dataset(), &["B".to_string(), "C".to_string()]).unwrap();

        let b = summary.get("B").unwrap();
        assert_eq!((b.count, b.unique_count, b.null_count), (3, 2, 1));
        assert_eq!(b.null_percentage, 25.0);
        assert!(b.mean.is_none());

        let c = summary.get("C").unwrap();
        assert_eq!(c.count, 0);
        assert!(c.mean.is_none() && c.p50.is_none());
    }

    #[test]
    fn test_unselected_omitted() {
        let mut dataset = dataset();
        dataset.set_selected("B", false).unwrap();
        let summary = summarize(&dataset, &["A".to_string(), "B".to_string()]).unwrap();
        assert_eq!(summary.columns(), vec!["A"]);
    }

    #[test]
    fn test_empty_and_unknown() {
        let err = summarize(&dataset(), &[]).unwrap_err();
        assert!(matches!(err, StoreError::EmptySelection { .. }));

        let err = summarize(&dataset(), &["Z".to_string()]).unwrap_err();
        assert_eq!(err, StoreError::UnknownColumn("Z".into()));
    }

    #[test]
    fn test_null_report() {
        let report = null_report(&dataset()).unwrap();
        assert_eq!(report.len(), 3);
        assert_eq!(report[2].null_count, 4);
        assert_eq!(report[2].null_percentage, 100.0);
    }
}
