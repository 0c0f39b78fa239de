//! Correlation and projection analysis over the numeric, selected columns.
//!
//! ```rust,ignore
//! let dataset = store.read()?;
//! if let Some(matrix) = analysis::correlate(&dataset, &columns)? {
//!     println!("{:?}", matrix.get("price", "quantity"));
//! }
//! ```

pub mod correlation;
pub mod projection;

use std::collections::HashSet;

use crate::error::StoreResult;
use crate::store::Dataset;

pub use correlation::{correlation_matrix, pearson, CorrelationMatrix};
pub use projection::ProjectionResult;

/// Numeric, selected columns among `columns`, deduplicated, in request
/// order.
fn numeric_columns(dataset: &Dataset, columns: &[String], operation: &str) -> StoreResult<Vec<(String, Vec<Option<f64>>)>> {
    let mut seen = HashSet::new();
    dataset
        .selected(columns, operation)?
        .into_iter()
        .filter(|d| d.is_numeric() && seen.insert(d.name.clone()))
        .map(|d| Ok((d.name.clone(), dataset.numeric_values(&d.name)?)))
        .collect()
}

/// Pearson correlation matrix, `None` below two numeric selected columns.
pub fn correlate(dataset: &Dataset, columns: &[String]) -> StoreResult<Option<CorrelationMatrix>> {
    let numeric = numeric_columns(dataset, columns, "correlate")?;
    if numeric.len() < 2 {
        return Ok(None);
    }
    Ok(Some(correlation_matrix(&numeric)))
}

/// Two-component projection, `None` when not computable.
pub fn project(dataset: &Dataset, columns: &[String], standardize: bool) -> StoreResult<Option<ProjectionResult>> {
    let numeric = numeric_columns(dataset, columns, "project")?;
    Ok(projection::project(&numeric, standardize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Column, Table};
    use std::collections::HashMap;

    fn dataset() -> Dataset {
        let table = Table::new(vec![
            Column::numeric("x", &[Some(1.0), Some(2.0), Some(3.0), Some(4.0)]),
            Column::numeric("y", &[Some(1.5), Some(2.5), Some(2.0), Some(5.0)]),
            Column::text("label", &[Some("a"), Some("b"), Some("a"), Some("b")]),
        ]);
        Dataset::from_table(table, &HashMap::new()).unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_correlate_ignores_categorical() {
        let matrix = correlate(&dataset(), &names(&["x", "label", "y"])).unwrap().unwrap();
        assert_eq!(matrix.columns, vec!["x", "y"]);
    }

    #[test]
    fn test_not_available_with_one_numeric() {
        let ds = dataset();
        assert!(correlate(&ds, &names(&["x", "label"])).unwrap().is_none());
        assert!(project(&ds, &names(&["x"]), true).unwrap().is_none());
    }

    #[test]
    fn test_unselected_excluded() {
        let mut ds = dataset();
        ds.set_selected("y", false).unwrap();
        assert!(correlate(&ds, &names(&["x", "y"])).unwrap().is_none());
    }

    #[test]
    fn test_project_points_per_row() {
        let result = project(&dataset(), &names(&["x", "y"]), true).unwrap().unwrap();
        assert_eq!(result.points.len(), 4);
        assert_eq!(result.columns, vec!["x", "y"]);
    }
}
