//! Pairwise Pearson correlation with pairwise null exclusion.

use serde::Serialize;

/// Square correlation matrix indexed by column name.
///
/// An entry is `None` when the pair has fewer than two complete rows or
/// one side has zero variance over those rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }

    pub fn size(&self) -> usize {
        self.columns.len()
    }
}

/// Pearson coefficient over the rows where both values are present.
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .collect();

    if pairs.len() < 2 {
        return None;
    }

    let xs: Vec<f64> = pairs.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = pairs.iter().map(|p| p.1).collect();
    let mean_x = u_numflow::stats::mean(&xs)?;
    let mean_y = u_numflow::stats::mean(&ys)?;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in &pairs {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Correlation matrix of named numeric columns.
pub fn correlation_matrix(columns: &[(String, Vec<Option<f64>>)]) -> CorrelationMatrix {
    let values = columns
        .iter()
        .map(|(_, x)| columns.iter().map(|(_, y)| pearson(x, y)).collect())
        .collect();

    CorrelationMatrix {
        columns: columns.iter().map(|(name, _)| name.clone()).collect(),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_correlations() {
        let x = [Some(1.0), Some(2.0), Some(3.0)];
        let y = [Some(2.0), Some(4.0), Some(6.0)];
        let z = [Some(3.0), Some(2.0), Some(1.0)];
        assert!((pearson(&x, &y).unwrap() - 1.0).abs() < 1e-12);
        assert!((pearson(&x, &z).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pairwise_exclusion() {
        // Row 1 is dropped for this pair only.
        let x = [Some(1.0), None, Some(3.0), Some(4.0)];
        let y = [Some(1.0), Some(100.0), Some(3.0), Some(4.0)];
        assert!((pearson(&x, &y).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_undefined_entries() {
        let constant = [Some(5.0), Some(5.0), Some(5.0)];
        let x = [Some(1.0), Some(2.0), Some(3.0)];
        assert_eq!(pearson(&constant, &x), None);
        assert_eq!(pearson(&[Some(1.0)], &[Some(2.0)]), None);
    }

    #[test]
    fn test_matrix_is_symmetric() {
        let columns = vec![
            ("a".to_string(), vec![Some(1.0), Some(2.0), Some(4.0)]),
            ("b".to_string(), vec![Some(3.0), Some(1.0), Some(2.0)]),
        ];
        let matrix = correlation_matrix(&columns);
        assert_eq!(matrix.size(), 2);
        assert_eq!(matrix.get("a", "b"), matrix.get("b", "a"));
        assert!((matrix.get("a", "a").unwrap() - 1.0).abs() < 1e-12);
    }
}
