//! Two-component principal projection.
//!
//! Listwise deletion, optional z-scoring, covariance, symmetric
//! eigen-decomposition, then scores on the two leading eigenvectors.

use serde::Serialize;
use u_numflow::matrix::Matrix;

const VARIANCE_EPS: f64 = 1e-15;

/// Result of [`project`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub columns: Vec<String>,
    /// One `(pc1, pc2)` pair per retained row.
    pub points: Vec<(f64, f64)>,
    /// Original row index of each point.
    pub row_indices: Vec<usize>,
    pub explained_variance_ratio: [f64; 2],
    /// Unit loading vector of each component, one weight per column.
    pub loadings: [Vec<f64>; 2],
}

/// Project the named numeric columns onto their two directions of maximum
/// variance.
///
/// Returns `None` for fewer than 2 columns, fewer complete rows than
/// columns (or than 2), zero total variance, or a failed decomposition.
pub fn project(columns: &[(String, Vec<Option<f64>>)], standardize: bool) -> Option<ProjectionResult> {
    let d = columns.len();
    if d < 2 {
        return None;
    }

    let rows = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
    let mut row_indices = Vec::new();
    let mut data: Vec<Vec<f64>> = Vec::new();
    for i in 0..rows {
        let row: Option<Vec<f64>> = columns.iter().map(|(_, v)| v[i]).collect();
        if let Some(row) = row {
            row_indices.push(i);
            data.push(row);
        }
    }

    let n = data.len();
    if n < 2 || n < d {
        return None;
    }

    let centered = center(&data, standardize);
    let covariance = Matrix::new(d, d, covariance(&centered, d)).ok()?;
    let (eigenvalues, eigenvectors) = covariance.eigen_symmetric().ok()?;

    let total: f64 = eigenvalues.iter().sum();
    if total <= VARIANCE_EPS {
        return None;
    }

    let mut order: Vec<usize> = (0..d).collect();
    order.sort_by(|&a, &b| eigenvalues[b].total_cmp(&eigenvalues[a]));

    let loading = |component: usize| -> Vec<f64> {
        let mut vector: Vec<f64> = (0..d).map(|feature| eigenvectors.get(feature, component)).collect();
        // largest-magnitude weight is positive
        let pivot = vector
            .iter()
            .copied()
            .max_by(|a, b| a.abs().total_cmp(&b.abs()))
            .unwrap_or(0.0);
        if pivot < 0.0 {
            vector.iter_mut().for_each(|w| *w = -*w);
        }
        vector
    };
    let loadings = [loading(order[0]), loading(order[1])];

    let dot = |row: &[f64], weights: &[f64]| row.iter().zip(weights).map(|(x, w)| x * w).sum::<f64>();
    let points = centered
        .iter()
        .map(|row| (dot(row.as_slice(), loadings[0].as_slice()), dot(row.as_slice(), loadings[1].as_slice())))
        .collect();

    let ratio = |component: usize| (eigenvalues[component] / total).max(0.0);

    Some(ProjectionResult {
        columns: columns.iter().map(|(name, _)| name.clone()).collect(),
        points,
        row_indices,
        explained_variance_ratio: [ratio(order[0]), ratio(order[1])],
        loadings,
    })
}

/// Subtract column means; with `standardize`, divide by the population std
/// (constant columns stay at zero).
fn center(data: &[Vec<f64>], standardize: bool) -> Vec<Vec<f64>> {
    let n = data.len() as f64;
    let d = data[0].len();

    let means: Vec<f64> = (0..d).map(|j| data.iter().map(|r| r[j]).sum::<f64>() / n).collect();
    let scales: Vec<f64> = (0..d)
        .map(|j| {
            if !standardize {
                return 1.0;
            }
            let var = data.iter().map(|r| (r[j] - means[j]).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            if std < VARIANCE_EPS {
                1.0
            } else {
                std
            }
        })
        .collect();

    data.iter()
        .map(|row| (0..d).map(|j| (row[j] - means[j]) / scales[j]).collect())
        .collect()
}

/// Row-major sample covariance (n - 1) of centred rows.
fn covariance(centered: &[Vec<f64>], d: usize) -> Vec<f64> {
    let mut cov = vec![0.0; d * d];
    for row in centered {
        for i in 0..d {
            for j in i..d {
                let v = row[i] * row[j];
                cov[i * d + j] += v;
                if i != j {
                    cov[j * d + i] += v;
                }
            }
        }
    }
    let scale = 1.0 / (centered.len() - 1) as f64;
    cov.iter_mut().for_each(|v| *v *= scale);
    cov
}
