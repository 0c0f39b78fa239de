//! Transformation executor.
//!
//! Execution is split in two steps so that previews and commits share one
//! code path:
//!
//! 1. [`plan`] validates the request against the dataset (column exists,
//!    kind valid for the column type, requirement satisfied) and computes
//!    the output values without touching the dataset.
//! 2. [`apply`] checks the target names and commits the plan: derived
//!    columns through `register_derived`, or the row mask for `drop_nulls`.
//!
//! The caller must hold the dataset's write lock across both steps when
//! applying, so the plan is committed against the data it was computed
//! from.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use super::history::TransformRecord;
use super::kind::{Requirement, TransformKind};
use crate::error::{StoreError, TransformError, TransformResult};
use crate::models::{Cell, Column, ColumnType, Table};
use crate::stats::describe::{self, ValueStats};
use crate::store::Dataset;

/// Options for transformation planning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformOptions {
    /// Upper bound on the categories `one_hot_encode` accepts.
    pub max_one_hot_categories: usize,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            max_one_hot_categories: 10,
        }
    }
}

/// A computed output column awaiting its final name.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedColumn {
    pub default_name: String,
    pub values: Vec<Cell>,
}

/// What committing a plan does to the dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannedOutput {
    /// Register new numeric columns.
    Columns(Vec<PlannedColumn>),
    /// Keep only the rows whose mask entry is `true`.
    DropRows { keep: Vec<bool>, surviving: Vec<Cell> },
}

/// A validated, fully computed transformation.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformPlan {
    pub column: String,
    pub kind: TransformKind,
    pub source_type: ColumnType,
    pub output: PlannedOutput,
}

impl TransformPlan {
    /// Names the outputs get when the caller supplies none.
    pub fn default_names(&self) -> Vec<String> {
        match &self.output {
            PlannedOutput::Columns(columns) => columns.iter().map(|c| c.default_name.clone()).collect(),
            PlannedOutput::DropRows { .. } => Vec::new(),
        }
    }

    pub fn rows_removed(&self) -> usize {
        match &self.output {
            PlannedOutput::Columns(_) => 0,
            PlannedOutput::DropRows { keep, .. } => keep.iter().filter(|k| !**k).count(),
        }
    }

    /// Output values as a table under the default names.
    ///
    /// For `drop_nulls` this is the source column restricted to the
    /// surviving rows.
    pub fn result_table(&self) -> Table {
        match &self.output {
            PlannedOutput::Columns(columns) => Table::new(
                columns
                    .iter()
                    .map(|c| Column::new(c.default_name.clone(), c.values.clone()))
                    .collect(),
            ),
            PlannedOutput::DropRows { surviving, .. } => {
                Table::new(vec![Column::new(self.column.clone(), surviving.clone())])
            }
        }
    }

    /// Cells and type of the "after" view: first output, or the filtered
    /// source.
    pub fn after_cells(&self) -> Option<(&[Cell], ColumnType)> {
        match &self.output {
            PlannedOutput::Columns(columns) => columns.first().map(|c| (c.values.as_slice(), ColumnType::Numeric)),
            PlannedOutput::DropRows { surviving, .. } => Some((surviving.as_slice(), self.source_type)),
        }
    }
}

/// Result of a committed transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedTransformation {
    pub column: String,
    pub transformation: TransformKind,
    pub created_columns: Vec<String>,
    pub rows_removed: usize,
    pub row_count: usize,
}

// =============================================================================
// Planning
// =============================================================================

/// Validate `kind` on `column` and compute its output.
pub fn plan(
    dataset: &Dataset,
    column: &str,
    kind: TransformKind,
    options: &TransformOptions,
) -> TransformResult<TransformPlan> {
    let descriptor = dataset.descriptor(column)?;
    let source_type = descriptor.column_type;

    if !kind.spec().applies_to.accepts(source_type) {
        return Err(TransformError::Unsupported {
            column: column.to_string(),
            kind,
            column_type: source_type,
        });
    }

    let cells = dataset.cells(column)?;
    let output = compute(column, kind, cells, options)?;

    Ok(TransformPlan {
        column: column.to_string(),
        kind,
        source_type,
        output,
    })
}

fn compute(
    column: &str,
    kind: TransformKind,
    cells: &[Cell],
    options: &TransformOptions,
) -> TransformResult<PlannedOutput> {
    let violation = |requirement: Requirement| TransformError::RequirementViolation {
        column: column.to_string(),
        kind,
        requirement,
    };
    let single = |values: Vec<Cell>| {
        let suffix = kind.spec().suffix.unwrap_or(kind.as_str());
        PlannedOutput::Columns(vec![PlannedColumn {
            default_name: format!("{column}_{suffix}"),
            values,
        }])
    };

    let numbers: Vec<Option<f64>> = cells.iter().map(Cell::as_f64).collect();
    let present = describe::present(&numbers);

    let output = match kind {
        TransformKind::Log => {
            if present.iter().any(|v| *v <= 0.0) {
                return Err(violation(Requirement::AllPositive));
            }
            single(map_numbers(&numbers, f64::ln))
        }
        TransformKind::Sqrt => {
            if present.iter().any(|v| *v < 0.0) {
                return Err(violation(Requirement::AllNonNegative));
            }
            single(map_numbers(&numbers, f64::sqrt))
        }
        TransformKind::Standardize => {
            let (mean, std) = match (describe::mean(&present), describe::sample_std(&present)) {
                (Some(mean), Some(std)) if std > 0.0 => (mean, std),
                _ => return Err(violation(Requirement::PositiveStd)),
            };
            single(map_numbers(&numbers, |v| (v - mean) / std))
        }
        TransformKind::MinMax => {
            let (lo, hi) = match describe::min_max(&present) {
                Some((lo, hi)) if hi > lo => (lo, hi),
                _ => return Err(violation(Requirement::PositiveRange)),
            };
            single(map_numbers(&numbers, |v| (v - lo) / (hi - lo)))
        }
        TransformKind::FillMean | TransformKind::FillMedian => {
            let fill = match kind {
                TransformKind::FillMean => describe::mean(&present),
                _ => describe::median(&present),
            };
            let fill = fill.ok_or_else(|| violation(Requirement::AnyNonNull))?;
            single(numbers.iter().map(|v| Cell::number(v.unwrap_or(fill))).collect())
        }
        TransformKind::DropNulls => {
            let keep: Vec<bool> = cells.iter().map(|c| !c.is_null()).collect();
            let surviving = cells.iter().filter(|c| !c.is_null()).cloned().collect();
            PlannedOutput::DropRows { keep, surviving }
        }
        TransformKind::LabelEncode => {
            let codes: HashMap<String, usize> = describe::categories(cells)
                .into_iter()
                .enumerate()
                .map(|(code, category)| (category, code))
                .collect();
            single(
                cells
                    .iter()
                    .map(|c| match c.category_key() {
                        Some(key) => Cell::Number(codes[&key] as f64),
                        None => Cell::Null,
                    })
                    .collect(),
            )
        }
        TransformKind::OneHotEncode => {
            let categories = describe::categories(cells);
            if categories.len() > options.max_one_hot_categories {
                return Err(violation(Requirement::MaxCardinality {
                    max: options.max_one_hot_categories,
                    actual: categories.len(),
                }));
            }
            let keys: Vec<Option<String>> = cells.iter().map(Cell::category_key).collect();
            let columns = categories
                .into_iter()
                .map(|category| {
                    let values = keys
                        .iter()
                        .map(|k| Cell::Number(if k.as_deref() == Some(category.as_str()) { 1.0 } else { 0.0 }))
                        .collect();
                    PlannedColumn {
                        default_name: format!("{column}_{category}"),
                        values,
                    }
                })
                .collect();
            PlannedOutput::Columns(columns)
        }
    };

    Ok(output)
}

fn map_numbers(values: &[Option<f64>], f: impl Fn(f64) -> f64) -> Vec<Cell> {
    values.iter().map(|v| Cell::from_option(v.map(&f))).collect()
}

// =============================================================================
// Commit
// =============================================================================

/// Commit `plan` to `dataset`, naming outputs with `names` or the defaults.
///
/// Fails with `TargetNameMismatch` when `names` has the wrong length and
/// `DuplicateColumn` when a target is already registered (or repeated). On
/// error nothing is committed.
pub fn apply(
    dataset: &mut Dataset,
    plan: TransformPlan,
    names: Option<&[String]>,
) -> TransformResult<AppliedTransformation> {
    let before = ValueStats::of(dataset.cells(&plan.column)?, plan.source_type);
    let after = plan.after_cells().map(|(cells, column_type)| ValueStats::of(cells, column_type));
    let names = target_names(dataset, &plan, names)?;

    let TransformPlan { column, kind, output, .. } = plan;
    let mut rows_removed = 0;

    match output {
        PlannedOutput::Columns(columns) => {
            for (name, planned) in names.iter().zip(columns) {
                dataset.register_derived(name, &column, kind, ColumnType::Numeric, planned.values)?;
            }
        }
        PlannedOutput::DropRows { keep, .. } => {
            rows_removed = dataset.retain_rows(&keep)?;
        }
    }

    dataset.push_history(TransformRecord {
        timestamp: Utc::now(),
        transformation: kind,
        column: column.clone(),
        created_columns: names.clone(),
        rows_removed,
        before,
        after,
    });

    Ok(AppliedTransformation {
        column,
        transformation: kind,
        created_columns: names,
        rows_removed,
        row_count: dataset.row_count(),
    })
}

fn target_names(dataset: &Dataset, plan: &TransformPlan, names: Option<&[String]>) -> TransformResult<Vec<String>> {
    let defaults = plan.default_names();
    let names: Vec<String> = match names {
        Some(given) if !given.is_empty() || defaults.is_empty() => given.to_vec(),
        _ => defaults.clone(),
    };

    if names.len() != defaults.len() {
        return Err(TransformError::TargetNameMismatch {
            kind: plan.kind,
            expected: defaults.len(),
            actual: names.len(),
        });
    }

    let mut seen = HashSet::new();
    for name in &names {
        if dataset.registry().contains(name) || !seen.insert(name.as_str()) {
            return Err(StoreError::DuplicateColumn(name.clone()).into());
        }
    }

    Ok(names)
}
