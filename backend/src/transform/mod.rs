//! Transformation engine.
//!
//! This module validates and executes column transformations:
//! - Kind: the closed catalog of transformations and their requirements
//! - Executor: plan (validate + compute) and apply (commit) steps
//! - History: records of applied transformations

pub mod executor;
pub mod history;
pub mod kind;

use serde::{Deserialize, Serialize};

pub use executor::{apply, plan, AppliedTransformation, PlannedOutput, TransformOptions, TransformPlan};
pub use history::{HistoryExport, TransformRecord};
pub use kind::{catalog_description, Applicability, Arity, KindSpec, Requirement, TransformKind};

/// How far a transformation request goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformMode {
    /// Output values and a chart of the source column.
    #[default]
    #[serde(alias = "previewOnly")]
    PreviewOnly,
    /// Additionally a chart of the transformed values.
    #[serde(alias = "previewAndStage")]
    PreviewAndStage,
    /// Commit to the dataset.
    Apply,
}
