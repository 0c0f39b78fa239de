//! Error types for the Datasmith engine.
//!
//! This module defines a hierarchy of error types, one per concern:
//!
//! - [`StoreError`] - Dataset store and column registry errors
//! - [`TransformError`] - Transformation validation errors
//! - [`RenderError`] - Chart rendering errors
//! - [`CsvError`] - CSV parsing and serialization errors
//! - [`ConfigError`] - Environment configuration errors
//! - [`EngineError`] - Top-level error returned by the [`crate::Engine`] facade
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

use crate::models::ColumnType;
use crate::render::ChartKind;
use crate::transform::{Requirement, TransformKind};

// =============================================================================
// Store Errors
// =============================================================================

/// Errors raised by the dataset store and its column registry.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    /// No dataset is loaded, or the loaded table has no columns.
    #[error("No dataset loaded")]
    NoData,

    /// Column name is not registered.
    #[error("Unknown column: '{0}'")]
    UnknownColumn(String),

    /// Column name is already registered.
    #[error("Column '{0}' already exists")]
    DuplicateColumn(String),

    /// An operation needing at least one column received none.
    #[error("No columns selected for {operation}")]
    EmptySelection { operation: String },

    /// Column length does not match the dataset row count.
    #[error("Column '{column}' has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// A numeric type hint was given for a column holding text.
    #[error("Column '{column}' cannot be {expected}: found text value '{value}'")]
    IncompatibleType {
        column: String,
        expected: ColumnType,
        value: String,
    },

    /// The store lock was poisoned by a panicking writer.
    #[error("Dataset lock poisoned: {0}")]
    LockPoisoned(String),
}

// =============================================================================
// Transformation Errors
// =============================================================================

/// Errors raised while validating or executing a transformation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransformError {
    /// Store-level failure (unknown column, duplicate target name, ...).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Transformation kind is not valid for the column's semantic type.
    #[error("Transformation '{kind}' is not supported for {column_type} column '{column}'")]
    Unsupported {
        column: String,
        kind: TransformKind,
        column_type: ColumnType,
    },

    /// The column violates the transformation's precondition.
    #[error("Transformation '{kind}' on column '{column}' requires {requirement}")]
    RequirementViolation {
        column: String,
        kind: TransformKind,
        requirement: Requirement,
    },

    /// Caller-supplied target names do not match the output arity.
    #[error("Transformation '{kind}' produces {expected} column(s), got {actual} name(s)")]
    TargetNameMismatch {
        kind: TransformKind,
        expected: usize,
        actual: usize,
    },
}

// =============================================================================
// Render Errors
// =============================================================================

/// Errors raised by the visualization renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Store-level failure (unknown column, empty selection, ...).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Chart kind is not allowed for the resolved arity/type combination.
    #[error("Visualization '{kind}' is not supported for {}", describe_types(.column_types))]
    Unsupported {
        kind: ChartKind,
        column_types: Vec<ColumnType>,
    },

    /// Every row had a null in one of the requested columns.
    #[error("No data available in [{}] after removing null values", .columns.join(", "))]
    NoRenderableData { columns: Vec<String> },

    /// PNG encoding failed.
    #[error("Failed to encode chart: {0}")]
    Encoding(#[from] image::ImageError),
}

fn describe_types(types: &[ColumnType]) -> String {
    match types {
        [] => "zero columns".to_string(),
        [only] => format!("one {only} column"),
        [x, y] => format!("a {x} / {y} column pair"),
        many => format!("{} columns", many.len()),
    }
}

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors during CSV parsing or serialization.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read or write a file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed CSV content.
    #[error("Invalid CSV format: {0}")]
    Parse(#[from] csv::Error),

    /// Empty input.
    #[error("CSV file is empty")]
    EmptyFile,

    /// Header row has no column names.
    #[error("No headers found in CSV")]
    NoHeaders,

    /// The csv reader only supports single-byte delimiters.
    #[error("Unsupported delimiter: '{0}'")]
    InvalidDelimiter(char),
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors while reading configuration from the environment.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

// =============================================================================
// Engine Errors (top-level)
// =============================================================================

/// Top-level engine error.
///
/// This is the error type returned by every [`crate::Engine`] operation.
/// It wraps the lower-level errors and exposes the stable taxonomy code the
/// transport layer reports to clients.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Store error.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Transformation error.
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// Rendering error.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Stable error code, one per taxonomy entry.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Store(e)
            | EngineError::Transform(TransformError::Store(e))
            | EngineError::Render(RenderError::Store(e)) => store_code(e),
            EngineError::Transform(TransformError::Unsupported { .. }) => "UnsupportedTransformationError",
            EngineError::Transform(TransformError::RequirementViolation { .. }) => "RequirementViolationError",
            EngineError::Transform(TransformError::TargetNameMismatch { .. }) => "TargetNameMismatchError",
            EngineError::Render(RenderError::Unsupported { .. }) => "UnsupportedVisualizationError",
            EngineError::Render(RenderError::NoRenderableData { .. }) => "NoRenderableDataError",
            EngineError::Render(RenderError::Encoding(_)) => "ChartEncodingError",
            EngineError::Csv(_) => "CsvError",
            EngineError::Json(_) => "SerializationError",
        }
    }
}

fn store_code(err: &StoreError) -> &'static str {
    match err {
        StoreError::NoData => "NoDataError",
        StoreError::UnknownColumn(_) => "UnknownColumnError",
        StoreError::DuplicateColumn(_) => "DuplicateColumnError",
        StoreError::EmptySelection { .. } => "EmptySelectionError",
        StoreError::LengthMismatch { .. } => "LengthMismatchError",
        StoreError::IncompatibleType { .. } => "IncompatibleTypeError",
        StoreError::LockPoisoned(_) => "LockPoisonedError",
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for transformation operations.
pub type TransformResult<T> = Result<T, TransformError>;

/// Result type for rendering operations.
pub type RenderResult<T> = Result<T, RenderError>;

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        // StoreError -> TransformError -> EngineError
        let store_err = StoreError::UnknownColumn("price".into());
        let transform_err: TransformError = store_err.into();
        let engine_err: EngineError = transform_err.into();
        assert!(engine_err.to_string().contains("price"));
        assert_eq!(engine_err.code(), "UnknownColumnError");

        // CsvError -> EngineError
        let engine_err: EngineError = CsvError::EmptyFile.into();
        assert!(engine_err.to_string().contains("empty"));
    }

    #[test]
    fn test_requirement_violation_format() {
        let err = TransformError::RequirementViolation {
            column: "price".into(),
            kind: TransformKind::Log,
            requirement: Requirement::AllPositive,
        };
        let msg = err.to_string();
        assert!(msg.contains("price"));
        assert!(msg.contains("log"));
        assert!(msg.contains("> 0"));
        assert_eq!(EngineError::from(err).code(), "RequirementViolationError");
    }

    #[test]
    fn test_unsupported_visualization_format() {
        let err = RenderError::Unsupported {
            kind: ChartKind::Pie,
            column_types: vec![ColumnType::Numeric],
        };
        assert_eq!(err.to_string(), "Visualization 'pie' is not supported for one numeric column");
        assert_eq!(EngineError::from(err).code(), "UnsupportedVisualizationError");
    }
}
