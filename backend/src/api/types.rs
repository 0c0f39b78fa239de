//! REST API request and response types.
//!
//! Field names are camelCase on the wire; transformation and chart kinds
//! use their snake_case names (`"one_hot_encode"`, `"histogram"`).

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::engine::CsvLoadInfo;
use crate::error::{EngineError, RenderError, StoreError, TransformError};
use crate::render::ChartKind;
use crate::transform::{TransformKind, TransformMode};

/// Response sent after a CSV upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Always "ready" on success
    pub status: String,
    pub file_name: Option<String>,
    #[serde(flatten)]
    pub load: CsvLoadInfo,
}

/// Select or deselect one column.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRequest {
    pub column: String,
    pub selected: bool,
}

/// A list of column names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnsRequest {
    #[serde(default)]
    pub columns: Vec<String>,
}

/// Summary report request; no columns means every selected column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryRequest {
    #[serde(default)]
    pub columns: Option<Vec<String>>,
}

/// Preview or apply one transformation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformRequest {
    pub column: String,
    pub transformation: TransformKind,
    #[serde(default)]
    pub mode: TransformMode,
    /// Target names for the created columns (defaults when absent)
    #[serde(default)]
    pub names: Option<Vec<String>>,
}

/// Chart of a column, or of a transformation's output when
/// `transformation` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewChartRequest {
    pub column: String,
    #[serde(default)]
    pub transformation: Option<TransformKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualizeRequest {
    pub columns: Vec<String>,
    pub kind: ChartKind,
}

/// Query of `GET /api/head`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadQuery {
    pub n: Option<usize>,
    /// Comma-separated column names
    pub columns: Option<String>,
}

impl HeadQuery {
    pub fn column_list(&self) -> Option<Vec<String>> {
        self.columns.as_ref().map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect()
        })
    }
}

/// Create an error response
pub fn error_response(code: &str, error: &str) -> Value {
    json!({
        "status": "error",
        "code": code,
        "error": error,
    })
}

/// HTTP status for an engine error.
///
/// 404 for missing data or columns, 409 for name clashes, 422 for requests
/// the data cannot satisfy, 400 for malformed requests.
pub fn status_for(err: &EngineError) -> StatusCode {
    let store = match err {
        EngineError::Store(e)
        | EngineError::Transform(TransformError::Store(e))
        | EngineError::Render(RenderError::Store(e)) => Some(e),
        _ => None,
    };

    match (store, err) {
        (Some(StoreError::NoData | StoreError::UnknownColumn(_)), _) => StatusCode::NOT_FOUND,
        (Some(StoreError::DuplicateColumn(_)), _) => StatusCode::CONFLICT,
        (Some(StoreError::LockPoisoned(_)), _) => StatusCode::INTERNAL_SERVER_ERROR,
        (Some(_), _) => StatusCode::BAD_REQUEST,
        (None, EngineError::Transform(TransformError::TargetNameMismatch { .. })) => StatusCode::BAD_REQUEST,
        (None, EngineError::Transform(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        (None, EngineError::Render(RenderError::Encoding(_))) => StatusCode::INTERNAL_SERVER_ERROR,
        (None, EngineError::Render(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        (None, EngineError::Json(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        (None, _) => StatusCode::BAD_REQUEST,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CsvError;
    use crate::models::ColumnType;
    use crate::transform::Requirement;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (EngineError::Store(StoreError::NoData), StatusCode::NOT_FOUND),
            (
                EngineError::Render(RenderError::Store(StoreError::UnknownColumn("z".into()))),
                StatusCode::NOT_FOUND,
            ),
            (
                EngineError::Transform(TransformError::Store(StoreError::DuplicateColumn("a_log".into()))),
                StatusCode::CONFLICT,
            ),
            (
                EngineError::Transform(TransformError::RequirementViolation {
                    column: "a".into(),
                    kind: TransformKind::Log,
                    requirement: Requirement::AllPositive,
                }),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                EngineError::Render(RenderError::Unsupported {
                    kind: ChartKind::Pie,
                    column_types: vec![ColumnType::Numeric],
                }),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                EngineError::Store(StoreError::EmptySelection {
                    operation: "summarize".into(),
                }),
                StatusCode::BAD_REQUEST,
            ),
            (EngineError::Csv(CsvError::EmptyFile), StatusCode::BAD_REQUEST),
        ];

        for (err, status) in cases {
            assert_eq!(status_for(&err), status, "{err}");
        }
    }

    #[test]
    fn test_transform_request_defaults() {
        let request: TransformRequest =
            serde_json::from_str(r#"{"column": "B", "transformation": "oneHotEncode"}"#).unwrap();
        assert_eq!(request.transformation, TransformKind::OneHotEncode);
        assert_eq!(request.mode, TransformMode::PreviewOnly);
        assert!(request.names.is_none());
    }

    #[test]
    fn test_head_query_columns() {
        let query = HeadQuery {
            n: Some(3),
            columns: Some("a, b,,c".into()),
        };
        assert_eq!(query.column_list().unwrap(), vec!["a", "b", "c"]);
        assert!(HeadQuery::default().column_list().is_none());
    }

    #[test]
    fn test_error_response_shape() {
        let body = error_response("UnknownColumnError", "Unknown column: 'z'");
        assert_eq!(body["status"], "error");
        assert_eq!(body["code"], "UnknownColumnError");
    }
}
