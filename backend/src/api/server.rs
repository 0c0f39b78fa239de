//! HTTP server for the datasmith API.
//!
//! One [`Engine`] is shared by every request through axum state.
//!
//! # API Endpoints
//!
//! | Method | Path                       | Description                              |
//! |--------|----------------------------|------------------------------------------|
//! | GET    | `/health`                  | Health check                             |
//! | POST   | `/api/upload`              | Upload a CSV file (multipart `file`)     |
//! | GET    | `/api/info`                | Dataset overview                         |
//! | POST   | `/api/selection`           | Select or deselect a column              |
//! | POST   | `/api/summary`             | Summary, correlation and projection      |
//! | POST   | `/api/summary/heatmap`     | Correlation heatmap (PNG body)           |
//! | POST   | `/api/summary/projection`  | Projection scatter (PNG body)            |
//! | POST   | `/api/correlation`         | Correlation matrix                       |
//! | POST   | `/api/projection`          | Two-component projection                 |
//! | POST   | `/api/transform/preview`   | Preview a transformation                 |
//! | POST   | `/api/transform/chart`     | PNG preview of a column or its output    |
//! | POST   | `/api/transform/apply`     | Apply a transformation                   |
//! | POST   | `/api/visualize`           | Render a chart (PNG body)                |
//! | GET    | `/api/head`                | First rows (`?n=5&columns=a,b`)          |
//! | GET    | `/api/nulls`               | Null counts per column                   |
//! | GET    | `/api/history`             | Applied transformations                  |
//! | GET    | `/api/history/export`      | Transformation log as a JSON document    |
//! | POST   | `/api/export`              | Selected columns as CSV                  |
//! | GET    | `/api/logs`                | SSE stream for real-time logs            |
//!
//! Parsing, analysis, transformation, rendering and export run on the
//! blocking pool.

use axum::{
    extract::{Multipart, Query, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, IntoResponse, Json, Response, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_error, log_info, LOG_BROADCASTER};
use super::types::{
    error_response, status_for, ColumnsRequest, HeadQuery, PreviewChartRequest, SelectionRequest, SummaryRequest,
    TransformRequest, UploadResponse, VisualizeRequest,
};
use crate::analysis::{CorrelationMatrix, ProjectionResult};
use crate::engine::{DatasetOverview, Engine, SummaryReport, TransformOutcome, TransformPreview};
use crate::error::{EngineError, RenderError};
use crate::models::Table;
use crate::stats::NullCount;
use crate::transform::{AppliedTransformation, TransformMode, TransformRecord};

type AppState = Arc<Engine>;
type ApiError = (StatusCode, Json<Value>);
type ApiResult<T> = Result<T, ApiError>;

fn engine_error(err: EngineError) -> ApiError {
    log_error(format!("{}: {}", err.code(), err));
    (status_for(&err), Json(error_response(err.code(), &err.to_string())))
}

fn bad_request(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(error_response("BadRequest", message)))
}

/// Run engine work on the blocking pool.
async fn blocking<T, F>(engine: AppState, work: F) -> ApiResult<T>
where
    F: FnOnce(&Engine) -> Result<T, EngineError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || work(&engine))
        .await
        .map_err(|e| {
            log_error(format!("Worker task failed: {}", e));
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(error_response("InternalError", &e.to_string())),
            )
        })?
        .map_err(engine_error)
}

/// Build the API router around a shared engine.
pub fn router(engine: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE, header::CONTENT_DISPOSITION]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/upload", post(upload_csv))
        .route("/api/info", get(info))
        .route("/api/selection", post(set_selection))
        .route("/api/summary", post(summary))
        .route("/api/summary/heatmap", post(summary_heatmap))
        .route("/api/summary/projection", post(summary_projection))
        .route("/api/correlation", post(correlation))
        .route("/api/projection", post(projection))
        .route("/api/transform/preview", post(preview_transform))
        .route("/api/transform/chart", post(preview_chart))
        .route("/api/transform/apply", post(apply_transform))
        .route("/api/visualize", post(visualize))
        .route("/api/head", get(head))
        .route("/api/nulls", get(nulls))
        .route("/api/history", get(history))
        .route("/api/history/export", get(history_export))
        .route("/api/export", post(export_csv))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(engine)
}

/// Start the HTTP server
pub async fn start_server(engine: AppState, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(engine);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Datasmith server running on http://localhost:{}", port);
    tracing::info!("   POST /api/upload    - Upload CSV file");
    tracing::info!("   POST /api/visualize - Render a chart");
    tracing::info!("   GET  /api/logs      - SSE log stream");
    tracing::info!("   GET  /health        - Health check");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check endpoint
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "datasmith",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "upload": "POST /api/upload",
            "summary": "POST /api/summary",
            "transform": "POST /api/transform/{preview,apply}",
            "visualize": "POST /api/visualize",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint for real-time log streaming
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();

    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(entry) => {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        }
        Err(_) => None,
    });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Upload CSV endpoint
async fn upload_csv(State(engine): State<AppState>, mut multipart: Multipart) -> ApiResult<Json<UploadResponse>> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(&format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            file_name = field.file_name().map(|s| s.to_string());
            file_data = Some(
                field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(&format!("Read error: {}", e)))?
                    .to_vec(),
            );
        }
    }

    let bytes = file_data.ok_or_else(|| bad_request("No file provided"))?;
    log_info(format!(
        "📄 New upload: {} ({} bytes)",
        file_name.as_deref().unwrap_or("unknown"),
        bytes.len()
    ));

    let load = blocking(engine, move |engine| engine.load_csv_bytes(&bytes)).await?;
    Ok(Json(UploadResponse {
        status: "ready".to_string(),
        file_name,
        load,
    }))
}

async fn info(State(engine): State<AppState>) -> ApiResult<Json<DatasetOverview>> {
    engine.info().map(Json).map_err(engine_error)
}

async fn set_selection(State(engine): State<AppState>, Json(request): Json<SelectionRequest>) -> ApiResult<Json<Value>> {
    engine
        .set_column_selection(&request.column, request.selected)
        .map_err(engine_error)?;
    Ok(Json(json!({
        "column": request.column,
        "selected": request.selected,
    })))
}

async fn summary(State(engine): State<AppState>, Json(request): Json<SummaryRequest>) -> ApiResult<Json<SummaryReport>> {
    blocking(engine, move |engine| engine.summary_report(request.columns.as_deref()))
        .await
        .map(Json)
}

async fn summary_heatmap(State(engine): State<AppState>, Json(request): Json<ColumnsRequest>) -> ApiResult<Response> {
    let chart = blocking(engine, move |engine| engine.correlation_heatmap(&request.columns)).await?;
    Ok(png_response(chart.png))
}

async fn summary_projection(State(engine): State<AppState>, Json(request): Json<ColumnsRequest>) -> ApiResult<Response> {
    let chart = blocking(engine, move |engine| engine.projection_chart(&request.columns)).await?;
    Ok(png_response(chart.png))
}

async fn correlation(
    State(engine): State<AppState>,
    Json(request): Json<ColumnsRequest>,
) -> ApiResult<Json<Option<CorrelationMatrix>>> {
    blocking(engine, move |engine| engine.correlate(&request.columns))
        .await
        .map(Json)
}

async fn projection(
    State(engine): State<AppState>,
    Json(request): Json<ColumnsRequest>,
) -> ApiResult<Json<Option<ProjectionResult>>> {
    blocking(engine, move |engine| engine.project(&request.columns))
        .await
        .map(Json)
}

async fn preview_transform(
    State(engine): State<AppState>,
    Json(request): Json<TransformRequest>,
) -> ApiResult<Json<TransformPreview>> {
    if request.mode == TransformMode::Apply {
        return Err(bad_request("Use POST /api/transform/apply to commit a transformation"));
    }
    let outcome = blocking(engine, move |engine| {
        engine.transform(&request.column, request.transformation, request.mode, None)
    })
    .await?;
    match outcome {
        TransformOutcome::Preview(preview) => Ok(Json(preview)),
        TransformOutcome::Applied(_) => Err(bad_request("Unexpected commit")),
    }
}

async fn preview_chart(State(engine): State<AppState>, Json(request): Json<PreviewChartRequest>) -> ApiResult<Response> {
    let chart = blocking(engine, move |engine| match request.transformation {
        None => engine.preview_transformation(&request.column),
        Some(kind) => engine
            .preview_transformation_result(&request.column, kind)?
            .after
            .ok_or_else(|| {
                EngineError::Render(RenderError::NoRenderableData {
                    columns: vec![request.column.clone()],
                })
            }),
    })
    .await?;
    Ok(png_response(chart.png))
}

async fn apply_transform(
    State(engine): State<AppState>,
    Json(request): Json<TransformRequest>,
) -> ApiResult<Json<AppliedTransformation>> {
    blocking(engine, move |engine| {
        engine.apply_transformation(&request.column, request.transformation, request.names.as_deref())
    })
    .await
    .map(Json)
}

async fn visualize(State(engine): State<AppState>, Json(request): Json<VisualizeRequest>) -> ApiResult<Response> {
    let chart = blocking(engine, move |engine| engine.render(&request.columns, request.kind)).await?;
    Ok(png_response(chart.png))
}

async fn head(State(engine): State<AppState>, Query(query): Query<HeadQuery>) -> ApiResult<Json<Table>> {
    let columns = query.column_list();
    engine
        .head_preview(query.n, columns.as_deref())
        .map(Json)
        .map_err(engine_error)
}

async fn nulls(State(engine): State<AppState>) -> ApiResult<Json<Vec<NullCount>>> {
    engine.null_report().map(Json).map_err(engine_error)
}

async fn history(State(engine): State<AppState>) -> ApiResult<Json<Vec<TransformRecord>>> {
    engine.history().map(Json).map_err(engine_error)
}

async fn history_export(State(engine): State<AppState>) -> ApiResult<Response> {
    let json = engine.export_history_json().map_err(engine_error)?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/json"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"transformations.json\""),
        ],
        json,
    )
        .into_response())
}

async fn export_csv(State(engine): State<AppState>) -> ApiResult<Response> {
    let csv = blocking(engine, |engine| engine.export_csv()).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"dataset.csv\""),
        ],
        csv,
    )
        .into_response())
}

fn png_response(png: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "image/png")], png).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Column;
    use crate::render::ChartKind;
    use crate::transform::TransformKind;

    fn engine() -> AppState {
        let engine = Engine::default();
        engine
            .load_dataset(
                Table::new(vec![
                    Column::numeric("x", &[Some(1.0), Some(2.0), Some(3.0), Some(5.0)]),
                    Column::numeric("y", &[Some(2.0), Some(1.0), Some(4.0), Some(3.0)]),
                    Column::numeric("e", &[None, None, None, None]),
                ]),
                None,
            )
            .unwrap();
        Arc::new(engine)
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_visualize_returns_png() {
        let request = VisualizeRequest {
            columns: columns(&["x"]),
            kind: ChartKind::Histogram,
        };
        let response = visualize(State(engine()), Json(request)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    }

    #[tokio::test]
    async fn test_summary_charts_are_png() {
        let state = engine();
        let heatmap = summary_heatmap(
            State(state.clone()),
            Json(ColumnsRequest {
                columns: columns(&["x", "y"]),
            }),
        )
        .await
        .unwrap();
        assert_eq!(heatmap.headers()[header::CONTENT_TYPE], "image/png");

        let (status, _) = summary_projection(
            State(state),
            Json(ColumnsRequest {
                columns: columns(&["x"]),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_preview_of_empty_column() {
        let request = TransformRequest {
            column: "e".to_string(),
            transformation: TransformKind::DropNulls,
            mode: TransformMode::PreviewAndStage,
            names: None,
        };
        let Json(preview) = preview_transform(State(engine()), Json(request)).await.unwrap();
        assert!(preview.before.is_none());
        assert_eq!(preview.rows_removed, 4);
    }

    #[tokio::test]
    async fn test_blocking_maps_engine_errors() {
        let (status, Json(body)) = blocking(Arc::new(Engine::default()), |engine| engine.info())
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NoDataError");
    }
}
