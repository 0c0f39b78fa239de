//! Engine facade.
//!
//! This module ties the components together behind one owned [`Engine`]:
//! loading, column selection, statistics, correlation and projection,
//! transformation previews and commits, chart rendering and export.
//!
//! Every operation takes exactly one lock on the dataset store. Reads hold
//! one read lock for their whole duration, applied transformations validate,
//! compute and commit under one write lock.
//!
//! # Example
//!
//! ```rust,ignore
//! use datasmith::{Engine, TransformKind};
//!
//! let engine = Engine::default();
//! engine.load_csv_bytes(&std::fs::read("sales.csv")?)?;
//!
//! let summary = engine.summarize(&["price".to_string()])?;
//! let applied = engine.apply_transformation("price", TransformKind::Log, None)?;
//! println!("created {:?}", applied.created_columns);
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use uuid::Uuid;

use crate::analysis::{self, CorrelationMatrix, ProjectionResult};
use crate::api::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::config::EngineConfig;
use crate::error::{EngineResult, RenderError, RenderResult};
use crate::models::{Cell, ColumnDescriptor, ColumnType, Table};
use crate::parser::{self, ParseResult};
use crate::render::{self, Chart, ChartKind, Series};
use crate::stats::{self, Histogram, NullCount, Summary};
use crate::store::{Dataset, DatasetInfo, DatasetStore};
use crate::transform::{self, AppliedTransformation, HistoryExport, TransformKind, TransformMode, TransformPlan, TransformRecord};

// =============================================================================
// Response types
// =============================================================================

/// Dataset info plus what CSV detection found.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvLoadInfo {
    #[serde(flatten)]
    pub dataset: DatasetInfo,
    pub encoding: String,
    pub delimiter: char,
}

/// Full description of the loaded dataset.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetOverview {
    pub dataset_id: Uuid,
    pub loaded_at: DateTime<Utc>,
    pub row_count: usize,
    pub column_count: usize,
    pub numeric_columns: usize,
    pub categorical_columns: usize,
    pub transformations_applied: usize,
    /// Registry entries with selection flags and derivations.
    pub columns: Vec<ColumnDescriptor>,
}

/// Summary, correlation and projection computed from one consistent view,
/// with a chart of each analysis result.
///
/// Chart PNG bytes are not serialized; HTTP clients fetch them from the
/// chart routes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    pub summary: Summary,
    pub correlation: Option<CorrelationMatrix>,
    pub projection: Option<ProjectionResult>,
    pub correlation_chart: Option<Chart>,
    pub projection_chart: Option<Chart>,
}

/// Outcome of a transformation that was not committed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformPreview {
    pub column: String,
    pub transformation: TransformKind,
    pub mode: TransformMode,
    /// Names the outputs get on apply unless the caller overrides them.
    pub default_names: Vec<String>,
    pub rows_removed: usize,
    /// Output values under the default names.
    pub values: Table,
    /// Binned output values, for numeric outputs.
    pub histogram: Option<Histogram>,
    /// Distribution of the source column; `None` when it has no non-null
    /// value.
    pub before: Option<Chart>,
    /// Distribution of the output; only for `PreviewAndStage`, and `None`
    /// when the output has no non-null value.
    pub after: Option<Chart>,
}

/// What [`Engine::transform`] did.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransformOutcome {
    Preview(TransformPreview),
    Applied(AppliedTransformation),
}

// =============================================================================
// Engine
// =============================================================================

/// One dataset store plus the settings every operation reads.
///
/// Engines are independent: tests and sessions can each own one.
#[derive(Debug, Default)]
pub struct Engine {
    store: DatasetStore,
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            store: DatasetStore::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    // -------------------------------------------------------------------------
    // Loading & selection
    // -------------------------------------------------------------------------

    /// Replace the current dataset. Columns without a hint get an inferred
    /// type.
    pub fn load_dataset(&self, table: Table, type_hints: Option<&HashMap<String, ColumnType>>) -> EngineResult<DatasetInfo> {
        let empty = HashMap::new();
        let info = self.store.load(table, type_hints.unwrap_or(&empty))?;

        log_success(format!(
            "Loaded dataset {} ({} rows, {} columns)",
            info.dataset_id,
            info.row_count,
            info.column_names.len()
        ));
        for (name, column_type) in &info.column_types {
            log_info_indent(format!("{name}: {column_type}"), 1);
        }
        Ok(info)
    }

    /// Parse CSV bytes (encoding and delimiter auto-detected) and load them.
    pub fn load_csv_bytes(&self, bytes: &[u8]) -> EngineResult<CsvLoadInfo> {
        log_info("📖 Reading CSV...");
        let parsed = parser::parse_bytes_auto(bytes)?;
        self.load_parsed(parsed)
    }

    pub fn load_csv_file(&self, path: &Path) -> EngineResult<CsvLoadInfo> {
        log_info(format!("📖 Reading {}", path.display()));
        let parsed = parser::parse_csv_file_auto(path)?;
        self.load_parsed(parsed)
    }

    fn load_parsed(&self, parsed: ParseResult) -> EngineResult<CsvLoadInfo> {
        log_success(format!(
            "Detected encoding {} and delimiter '{}'",
            parsed.encoding,
            parsed.delimiter.escape_default()
        ));
        let dataset = self.load_dataset(parsed.table, None)?;
        Ok(CsvLoadInfo {
            dataset,
            encoding: parsed.encoding,
            delimiter: parsed.delimiter,
        })
    }

    pub fn set_column_selection(&self, name: &str, selected: bool) -> EngineResult<()> {
        self.store.set_selected(name, selected)?;
        log_info(format!(
            "Column '{name}' {}",
            if selected { "selected" } else { "deselected" }
        ));
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Statistics & analysis
    // -------------------------------------------------------------------------

    pub fn summarize(&self, columns: &[String]) -> EngineResult<Summary> {
        let dataset = self.store.read()?;
        Ok(stats::summarize(&dataset, columns)?)
    }

    pub fn correlate(&self, columns: &[String]) -> EngineResult<Option<CorrelationMatrix>> {
        let dataset = self.store.read()?;
        Ok(analysis::correlate(&dataset, columns)?)
    }

    pub fn project(&self, columns: &[String]) -> EngineResult<Option<ProjectionResult>> {
        let dataset = self.store.read()?;
        Ok(analysis::project(&dataset, columns, self.config.standardize_projection)?)
    }

    /// Summary, correlation and projection under one read lock, plus the
    /// heatmap and projection charts.
    ///
    /// `None` means every selected column.
    pub fn summary_report(&self, columns: Option<&[String]>) -> EngineResult<SummaryReport> {
        let dataset = self.store.read()?;
        let columns = match columns {
            Some(names) => names.to_vec(),
            None => dataset.selected_names(),
        };

        let correlation = analysis::correlate(&dataset, &columns)?;
        let projection = analysis::project(&dataset, &columns, self.config.standardize_projection)?;
        let options = self.config.render_options();

        Ok(SummaryReport {
            summary: stats::summarize(&dataset, &columns)?,
            correlation_chart: optional_chart(correlation.as_ref().map(|m| render::render_heatmap(m, &options)))?,
            projection_chart: optional_chart(projection.as_ref().map(|p| render::render_projection(p, &options)))?,
            correlation,
            projection,
        })
    }

    /// Heatmap of the correlation matrix of `columns`.
    pub fn correlation_heatmap(&self, columns: &[String]) -> EngineResult<Chart> {
        let matrix = self.correlate(columns)?.ok_or_else(|| RenderError::NoRenderableData {
            columns: columns.to_vec(),
        })?;
        Ok(render::render_heatmap(&matrix, &self.config.render_options())?)
    }

    /// Scatter of the two-component projection of `columns`.
    pub fn projection_chart(&self, columns: &[String]) -> EngineResult<Chart> {
        let projection = self.project(columns)?.ok_or_else(|| RenderError::NoRenderableData {
            columns: columns.to_vec(),
        })?;
        Ok(render::render_projection(&projection, &self.config.render_options())?)
    }

    pub fn null_report(&self) -> EngineResult<Vec<NullCount>> {
        let dataset = self.store.read()?;
        Ok(stats::null_report(&dataset)?)
    }

    pub fn info(&self) -> EngineResult<DatasetOverview> {
        let dataset = self.store.read()?;
        let columns: Vec<ColumnDescriptor> = dataset.registry().iter().cloned().collect();
        let numeric_columns = columns.iter().filter(|d| d.is_numeric()).count();

        Ok(DatasetOverview {
            dataset_id: dataset.id(),
            loaded_at: dataset.loaded_at(),
            row_count: dataset.row_count(),
            column_count: columns.len(),
            numeric_columns,
            categorical_columns: columns.len() - numeric_columns,
            transformations_applied: dataset.history().len(),
            columns,
        })
    }

    pub fn head_preview(&self, n: Option<usize>, columns: Option<&[String]>) -> EngineResult<Table> {
        let dataset = self.store.read()?;
        Ok(dataset.head(n.unwrap_or(self.config.head_rows), columns)?)
    }

    // -------------------------------------------------------------------------
    // Transformations
    // -------------------------------------------------------------------------

    /// Preview or apply `kind` on `column`, depending on `mode`.
    pub fn transform(
        &self,
        column: &str,
        kind: TransformKind,
        mode: TransformMode,
        names: Option<&[String]>,
    ) -> EngineResult<TransformOutcome> {
        match mode {
            TransformMode::Apply => self.apply_transformation(column, kind, names).map(TransformOutcome::Applied),
            TransformMode::PreviewOnly | TransformMode::PreviewAndStage => {
                self.preview(column, kind, mode).map(TransformOutcome::Preview)
            }
        }
    }

    /// Distribution chart of a column before any transformation is chosen.
    pub fn preview_transformation(&self, column: &str) -> EngineResult<Chart> {
        let dataset = self.store.read()?;
        let column_type = dataset.descriptor(column)?.column_type;
        Ok(render::render(
            &dataset,
            &[column.to_string()],
            ChartKind::default_for(column_type),
            &self.config.render_options(),
        )?)
    }

    /// Output values, default names and before/after charts of `kind` on
    /// `column`, without touching the dataset.
    pub fn preview_transformation_result(&self, column: &str, kind: TransformKind) -> EngineResult<TransformPreview> {
        self.preview(column, kind, TransformMode::PreviewAndStage)
    }

    /// Validate, compute and commit under one write lock.
    pub fn apply_transformation(
        &self,
        column: &str,
        kind: TransformKind,
        names: Option<&[String]>,
    ) -> EngineResult<AppliedTransformation> {
        let mut dataset = self.store.write()?;
        let plan = transform::plan(&dataset, column, kind, &self.config.transform_options())?;
        let applied = transform::apply(&mut dataset, plan, names)?;

        if applied.created_columns.is_empty() {
            log_success(format!("Applied {kind} to '{column}'"));
        } else {
            log_success(format!(
                "Applied {kind} to '{column}' -> {}",
                applied.created_columns.join(", ")
            ));
        }
        if applied.rows_removed > 0 {
            log_warning(format!(
                "Removed {} rows, {} remain",
                applied.rows_removed, applied.row_count
            ));
        }
        Ok(applied)
    }

    fn preview(&self, column: &str, kind: TransformKind, mode: TransformMode) -> EngineResult<TransformPreview> {
        let dataset = self.store.read()?;
        let plan = transform::plan(&dataset, column, kind, &self.config.transform_options())?;
        let options = self.config.render_options();

        let before = optional_chart(Some(render::render(
            &dataset,
            &[column.to_string()],
            ChartKind::default_for(plan.source_type),
            &options,
        )))?;
        let after = match mode {
            TransformMode::PreviewAndStage => self.after_chart(&plan)?,
            _ => None,
        };

        log_info(format!("Previewed {kind} on '{column}'"));
        Ok(TransformPreview {
            column: column.to_string(),
            transformation: kind,
            mode,
            default_names: plan.default_names(),
            rows_removed: plan.rows_removed(),
            values: plan.result_table(),
            histogram: output_histogram(&plan, self.config.histogram_bins),
            before,
            after,
        })
    }

    fn after_chart(&self, plan: &TransformPlan) -> EngineResult<Option<Chart>> {
        let Some((cells, column_type)) = plan.after_cells() else {
            return Ok(None);
        };
        let default_names = plan.default_names();
        let name = default_names.first().map(String::as_str).unwrap_or(&plan.column);
        let series = [Series {
            name,
            column_type,
            cells,
        }];

        optional_chart(Some(render::render_series(
            &series,
            ChartKind::default_for(column_type),
            &self.config.render_options(),
        )))
    }

    // -------------------------------------------------------------------------
    // Rendering & export
    // -------------------------------------------------------------------------

    pub fn render(&self, columns: &[String], kind: ChartKind) -> EngineResult<Chart> {
        let dataset = self.store.read()?;
        let chart = render::render(&dataset, columns, kind, &self.config.render_options())?;
        log_info(format!(
            "Rendered {kind} of {} ({} rows)",
            columns.join(", "),
            chart.rows_plotted
        ));
        Ok(chart)
    }

    pub fn export_selected(&self) -> EngineResult<Table> {
        Ok(self.store.export_selected()?)
    }

    /// Selected columns as comma-separated text.
    pub fn export_csv(&self) -> EngineResult<String> {
        let table = self.export_selected()?;
        let csv = table.to_csv_string()?;
        log_success(format!(
            "Exported {} rows x {} columns",
            table.row_count(),
            table.column_count()
        ));
        Ok(csv)
    }

    pub fn history(&self) -> EngineResult<Vec<TransformRecord>> {
        let dataset = self.store.read()?;
        Ok(dataset.history().to_vec())
    }

    /// Transformation log as pretty JSON, closed by an export marker.
    pub fn export_history_json(&self) -> EngineResult<String> {
        let dataset = self.store.read()?;
        Ok(history_export(&dataset).to_json()?)
    }
}

fn history_export(dataset: &Dataset) -> HistoryExport<'_> {
    HistoryExport {
        dataset_id: dataset.id().to_string(),
        exported_at: Utc::now(),
        steps: dataset.history(),
        final_row_count: dataset.row_count(),
        final_columns: dataset.selected_names(),
    }
}

/// A chart with nothing to draw becomes `None`; other failures propagate.
fn optional_chart(result: Option<RenderResult<Chart>>) -> EngineResult<Option<Chart>> {
    match result {
        None | Some(Err(RenderError::NoRenderableData { .. })) => Ok(None),
        Some(Ok(chart)) => Ok(Some(chart)),
        Some(Err(e)) => Err(e.into()),
    }
}

fn output_histogram(plan: &TransformPlan, bins: usize) -> Option<Histogram> {
    let (cells, column_type) = plan.after_cells()?;
    if column_type != ColumnType::Numeric {
        return None;
    }
    let values: Vec<f64> = cells.iter().filter_map(Cell::as_f64).collect();
    stats::histogram(&values, bins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EngineError, StoreError, TransformError};
    use crate::models::Column;

    fn engine() -> Engine {
        let engine = Engine::new(EngineConfig {
            chart_width: 200,
            chart_height: 150,
            ..EngineConfig::default()
        });
        engine
            .load_dataset(
                Table::new(vec![
                    Column::numeric("A", &[Some(1.0), Some(2.0), None, Some(4.0)]),
                    Column::text("B", &[Some("x"), Some("y"), Some("x"), None]),
                ]),
                None,
            )
            .unwrap();
        engine
    }

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_operations_need_a_dataset() {
        let engine = Engine::default();
        let err = engine.summarize(&names(&["A"])).unwrap_err();
        assert_eq!(err.code(), "NoDataError");
        assert!(matches!(engine.export_selected(), Err(EngineError::Store(StoreError::NoData))));
    }

    #[test]
    fn test_preview_does_not_mutate() {
        let engine = engine();
        let preview = engine.preview_transformation_result("A", TransformKind::Sqrt).unwrap();

        assert_eq!(preview.default_names, vec!["A_sqrt"]);
        assert_eq!(preview.before.map(|c| c.kind), Some(ChartKind::Histogram));
        assert!(preview.after.is_some());
        assert!(preview.histogram.is_some());
        assert_eq!(engine.info().unwrap().column_count, 2);
        assert!(engine.history().unwrap().is_empty());
    }

    #[test]
    fn test_preview_only_has_no_after_chart() {
        let engine = engine();
        let outcome = engine
            .transform("B", TransformKind::OneHotEncode, TransformMode::PreviewOnly, None)
            .unwrap();
        let TransformOutcome::Preview(preview) = outcome else {
            panic!("expected a preview");
        };
        assert_eq!(preview.default_names, vec!["B_x", "B_y"]);
        assert_eq!(preview.before.map(|c| c.kind), Some(ChartKind::Bar));
        assert!(preview.after.is_none());
    }

    #[test]
    fn test_apply_with_custom_names() {
        let engine = engine();
        let outcome = engine
            .transform("B", TransformKind::LabelEncode, TransformMode::Apply, Some(&names(&["B_enc"])))
            .unwrap();
        let TransformOutcome::Applied(applied) = outcome else {
            panic!("expected an applied transformation");
        };
        assert_eq!(applied.created_columns, vec!["B_enc"]);

        let head = engine.head_preview(None, Some(&names(&["B_enc"]))).unwrap();
        assert_eq!(head.columns[0].cells, vec![Cell::Number(0.0), Cell::Number(1.0), Cell::Number(0.0), Cell::Null]);

        let info = engine.info().unwrap();
        assert_eq!(info.transformations_applied, 1);
        assert_eq!(info.columns[2].derivation.as_ref().unwrap().source_column, "B");
    }

    #[test]
    fn test_drop_nulls_logs_history() {
        let engine = engine();
        let applied = engine.apply_transformation("A", TransformKind::DropNulls, None).unwrap();
        assert_eq!(applied.rows_removed, 1);
        assert_eq!(applied.row_count, 3);

        let json: serde_json::Value = serde_json::from_str(&engine.export_history_json().unwrap()).unwrap();
        assert_eq!(json["steps"][0]["transformation"], "drop_nulls");
        assert_eq!(json["finalRowCount"], 3);
    }

    #[test]
    fn test_unsupported_transformation() {
        let engine = engine();
        let err = engine.apply_transformation("B", TransformKind::Log, None).unwrap_err();
        assert!(matches!(err, EngineError::Transform(TransformError::Unsupported { .. })));
        assert_eq!(err.code(), "UnsupportedTransformationError");
    }

    #[test]
    fn test_summary_report_defaults_to_selection() {
        let engine = engine();
        engine.set_column_selection("B", false).unwrap();
        let report = engine.summary_report(None).unwrap();
        assert_eq!(report.summary.columns(), vec!["A"]);
        assert!(report.correlation.is_none());
        assert!(report.projection.is_none());
        assert!(report.correlation_chart.is_none());
        assert!(report.projection_chart.is_none());
    }

    #[test]
    fn test_summary_report_charts() {
        let engine = engine();
        engine
            .apply_transformation("A", TransformKind::Sqrt, None)
            .unwrap();
        let report = engine.summary_report(None).unwrap();

        let heatmap = report.correlation_chart.unwrap();
        assert_eq!(heatmap.kind, ChartKind::Heatmap);
        assert_eq!(heatmap.labels, vec!["A", "A_sqrt"]);
        let projection = report.projection_chart.unwrap();
        assert_eq!(projection.kind, ChartKind::Projection);
        assert_eq!(projection.rows_plotted, 3);

        let chart = engine.correlation_heatmap(&names(&["A", "A_sqrt"])).unwrap();
        assert!(chart.png().starts_with(b"\x89PNG"));
        let err = engine.projection_chart(&names(&["A"])).unwrap_err();
        assert_eq!(err.code(), "NoRenderableDataError");
    }

    #[test]
    fn test_render_and_export() {
        let engine = engine();
        let chart = engine.render(&names(&["A", "B"]), ChartKind::Scatter).unwrap();
        assert_eq!(chart.rows_plotted, 2);
        assert!(chart.png().starts_with(b"\x89PNG"));

        let csv = engine.export_csv().unwrap();
        assert!(csv.starts_with("A,B"));
    }
}
