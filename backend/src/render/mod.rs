//! Visualization renderer.
//!
//! Renders one or two columns into a PNG chart. Allowed kinds depend on the
//! number and types of columns:
//!
//! | Columns | Kinds |
//! |---------|-------|
//! | 1 numeric | `histogram`, `box`, `violin` |
//! | 1 categorical | `bar`, `pie` |
//! | 2 of any type | `scatter`, `line` |
//!
//! Analysis results have their own charts: [`render_heatmap`] draws a
//! correlation matrix and [`render_projection`] the two-component scores.
//!
//! Charts are regenerated on every request and never stored.

pub mod canvas;
pub mod color;
pub mod plots;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::analysis::{CorrelationMatrix, ProjectionResult};
use crate::error::{RenderError, RenderResult, StoreError};
use crate::models::{Cell, ColumnType};
use crate::stats::describe;
use crate::store::Dataset;

use canvas::{Canvas, PlotArea};
use plots::AxisData;

// =============================================================================
// Chart kinds
// =============================================================================

/// All chart kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Histogram,
    #[serde(alias = "boxplot", alias = "box_plot")]
    Box,
    Violin,
    Bar,
    Pie,
    Scatter,
    Line,
    /// Correlation matrix.
    Heatmap,
    /// Two-component projection scores.
    Projection,
}

impl ChartKind {
    pub const ALL: [ChartKind; 9] = [
        ChartKind::Histogram,
        ChartKind::Box,
        ChartKind::Violin,
        ChartKind::Bar,
        ChartKind::Pie,
        ChartKind::Scatter,
        ChartKind::Line,
        ChartKind::Heatmap,
        ChartKind::Projection,
    ];

    /// Kinds allowed for the given column types (empty for 0 or > 2).
    ///
    /// `heatmap` and `projection` are never allowed here; they draw
    /// analysis results, not columns.
    pub fn allowed_for(types: &[ColumnType]) -> &'static [ChartKind] {
        match types {
            [ColumnType::Numeric] => &[ChartKind::Histogram, ChartKind::Box, ChartKind::Violin],
            [ColumnType::Categorical] => &[ChartKind::Bar, ChartKind::Pie],
            [_, _] => &[ChartKind::Scatter, ChartKind::Line],
            _ => &[],
        }
    }

    /// Distribution chart used for transformation previews.
    pub fn default_for(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Numeric => ChartKind::Histogram,
            ColumnType::Categorical => ChartKind::Bar,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChartKind::Histogram => "histogram",
            ChartKind::Box => "box",
            ChartKind::Violin => "violin",
            ChartKind::Bar => "bar",
            ChartKind::Pie => "pie",
            ChartKind::Scatter => "scatter",
            ChartKind::Line => "line",
            ChartKind::Heatmap => "heatmap",
            ChartKind::Projection => "projection",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        let lower = match lower.as_str() {
            "boxplot" | "box_plot" => "box",
            other => other,
        };
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == lower)
            .ok_or_else(|| format!("unknown chart kind '{s}'"))
    }
}

// =============================================================================
// Options & output
// =============================================================================

/// Rendering limits and image size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
    /// 0 selects Sturges' rule.
    pub histogram_bins: usize,
    pub max_bar_categories: usize,
    pub max_pie_slices: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            histogram_bins: 30,
            max_bar_categories: 30,
            max_pie_slices: 10,
        }
    }
}

/// A rendered chart and the request that produced it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub kind: ChartKind,
    pub columns: Vec<String>,
    pub width: u32,
    pub height: u32,
    /// Rows left after null removal (matrix rows for a heatmap).
    pub rows_plotted: usize,
    /// Category, slice or bin labels in drawing order.
    pub labels: Vec<String>,
    #[serde(skip)]
    pub png: Vec<u8>,
}

impl Chart {
    pub fn png(&self) -> &[u8] {
        &self.png
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, &self.png)
    }
}

/// One column handed to the renderer.
#[derive(Debug, Clone, Copy)]
pub struct Series<'a> {
    pub name: &'a str,
    pub column_type: ColumnType,
    pub cells: &'a [Cell],
}

// =============================================================================
// Rendering
// =============================================================================

/// Render registered columns of `dataset`.
pub fn render(dataset: &Dataset, columns: &[String], kind: ChartKind, options: &RenderOptions) -> RenderResult<Chart> {
    let series = columns
        .iter()
        .map(|name| {
            let descriptor = dataset.descriptor(name)?;
            Ok(Series {
                name: name.as_str(),
                column_type: descriptor.column_type,
                cells: dataset.cells(name)?,
            })
        })
        .collect::<Result<Vec<_>, StoreError>>()?;

    render_series(&series, kind, options)
}

/// Render arbitrary equal-length series.
pub fn render_series(series: &[Series<'_>], kind: ChartKind, options: &RenderOptions) -> RenderResult<Chart> {
    if series.is_empty() {
        return Err(StoreError::EmptySelection {
            operation: "render".to_string(),
        }
        .into());
    }

    let types: Vec<ColumnType> = series.iter().map(|s| s.column_type).collect();
    if !ChartKind::allowed_for(&types).contains(&kind) {
        return Err(RenderError::Unsupported {
            kind,
            column_types: types,
        });
    }

    let rows = series.iter().map(|s| s.cells.len()).min().unwrap_or(0);
    let complete: Vec<usize> = (0..rows)
        .filter(|&i| series.iter().all(|s| !s.cells[i].is_null()))
        .collect();
    if complete.is_empty() {
        return Err(RenderError::NoRenderableData {
            columns: series.iter().map(|s| s.name.to_string()).collect(),
        });
    }

    let mut canvas = Canvas::new(options.width, options.height);
    let area = PlotArea::with_margins(options.width, options.height);
    if kind != ChartKind::Pie {
        canvas.frame(&area);
    }

    let labels = match kind {
        ChartKind::Heatmap | ChartKind::Projection => Vec::new(),
        ChartKind::Histogram | ChartKind::Box | ChartKind::Violin => {
            let values = numbers(&series[0], &complete);
            match kind {
                ChartKind::Histogram => plots::histogram(&mut canvas, &area, &values, options.histogram_bins),
                ChartKind::Box => {
                    plots::box_plot(&mut canvas, &area, &values);
                    Vec::new()
                }
                _ => {
                    plots::violin(&mut canvas, &area, &values);
                    Vec::new()
                }
            }
        }
        ChartKind::Bar | ChartKind::Pie => {
            let cells: Vec<Cell> = complete.iter().map(|&i| series[0].cells[i].clone()).collect();
            let limit = if kind == ChartKind::Bar {
                options.max_bar_categories
            } else {
                options.max_pie_slices
            };
            let counts: Vec<(String, usize)> = describe::value_counts(&cells).into_iter().take(limit).collect();
            if kind == ChartKind::Bar {
                plots::bar(&mut canvas, &area, &counts);
            } else {
                plots::pie(&mut canvas, &counts);
            }
            counts.into_iter().map(|(label, _)| label).collect()
        }
        ChartKind::Scatter | ChartKind::Line => {
            let x = axis(&series[0], &complete);
            let y = axis(&series[1], &complete);
            if kind == ChartKind::Scatter {
                plots::scatter(&mut canvas, &area, &x, &y);
            } else {
                plots::line(&mut canvas, &area, &x, &y);
            }
            x.labels().iter().chain(y.labels()).cloned().collect()
        }
    };

    Ok(Chart {
        kind,
        columns: series.iter().map(|s| s.name.to_string()).collect(),
        width: canvas.width(),
        height: canvas.height(),
        rows_plotted: complete.len(),
        labels,
        png: canvas.into_png()?,
    })
}

/// Correlation matrix as a blue-white-red grid; labels are the column names
/// in row order.
pub fn render_heatmap(matrix: &CorrelationMatrix, options: &RenderOptions) -> RenderResult<Chart> {
    if matrix.values.iter().flatten().all(Option::is_none) {
        return Err(RenderError::NoRenderableData {
            columns: matrix.columns.clone(),
        });
    }

    let mut canvas = Canvas::new(options.width, options.height);
    let area = PlotArea::with_margins(options.width, options.height);
    plots::heatmap(&mut canvas, &area, &matrix.values);

    Ok(Chart {
        kind: ChartKind::Heatmap,
        columns: matrix.columns.clone(),
        width: canvas.width(),
        height: canvas.height(),
        rows_plotted: matrix.size(),
        labels: matrix.columns.clone(),
        png: canvas.into_png()?,
    })
}

/// Scatter of the projection scores; labels carry each component's share of
/// the variance.
pub fn render_projection(projection: &ProjectionResult, options: &RenderOptions) -> RenderResult<Chart> {
    if projection.points.is_empty() {
        return Err(RenderError::NoRenderableData {
            columns: projection.columns.clone(),
        });
    }

    let mut canvas = Canvas::new(options.width, options.height);
    let area = PlotArea::with_margins(options.width, options.height);
    canvas.frame(&area);
    plots::projection(&mut canvas, &area, &projection.points);

    let [pc1, pc2] = projection.explained_variance_ratio;
    Ok(Chart {
        kind: ChartKind::Projection,
        columns: projection.columns.clone(),
        width: canvas.width(),
        height: canvas.height(),
        rows_plotted: projection.points.len(),
        labels: vec![
            format!("PC1 ({:.1}%)", pc1 * 100.0),
            format!("PC2 ({:.1}%)", pc2 * 100.0),
        ],
        png: canvas.into_png()?,
    })
}

fn numbers(series: &Series<'_>, rows: &[usize]) -> Vec<f64> {
    rows.iter().filter_map(|&i| series.cells[i].as_f64()).collect()
}

fn axis(series: &Series<'_>, rows: &[usize]) -> AxisData {
    match series.column_type {
        ColumnType::Numeric => AxisData::Numeric(numbers(series, rows)),
        ColumnType::Categorical => AxisData::categorical(
            rows.iter()
                .filter_map(|&i| series.cells[i].category_key())
                .collect(),
        ),
    }
}
