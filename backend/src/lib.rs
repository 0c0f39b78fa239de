//! # Datasmith - interactive dataset transformation and analysis
//!
//! Datasmith loads one tabular dataset, describes it, applies named column
//! transformations with a preview-before-apply protocol, analyses numeric
//! columns (correlation, two-component projection) and renders PNG charts.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌──────────────────────────────┐
//! │  CSV bytes  │────▶│   Parser    │────▶│ Engine                       │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │  store ─┬─ transform (write) │
//! └─────────────┘     └─────────────┘     │         ├─ stats             │
//!                                         │         ├─ analysis          │
//!                                         │         └─ render (PNG)      │
//!                                         └──────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use datasmith::{ChartKind, Engine, TransformKind};
//!
//! let engine = Engine::default();
//! engine.load_csv_file("sales.csv".as_ref())?;
//!
//! let preview = engine.preview_transformation_result("price", TransformKind::Log)?;
//! println!("would create {:?}", preview.default_names);
//!
//! engine.apply_transformation("price", TransformKind::Log, None)?;
//! let chart = engine.render(&["price_log".into()], ChartKind::Histogram)?;
//! chart.save("price_log.png".as_ref())?;
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Cells, columns, tables and column descriptors
//! - [`parser`] - CSV parsing with auto-detection, CSV export
//! - [`store`] - Dataset store and column registry
//! - [`transform`] - Transformation catalog, executor and history
//! - [`stats`] - Descriptive statistics and histograms
//! - [`analysis`] - Correlation and projection
//! - [`render`] - PNG chart rendering
//! - [`config`] - Environment configuration
//! - [`engine`] - The facade every surface goes through
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Dataset
pub mod store;

// Transformation
pub mod transform;

// Statistics & analysis
pub mod analysis;
pub mod stats;

// Rendering
pub mod render;

// Engine
pub mod config;
pub mod engine;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError, CsvError, EngineError, EngineResult, RenderError, StoreError, TransformError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{Cell, Column, ColumnDescriptor, ColumnType, Derivation, Table};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, parse_bytes_auto, parse_csv_file_auto, parse_str, write_csv,
    ParseResult,
};

// =============================================================================
// Re-exports - Store
// =============================================================================

pub use store::{Dataset, DatasetInfo, DatasetStore, Snapshot};

// =============================================================================
// Re-exports - Transformations
// =============================================================================

pub use transform::{
    catalog_description, AppliedTransformation, TransformKind, TransformMode, TransformOptions, TransformRecord,
};

// =============================================================================
// Re-exports - Statistics & analysis
// =============================================================================

pub use analysis::{CorrelationMatrix, ProjectionResult};
pub use stats::{Histogram, NullCount, Summary, SummaryRecord, ValueStats};

// =============================================================================
// Re-exports - Rendering
// =============================================================================

pub use render::{Chart, ChartKind, RenderOptions};

// =============================================================================
// Re-exports - Engine
// =============================================================================

pub use config::EngineConfig;
pub use engine::{CsvLoadInfo, DatasetOverview, Engine, SummaryReport, TransformOutcome, TransformPreview};

// Server
pub mod server {
    pub use crate::api::server::{router, start_server};
}
