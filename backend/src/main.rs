//! Datasmith CLI - inspect, transform and chart CSV datasets
//!
//! # Commands
//!
//! ```bash
//! datasmith serve                               # Start HTTP server (port 3000)
//! datasmith info data.csv                       # Columns, types, nulls
//! datasmith summarize data.csv -c price -c qty  # Statistics, correlation, projection
//! datasmith summarize data.csv --charts out/    # ...plus heatmap and projection PNGs
//! datasmith transform data.csv price log        # Apply and export as CSV
//! datasmith render data.csv histogram -c price -o price.png
//! datasmith operations                          # Show available transformations
//! ```
//!
//! Settings come from `DATASMITH_*` environment variables (or `.env`);
//! flags override them.

use clap::{Parser, Subcommand};
use datasmith::{catalog_description, ChartKind, Engine, EngineConfig, TransformKind, TransformMode, TransformOutcome};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "datasmith")]
#[command(about = "Transform, describe and chart tabular datasets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show columns, types and null counts of a CSV file
    Info {
        /// Input CSV file
        input: PathBuf,
    },

    /// Summary statistics, correlation and projection
    Summarize {
        /// Input CSV file
        input: PathBuf,

        /// Columns to describe (default: all)
        #[arg(short, long)]
        columns: Vec<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory for the correlation heatmap and projection PNGs
        #[arg(long)]
        charts: Option<PathBuf>,
    },

    /// Apply a transformation and export the resulting dataset
    Transform {
        /// Input CSV file
        input: PathBuf,

        /// Source column
        column: String,

        /// Transformation (see `datasmith operations`)
        transformation: TransformKind,

        /// Names for the created columns (default: generated)
        #[arg(short, long = "name")]
        names: Vec<String>,

        /// Only show the preview, do not apply
        #[arg(long)]
        preview: bool,

        /// Output CSV file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the transformation log as JSON
        #[arg(long)]
        history: Option<PathBuf>,
    },

    /// Render a chart of one or two columns as PNG
    Render {
        /// Input CSV file
        input: PathBuf,

        /// Chart kind: histogram, box, violin, bar, pie, scatter, line
        kind: ChartKind,

        /// Columns to plot (1 or 2)
        #[arg(short, long, required = true)]
        columns: Vec<String>,

        /// Output PNG file
        #[arg(short, long)]
        output: PathBuf,

        /// Image width in pixels
        #[arg(long)]
        width: Option<u32>,

        /// Image height in pixels
        #[arg(long)]
        height: Option<u32>,
    },

    /// Show available transformations
    Operations,

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: DATASMITH_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match EngineConfig::from_env() {
        Ok(config) => run(cli.command, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Info { input } => cmd_info(&input, config),

        Commands::Summarize {
            input,
            columns,
            output,
            charts,
        } => cmd_summarize(&input, &columns, output.as_deref(), charts.as_deref(), config),

        Commands::Transform {
            input,
            column,
            transformation,
            names,
            preview,
            output,
            history,
        } => cmd_transform(
            &input,
            &column,
            transformation,
            &names,
            preview,
            output.as_deref(),
            history.as_deref(),
            config,
        ),

        Commands::Render {
            input,
            kind,
            columns,
            output,
            width,
            height,
        } => {
            let config = EngineConfig {
                chart_width: width.unwrap_or(config.chart_width),
                chart_height: height.unwrap_or(config.chart_height),
                ..config
            };
            cmd_render(&input, kind, &columns, &output, config)
        }

        Commands::Operations => cmd_operations(),

        Commands::Serve { port } => cmd_serve(port, config).await,
    }
}

fn load(input: &Path, config: EngineConfig) -> Result<Engine, Box<dyn std::error::Error>> {
    let engine = Engine::new(config);
    engine.load_csv_file(input)?;
    Ok(engine)
}

fn cmd_info(input: &Path, config: EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let engine = load(input, config)?;
    let json = json!({
        "dataset": serde_json::to_value(engine.info()?)?,
        "nulls": serde_json::to_value(engine.null_report()?)?,
        "head": serde_json::to_value(engine.head_preview(None, None)?)?,
    });
    write_output(&serde_json::to_string_pretty(&json)?, None)
}

fn cmd_summarize(
    input: &Path,
    columns: &[String],
    output: Option<&Path>,
    charts: Option<&Path>,
    config: EngineConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = load(input, config)?;
    let columns = (!columns.is_empty()).then_some(columns);
    let report = engine.summary_report(columns)?;

    if let Some(dir) = charts {
        fs::create_dir_all(dir)?;
        let rendered = [
            ("correlation.png", report.correlation_chart.as_ref()),
            ("projection.png", report.projection_chart.as_ref()),
        ];
        for (file, chart) in rendered {
            match chart {
                Some(chart) => {
                    chart.save(&dir.join(file))?;
                    eprintln!("💾 {} chart written to: {}", chart.kind, dir.join(file).display());
                }
                None => eprintln!("   No {} (fewer than 2 usable numeric columns)", file),
            }
        }
    }

    write_output(&serde_json::to_string_pretty(&report)?, output)
}

#[allow(clippy::too_many_arguments)]
fn cmd_transform(
    input: &Path,
    column: &str,
    kind: TransformKind,
    names: &[String],
    preview: bool,
    output: Option<&Path>,
    history: Option<&Path>,
    config: EngineConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = load(input, config)?;
    let mode = if preview {
        TransformMode::PreviewOnly
    } else {
        TransformMode::Apply
    };
    let names = (!names.is_empty()).then_some(names);

    match engine.transform(column, kind, mode, names)? {
        TransformOutcome::Preview(preview) => {
            eprintln!("   Would create: {}", preview.default_names.join(", "));
            if preview.rows_removed > 0 {
                eprintln!("   Would remove {} rows", preview.rows_removed);
            }
            write_output(&preview.values.to_csv_string()?, output)?;
        }
        TransformOutcome::Applied(applied) => {
            eprintln!(
                "   Created: {} ({} rows removed, {} remain)",
                applied.created_columns.join(", "),
                applied.rows_removed,
                applied.row_count
            );
            write_output(&engine.export_csv()?, output)?;
        }
    }

    if let Some(path) = history {
        fs::write(path, engine.export_history_json()?)?;
        eprintln!("💾 History written to: {}", path.display());
    }
    Ok(())
}

fn cmd_render(
    input: &Path,
    kind: ChartKind,
    columns: &[String],
    output: &Path,
    config: EngineConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let engine = load(input, config)?;
    let chart = engine.render(columns, kind)?;
    chart.save(output)?;

    eprintln!(
        "💾 {} chart ({}x{}, {} rows) written to: {}",
        chart.kind,
        chart.width,
        chart.height,
        chart.rows_plotted,
        output.display()
    );
    if !chart.labels.is_empty() {
        eprintln!("   Labels: {}", chart.labels.join(", "));
    }
    Ok(())
}

fn cmd_operations() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", catalog_description());
    Ok(())
}

async fn cmd_serve(port: Option<u16>, config: EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    let port = port.unwrap_or(config.server_port);
    let engine = Arc::new(Engine::new(config));
    datasmith::server::start_server(engine, port).await
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
