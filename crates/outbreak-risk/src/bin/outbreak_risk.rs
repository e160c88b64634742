//! Outbreak Risk CLI Tool
//!
//! Score and rank outbreak risk from a surveillance dataset.
//!
//! Usage:
//!   outbreak-risk --data <dataset.json> score --city <id> --disease <id>
//!   outbreak-risk --data <dataset.json> rank [--top <n>]
//!   outbreak-risk --data <dataset.json> city --city <id> [--top <n>]
//!   outbreak-risk --data <dataset.json> overview
//!   outbreak-risk --data <dataset.json> outbreaks [--days <d>] [--min-cases <n>]
//!   outbreak-risk --data <dataset.json> env-risk
//!
//! Logging goes to stderr and is controlled by `OUTBREAK_RISK_LOG`.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use outbreak_risk::*;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "outbreak-risk")]
#[command(version = "0.1.0")]
#[command(about = "Score and rank city-level disease outbreak risk", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Dataset file (JSON document of cities, diseases, cases and samples)
    #[arg(short, long, global = true, default_value = "dataset.json")]
    data: PathBuf,

    /// Engine configuration file (JSON, missing fields use defaults)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Seed for reproducible jitter (OS entropy if not specified)
    #[arg(short, long, global = true)]
    seed: Option<String>,

    /// Assessment date, YYYY-MM-DD (today if not specified)
    #[arg(long, global = true)]
    as_of: Option<NaiveDate>,

    /// Output format: json, compact, or table
    #[arg(short, long, global = true, default_value = "json")]
    format: String,

    /// Output file (stdout if not specified)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a single (city, disease) pair
    Score {
        #[arg(long)]
        city: u32,

        #[arg(long)]
        disease: u32,
    },

    /// Rank every active (city, disease) pair
    Rank {
        /// Only show the top-n pairs
        #[arg(short = 'n', long)]
        top: Option<usize>,
    },

    /// Summary and top diseases for one city
    City {
        #[arg(long)]
        city: u32,

        #[arg(short = 'n', long, default_value = "5")]
        top: usize,
    },

    /// One row per city, highest risk first
    Overview,

    /// Recent case clusters
    Outbreaks {
        /// Reporting window in days
        #[arg(long, default_value = "30")]
        days: u32,

        /// Clusters must exceed this many cases
        #[arg(long, default_value = "3")]
        min_cases: usize,
    },

    /// Cities with poor recent air or water quality
    EnvRisk,
}

#[derive(serde::Serialize)]
struct CityReport {
    summary: CitySummary,
    predictions: Vec<RiskAssessment>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("OUTBREAK_RISK_LOG")
                .unwrap_or_else(|_| EnvFilter::new("outbreak_risk=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    let data = Dataset::from_path(&cli.data)?;
    tracing::info!(
        path = %cli.data.display(),
        cases = data.case_count(),
        "loaded dataset"
    );

    let jitter: Box<dyn JitterSource> = match &cli.seed {
        Some(seed) => Box::new(SeededJitter::new(Seed::from_string(seed))),
        None => Box::new(EntropyJitter),
    };
    let engine = RiskEngine::new(data, jitter, config)?;
    let as_of = cli
        .as_of
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let result: serde_json::Value = match cli.command {
        Commands::Score { city, disease } => {
            let assessment = engine.score(CityId(city), DiseaseId(disease), as_of)?;
            serde_json::to_value(assessment)?
        }
        Commands::Rank { top } => {
            let mut ranked = engine.rank_all(as_of);
            if let Some(n) = top {
                ranked.truncate(n);
            }
            serde_json::to_value(ranked)?
        }
        Commands::City { city, top } => {
            let report = CityReport {
                summary: engine.city_summary(CityId(city), as_of)?,
                predictions: engine.city_predictions(CityId(city), as_of, top)?,
            };
            serde_json::to_value(report)?
        }
        Commands::Overview => serde_json::to_value(engine.cities_overview(as_of))?,
        Commands::Outbreaks { days, min_cases } => {
            serde_json::to_value(engine.outbreak_summary(as_of, days, min_cases))?
        }
        Commands::EnvRisk => serde_json::to_value(engine.environmental_risk_cities(as_of))?,
    };

    // Output result
    let output_str = match cli.format.as_str() {
        "json" => serde_json::to_string_pretty(&result)?,
        "compact" => serde_json::to_string(&result)?,
        "table" => result_to_table(&result),
        other => return Err(format!("Unknown format '{}': expected json, compact, or table", other).into()),
    };

    if let Some(output_path) = cli.output {
        fs::write(&output_path, &output_str)?;
        eprintln!("Output written to: {}", output_path.display());
    } else {
        println!("{}", output_str);
    }

    Ok(())
}

/// Render scalar fields as aligned columns. Nested values are flattened to
/// their compact JSON text, reasoning lists are joined with "; ".
fn result_to_table(value: &serde_json::Value) -> String {
    use serde_json::Value;

    let is_table = |v: &Value| matches!(v, Value::Array(items) if items.iter().any(Value::is_object));

    let rows: Vec<&serde_json::Map<String, Value>> = match value {
        Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
        // Composite reports get one section per field
        Value::Object(map) if map.values().any(is_table) => {
            return map
                .iter()
                .map(|(key, inner)| format!("== {} ==\n{}", key, result_to_table(inner)))
                .collect::<Vec<_>>()
                .join("\n\n");
        }
        Value::Object(map) => vec![map],
        other => return cell(other),
    };
    let Some(first) = rows.first() else {
        return "(no rows)".to_string();
    };

    let headers: Vec<&String> = first.keys().collect();
    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            headers
                .iter()
                .map(|h| row.get(h.as_str()).map(cell).unwrap_or_default())
                .collect()
        })
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| body.iter().map(|r| r[i].len()).chain([h.len()]).max().unwrap_or(0))
        .collect();

    let render = |cells: Vec<String>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = *w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![render(headers.iter().map(|h| h.to_string()).collect())];
    lines.push(widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("  "));
    lines.extend(body.into_iter().map(render));
    lines.join("\n")
}

fn cell(value: &serde_json::Value) -> String {
    use serde_json::Value;

    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{:.2}", f),
            _ => n.to_string(),
        },
        Value::Array(items) if items.iter().all(Value::is_string) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}
