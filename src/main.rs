//! `medscan` command-line entry point.
//!
//! - `analyze <FILE>`: OCR a report and summarize it with the AI provider
//! - `triage <TEXT>...`: triage a free-text symptom description

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use medscan_lib::config::{AnalyzerConfig, APP_VERSION};
use medscan_lib::pipeline::structuring::ProviderKind;
use medscan_lib::pipeline::{AnalysisError, ReportAnalyzer, SymptomTriage};
use medscan_lib::render::{render_report_text, render_triage_text};

#[derive(Parser)]
#[command(name = "medscan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Medical report analysis and symptom triage", long_about = None)]
struct Cli {
    /// Report provider (overrides ANALYZER_PROVIDER)
    #[arg(long, global = true)]
    provider: Option<ProviderKind>,

    /// Return OCR text when AI analysis fails (overrides FALLBACK_OCR_ONLY)
    #[arg(long, global = true)]
    ocr_only_fallback: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a medical report image or PDF
    Analyze {
        /// Path to the report file
        file: PathBuf,
    },

    /// Triage a symptom description
    Triage {
        /// Free-text description of the symptoms
        #[arg(required = true)]
        description: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    medscan_lib::init_tracing();

    let cli = Cli::parse();
    tracing::debug!("medscan v{APP_VERSION}");

    let mut config = AnalyzerConfig::from_env().context("invalid configuration")?;
    if cli.provider.is_some() {
        config.provider = cli.provider;
    }
    if cli.ocr_only_fallback {
        config.fallback_ocr_only = true;
    }

    match cli.command {
        Commands::Analyze { file } => analyze(&config, &file, cli.format).await,
        Commands::Triage { description } => {
            triage(&config, &description.join(" "), cli.format).await
        }
    }
}

async fn analyze(config: &AnalyzerConfig, file: &Path, format: OutputFormat) -> Result<()> {
    let document = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let analyzer = ReportAnalyzer::from_config(config);
    let result = analyzer
        .analyze_report(&document, &filename)
        .await
        .or_else(report_failure)?;

    match format {
        OutputFormat::Json => print_json(&result),
        OutputFormat::Text => {
            println!("{}", render_report_text(&result));
            Ok(())
        }
    }
}

async fn triage(config: &AnalyzerConfig, description: &str, format: OutputFormat) -> Result<()> {
    let result = SymptomTriage::from_config(config)
        .analyze_symptoms(description)
        .await
        .or_else(report_failure)?;

    match format {
        OutputFormat::Json => print_json(&result),
        OutputFormat::Text => {
            println!("{}", render_triage_text(&result));
            Ok(())
        }
    }
}

fn report_failure<T>(err: AnalysisError) -> Result<T> {
    tracing::error!(error = %err, "Analysis failed");
    bail!(err.user_message())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
