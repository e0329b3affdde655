use clap::{Parser, Subcommand};
use cli::Settings;
use color_eyre::eyre::{eyre, Result};
use mammo::{list_images, Analysis, Pipeline, Selection, Session};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse a single mammogram
    Analyze {
        /// Path to the image (.png .jpg .jpeg .bmp .tif .tiff .dcm)
        #[arg(short, long)]
        input: PathBuf,
        /// Settings file (.toml or .json)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print the structured summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Analyse the first or latest image of a directory
    Select {
        /// Directory holding the input images
        #[arg(short, long, default_value = "input")]
        input_dir: PathBuf,
        /// Which image to pick: first (oldest) or latest (newest)
        #[arg(short, long, default_value = "latest")]
        mode: Selection,
        /// Settings file (.toml or .json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Analyse every supported image of a directory concurrently
    Batch {
        /// Directory holding the input images
        #[arg(short, long, default_value = "input")]
        input_dir: PathBuf,
        /// Settings file (.toml or .json)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Write a settings file filled with the defaults
    InitConfig {
        /// Destination (.toml or .json)
        #[arg(short, long, default_value = "mammo.toml")]
        output: PathBuf,
    },
    /// Print the JSON schema of the settings file
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Analyze { input, config, json } => {
            analyze(input, config.as_deref(), *json).await?;
        }
        Commands::Select { input_dir, mode, config } => {
            select(input_dir, *mode, config.as_deref()).await?;
        }
        Commands::Batch { input_dir, config } => {
            batch(input_dir, config.as_deref()).await?;
        }
        Commands::InitConfig { output } => {
            Settings::default().to_file(output)?;
            info!("Default settings written to {}", output.display());
        }
        Commands::Schema => {
            println!("{}", Settings::schema_json()?);
        }
    }

    Ok(())
}

fn build_pipeline(config: Option<&Path>) -> Result<Arc<Pipeline>> {
    let settings = Settings::load(config)?;
    let pipeline = Pipeline::from_config(settings.analysis, settings.output);
    info!("{}", pipeline.info());
    Ok(Arc::new(pipeline))
}

fn print_outcome(analysis: Analysis) {
    let (ratio, region, annotated, report) = analysis.into_outcome();
    println!("Ratio: {ratio:.1}% | Region: {region}");
    println!("Annotated: {}", annotated.display());
    println!("Report: {}", report.display());
}

async fn analyze(input: &Path, config: Option<&Path>, json: bool) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let session = Session::new();

    let input = input.to_path_buf();
    let worker = session.clone();
    let analysis = tokio::task::spawn_blocking(move || worker.analyze(&pipeline, &input)).await??;

    if json {
        println!("{}", analysis.summary().to_json_pretty()?);
    } else {
        print_outcome(analysis);
        println!("Explanation: {}", session.explain_last());
    }
    Ok(())
}

async fn select(input_dir: &Path, mode: Selection, config: Option<&Path>) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let session = Session::new();

    let dir = input_dir.to_path_buf();
    let worker = session.clone();
    let analysis = tokio::task::spawn_blocking(move || worker.analyze_selected(&pipeline, &dir, mode))
        .await??;

    info!("Analysis completed for {mode}");
    print_outcome(analysis);
    println!("Explanation: {}", session.explain_last());
    Ok(())
}

async fn batch(input_dir: &Path, config: Option<&Path>) -> Result<()> {
    let pipeline = build_pipeline(config)?;
    let session = Session::new();

    let images = list_images(input_dir)?;
    if images.is_empty() {
        return Err(eyre!("No supported images found in {}", input_dir.display()));
    }
    info!("Analysing {} images from {}", images.len(), input_dir.display());

    let handles: Vec<_> = images
        .into_iter()
        .map(|path| {
            let pipeline = Arc::clone(&pipeline);
            let session = session.clone();
            tokio::task::spawn_blocking(move || {
                let outcome = session.analyze(&pipeline, &path);
                (path, outcome)
            })
        })
        .collect();

    let mut summaries = Vec::new();
    let mut failures = 0usize;
    for handle in handles {
        let (path, outcome) = handle.await?;
        match outcome {
            Ok(analysis) => summaries.push(analysis.summary()),
            Err(e) => {
                failures += 1;
                error!("Failed to analyse {}: {e}", path.display());
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&summaries)?);
    info!(
        "✅ Batch completed: {} analysed, {failures} failed",
        summaries.len()
    );
    println!("Last explanation: {}", session.explain_last());
    Ok(())
}
