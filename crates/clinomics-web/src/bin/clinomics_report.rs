//! clinomics-report - batch report from the command line
//!
//! Runs the same pipeline as the web server and writes a PDF report, or the
//! JSON results with `--json`.
//!
//! Examples:
//!   clinomics-report TP53 BRCA1              # PDF for two genes
//!   clinomics-report --file genes.csv        # genes from a file
//!   clinomics-report TP53 --json             # JSON to stdout

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use clinomics_ingestion::gene_list::parse_gene_file;
use clinomics_web::{
    bootstrap::{build_driver, init_tracing},
    config::Config,
    report::{render_pdf, report_filename},
};
use tracing::info;

/// clinomics-report command-line arguments
#[derive(Parser)]
#[command(name = "clinomics-report")]
#[command(about = "Aggregate gene data and write a ClinOmics report")]
#[command(version)]
struct Args {
    /// Gene symbols to analyze
    genes: Vec<String>,

    /// Read more genes from a file (.csv: first column; otherwise one per line)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Config file (defaults to $CLINOMICS_CONFIG or ./clinomics.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output PDF path (defaults to the report's own file name)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Print JSON results to stdout instead of writing a PDF
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            if !path.exists() {
                bail!("Config file {} does not exist", path.display());
            }
            Config::load_from(path)?
        }
        None => Config::load()?,
    };
    init_tracing(&config.logging.level);

    let mut tokens = args.genes.clone();
    if let Some(path) = &args.file {
        let bytes = std::fs::read(path).with_context(|| format!("Cannot read {}", path.display()))?;
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        tokens.extend(parse_gene_file(name, &bytes)?);
    }

    let driver = build_driver(&config, None)?;
    info!(tokens = tokens.len(), "Running analysis");
    let batch = driver.analyze_batch(&tokens).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&batch)?);
        return Ok(());
    }

    let pdf = render_pdf(&batch).context("Cannot render PDF")?;
    let out = args.out.unwrap_or_else(|| PathBuf::from(report_filename(&batch)));
    std::fs::write(&out, pdf).with_context(|| format!("Cannot write {}", out.display()))?;
    info!("Report written to {}", out.display());
    println!("{}", out.display());
    Ok(())
}
