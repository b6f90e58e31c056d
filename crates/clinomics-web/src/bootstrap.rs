//! Startup wiring shared by the server and the CLI.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clinomics_common::SandboxClient;
use clinomics_ingestion::{build_adapters, Aggregator, BatchDriver, BatchProgress, FallbackTable};
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// `RUST_LOG` wins over the configured level.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Adapters, fallback table, aggregator and batch driver from config.
pub fn build_driver(
    config: &Config,
    progress: Option<broadcast::Sender<BatchProgress>>,
) -> anyhow::Result<BatchDriver> {
    let client = SandboxClient::new(Duration::from_secs(config.http.timeout_secs))?;
    let adapters = build_adapters(&config.sources, client).context("Invalid [sources] configuration")?;
    let fallback = FallbackTable::load(&config.fallback).context("Cannot load fallback data")?;
    info!(entries = fallback.len(), "Fallback table ready");

    let aggregator = Aggregator::new(adapters, Arc::new(fallback), config.http.max_concurrent_requests)?;
    let mut driver = BatchDriver::new(Arc::new(aggregator))
        .with_gene_concurrency(config.batch.gene_concurrency)
        .with_max_genes(config.batch.max_genes);
    if let Some(tx) = progress {
        driver = driver.with_progress(tx);
    }
    Ok(driver)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_driver_from_defaults() {
        let driver = build_driver(&Config::default(), None).unwrap();
        assert_eq!(driver.aggregator().kinds().len(), 4);
        assert_eq!(driver.max_genes(), 200);
        assert_eq!(driver.aggregator().max_concurrent_requests(), 6);
    }

    #[test]
    fn test_build_driver_reports_missing_fallback_file() {
        let mut config = Config::default();
        config.fallback.mutation = Some("/no/such/fallback.csv".into());
        let err = build_driver(&config, None).err().unwrap();
        assert!(format!("{:#}", err).contains("fallback"));
    }

    #[test]
    fn test_sample_fallback_files_load() {
        use clinomics_common::GeneSymbol;
        use clinomics_ingestion::{FallbackConfig, SourceKind};

        let data = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data");
        let config = FallbackConfig {
            expression: Some(data.join("fallback_expression.csv")),
            mutation: Some(data.join("fallback_mutations.csv")),
            drug_interaction: Some(data.join("fallback_drugs.csv")),
            clinical_trial: Some(data.join("fallback_trials.csv")),
        };
        let table = FallbackTable::load(&config).unwrap();

        let tp53 = GeneSymbol::parse("TP53").unwrap();
        let egfr = GeneSymbol::parse("EGFR").unwrap();
        let expression = table.resolve(&tp53, SourceKind::Expression);
        assert_eq!(expression.rows().len(), 3);
        assert_eq!(expression.rows()[0].get("MedianTPM"), Some("185.61"));
        assert_eq!(table.resolve(&tp53, SourceKind::Mutation).rows().len(), 2);
        assert_eq!(table.resolve(&egfr, SourceKind::DrugInteraction).rows().len(), 2);
        assert_eq!(table.resolve(&egfr, SourceKind::ClinicalTrial).rows()[0].get("TrialId"), Some("NCT02296125"));
    }
}
