//! Batch driver: validates a gene list, then analyzes the genes with bounded
//! concurrency and assembles the reports in input order.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use clinomics_common::{ClinomicsError, GeneSymbol};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::aggregator::Aggregator;
use crate::models::{BatchReport, GeneReport, SourceKind};

pub const DEFAULT_GENE_CONCURRENCY: usize = 4;
pub const DEFAULT_MAX_GENES: usize = 200;

/// Published once per completed gene.
#[derive(Debug, Clone, Serialize)]
pub struct BatchProgress {
    pub batch_id: Uuid,
    pub gene: String,
    pub completed: usize,
    pub total: usize,
    pub degraded: Vec<SourceKind>,
}

/// Trim, uppercase, drop blanks, dedupe (first occurrence wins).
///
/// A single malformed token rejects the whole list.
pub fn normalize_genes<I, S>(tokens: I) -> Result<Vec<GeneSymbol>, ClinomicsError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut genes = Vec::new();
    for token in tokens {
        let token = token.as_ref().trim();
        if token.is_empty() {
            continue;
        }
        let gene = GeneSymbol::parse(token)?;
        if seen.insert(gene.clone()) {
            genes.push(gene);
        }
    }
    Ok(genes)
}

pub struct BatchDriver {
    aggregator: Arc<Aggregator>,
    gene_concurrency: usize,
    max_genes: usize,
    progress: Option<broadcast::Sender<BatchProgress>>,
}

impl BatchDriver {
    pub fn new(aggregator: Arc<Aggregator>) -> Self {
        Self {
            aggregator,
            gene_concurrency: DEFAULT_GENE_CONCURRENCY,
            max_genes: DEFAULT_MAX_GENES,
            progress: None,
        }
    }

    pub fn with_gene_concurrency(mut self, n: usize) -> Self {
        self.gene_concurrency = n.max(1);
        self
    }

    pub fn with_max_genes(mut self, n: usize) -> Self {
        self.max_genes = n.max(1);
        self
    }

    /// Publish a [`BatchProgress`] event per completed gene.
    pub fn with_progress(mut self, tx: broadcast::Sender<BatchProgress>) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn aggregator(&self) -> &Arc<Aggregator> {
        &self.aggregator
    }

    pub fn max_genes(&self) -> usize {
        self.max_genes
    }

    /// Validate a raw gene list. Nothing is fetched for a rejected list.
    pub fn prepare<I, S>(&self, tokens: I) -> Result<Vec<GeneSymbol>, ClinomicsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let genes = normalize_genes(tokens)?;
        if genes.is_empty() {
            return Err(ClinomicsError::InvalidInput("At least one gene name is required.".to_string()));
        }
        if genes.len() > self.max_genes {
            return Err(ClinomicsError::InvalidInput(format!(
                "Too many genes: {} (maximum {}).",
                genes.len(),
                self.max_genes
            )));
        }
        Ok(genes)
    }

    pub async fn analyze_batch<I, S>(&self, tokens: I) -> Result<BatchReport, ClinomicsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.analyze_batch_until(tokens, CancellationToken::new()).await
    }

    /// Like [`analyze_batch`](Self::analyze_batch), abandoning all work when
    /// `cancel` fires.
    pub async fn analyze_batch_until<I, S>(
        &self,
        tokens: I,
        cancel: CancellationToken,
    ) -> Result<BatchReport, ClinomicsError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let genes = self.prepare(tokens)?;
        self.run_until(genes, cancel).await
    }

    /// Analyze already validated genes.
    ///
    /// Returns [`ClinomicsError::Cancelled`] and no partial report when the
    /// token fires first.
    #[instrument(skip(self, genes, cancel), fields(genes = genes.len()))]
    pub async fn run_until(
        &self,
        genes: Vec<GeneSymbol>,
        cancel: CancellationToken,
    ) -> Result<BatchReport, ClinomicsError> {
        let batch_id = Uuid::new_v4();
        let total = genes.len();
        let completed = AtomicUsize::new(0);
        let completed = &completed;
        info!(%batch_id, total, concurrency = self.gene_concurrency, "Batch started");

        let run = async {
            let reports: Vec<GeneReport> = stream::iter(genes.into_iter())
                .map(|gene| async move {
                    let report = self.aggregator.analyze(&gene).await;
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    self.publish(batch_id, &report, done, total);
                    report
                })
                .buffered(self.gene_concurrency)
                .collect()
                .await;

            let mut batch = BatchReport::new();
            for report in reports {
                batch.push(report);
            }
            batch
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(%batch_id, completed = completed.load(Ordering::SeqCst), total, "Batch cancelled");
                Err(ClinomicsError::Cancelled)
            }
            batch = run => {
                info!(%batch_id, genes = batch.len(), "Batch finished");
                Ok(batch)
            }
        }
    }

    fn publish(&self, batch_id: Uuid, report: &GeneReport, completed: usize, total: usize) {
        if let Some(tx) = &self.progress {
            // No subscribers is fine.
            let _ = tx.send(BatchProgress {
                batch_id,
                gene: report.gene.to_string(),
                completed,
                total,
                degraded: report.degraded_sources(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::FallbackTable;
    use crate::sources::{MockAdapter, SourceAdapter};
    use std::time::Duration;

    fn driver() -> BatchDriver {
        let adapters: Vec<Arc<dyn SourceAdapter>> = SourceKind::ALL
            .into_iter()
            .map(|k| Arc::new(MockAdapter::new(k).echoing()) as Arc<dyn SourceAdapter>)
            .collect();
        let agg = Aggregator::new(adapters, Arc::new(FallbackTable::empty()), 6).unwrap();
        BatchDriver::new(Arc::new(agg))
    }

    #[test]
    fn test_normalize_dedups_first_occurrence() {
        let genes = normalize_genes([" tp53", "BRCA1", "", "TP53 ", "egfr"]).unwrap();
        let names: Vec<_> = genes.iter().map(|g| g.as_str()).collect();
        assert_eq!(names, vec!["TP53", "BRCA1", "EGFR"]);
    }

    #[test]
    fn test_prepare_rejects_whole_batch() {
        let d = driver();
        assert!(d.prepare(["TP53", "BAD GENE", "BRCA1"]).is_err());
        assert!(d.prepare(["", "  "]).is_err());
        let d = d.with_max_genes(2);
        assert!(d.prepare(["A1", "A2", "A3"]).is_err());
        assert!(d.prepare(["A1", "A2", "a1"]).is_ok());
    }

    #[tokio::test]
    async fn test_batch_keeps_input_order() {
        let batch = driver().analyze_batch(["TP53", "tp53", "BRCA1"]).await.unwrap();
        let genes: Vec<_> = batch.genes().map(|g| g.as_str()).collect();
        assert_eq!(genes, vec!["TP53", "BRCA1"]);
        for report in &batch {
            assert_eq!(report.sources.len(), 4);
        }
    }

    #[tokio::test]
    async fn test_progress_event_per_gene() {
        let (tx, mut rx) = broadcast::channel(16);
        let d = driver().with_progress(tx);
        d.analyze_batch(["KRAS", "EGFR", "kras"]).await.unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.total, 2);
        assert_eq!(second.completed, 2);
        assert_eq!(first.batch_id, second.batch_id);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancelled_batch_returns_no_report() {
        let adapters: Vec<Arc<dyn SourceAdapter>> = vec![Arc::new(
            MockAdapter::new(SourceKind::Mutation)
                .echoing()
                .with_delay(Duration::from_secs(30)),
        )];
        let agg = Aggregator::new(adapters, Arc::new(FallbackTable::empty()), 6).unwrap();
        let d = BatchDriver::new(Arc::new(agg));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let outcome = d.analyze_batch_until(["TP53", "BRCA1"], cancel).await;
        assert!(matches!(outcome, Err(ClinomicsError::Cancelled)));
    }

    #[tokio::test]
    async fn test_bounded_pool_matches_sequential_run() {
        let counters = MockAdapter::new(SourceKind::Expression);
        let adapters: Vec<Arc<dyn SourceAdapter>> = SourceKind::ALL
            .into_iter()
            .map(|k| {
                Arc::new(
                    MockAdapter::new(k)
                        .echoing()
                        .with_delay(Duration::from_millis(5))
                        .sharing_counters(&counters),
                ) as Arc<dyn SourceAdapter>
            })
            .collect();
        let agg = Arc::new(Aggregator::new(adapters, Arc::new(FallbackTable::empty()), 4).unwrap());
        let genes: Vec<String> = (1..=50).map(|i| format!("GENE{}", i)).collect();

        let pooled = BatchDriver::new(Arc::clone(&agg))
            .with_gene_concurrency(8)
            .analyze_batch(&genes)
            .await
            .unwrap();
        let sequential = BatchDriver::new(agg)
            .with_gene_concurrency(1)
            .analyze_batch(&genes)
            .await
            .unwrap();

        assert_eq!(pooled.len(), 50);
        assert_eq!(pooled, sequential);
        assert_eq!(counters.calls(), 2 * 50 * 4);
        assert!(counters.peak_in_flight() <= 4);
        assert!(counters.peak_in_flight() > 1);
    }
}
