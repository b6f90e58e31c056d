//! Per-gene aggregation across all configured sources.

use std::collections::HashSet;
use std::sync::Arc;

use clinomics_common::{ClinomicsError, GeneSymbol};
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

use crate::fallback::FallbackTable;
use crate::models::{GeneReport, Origin, SourceEntry, SourceKind, SourceResult, UpstreamIssue};
use crate::sources::SourceAdapter;

/// Default bound on concurrent upstream calls.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 6;

/// Runs every configured adapter for a gene and settles each outcome against
/// the fallback table.
///
/// All upstream calls made through one aggregator (across every gene of every
/// batch) share a single permit pool.
pub struct Aggregator {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    fallback: Arc<FallbackTable>,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
}

impl Aggregator {
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        fallback: Arc<FallbackTable>,
        max_concurrent_requests: usize,
    ) -> Result<Self, ClinomicsError> {
        if max_concurrent_requests == 0 {
            return Err(ClinomicsError::Config(
                "max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for adapter in &adapters {
            if !seen.insert(adapter.kind()) {
                return Err(ClinomicsError::Config(format!(
                    "More than one adapter configured for {}",
                    adapter.kind()
                )));
            }
        }

        Ok(Self {
            adapters,
            fallback,
            permits: Arc::new(Semaphore::new(max_concurrent_requests)),
            max_concurrent: max_concurrent_requests,
        })
    }

    /// Configured kinds, in report order.
    pub fn kinds(&self) -> Vec<SourceKind> {
        let mut kinds: Vec<_> = self.adapters.iter().map(|a| a.kind()).collect();
        kinds.sort();
        kinds
    }

    /// (kind, api) of every configured adapter.
    pub fn sources(&self) -> Vec<(SourceKind, &'static str)> {
        let mut sources: Vec<_> = self.adapters.iter().map(|a| (a.kind(), a.api())).collect();
        sources.sort();
        sources
    }

    pub fn max_concurrent_requests(&self) -> usize {
        self.max_concurrent
    }

    /// Validate a raw symbol and analyze it.
    pub async fn analyze_raw(&self, raw: &str) -> Result<GeneReport, ClinomicsError> {
        let gene = GeneSymbol::parse(raw)?;
        Ok(self.analyze(&gene).await)
    }

    /// One entry per configured source, whatever the upstreams do.
    #[instrument(skip(self), fields(gene = %gene))]
    pub async fn analyze(&self, gene: &GeneSymbol) -> GeneReport {
        let fetches = self
            .adapters
            .iter()
            .map(|adapter| self.fetch_one(adapter.as_ref(), gene));
        let entries = join_all(fetches).await;

        GeneReport {
            gene: gene.clone(),
            sources: entries.into_iter().collect(),
        }
    }

    /// One source only; `None` when `kind` is not configured.
    #[instrument(skip(self), fields(gene = %gene, source = %kind))]
    pub async fn analyze_source(&self, gene: &GeneSymbol, kind: SourceKind) -> Option<SourceEntry> {
        let adapter = self.adapters.iter().find(|a| a.kind() == kind)?;
        let (_, entry) = self.fetch_one(adapter.as_ref(), gene).await;
        Some(entry)
    }

    async fn fetch_one(&self, adapter: &dyn SourceAdapter, gene: &GeneSymbol) -> (SourceKind, SourceEntry) {
        let kind = adapter.kind();
        let result = match self.permits.acquire().await {
            Ok(permit) => {
                let result = adapter.fetch(gene).await;
                drop(permit);
                result
            }
            Err(_) => SourceResult::failed("request pool closed"),
        };
        (kind, self.settle(gene, kind, adapter.api(), result))
    }

    /// Substitutes fallback rows for an unusable live result.
    fn settle(&self, gene: &GeneSymbol, kind: SourceKind, api: &str, live: SourceResult) -> SourceEntry {
        let issue = match live {
            SourceResult::Ok { .. } => return SourceEntry::live(live),
            SourceResult::Empty => {
                debug!(source = %kind, api, "No live data");
                UpstreamIssue::NoData
            }
            SourceResult::Failed { reason } => {
                warn!(source = %kind, api, %reason, "Source failed");
                UpstreamIssue::Unavailable { reason }
            }
        };

        match self.fallback.resolve(gene, kind) {
            rows @ SourceResult::Ok { .. } => {
                warn!(source = %kind, "Serving fallback data");
                SourceEntry { result: rows, origin: Origin::Fallback, upstream: Some(issue) }
            }
            _ => SourceEntry { result: SourceResult::Empty, origin: Origin::Live, upstream: Some(issue) },
        }
    }
}
