//! In-memory adapter for tests and offline demos.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clinomics_common::GeneSymbol;

use super::SourceAdapter;
use crate::models::{ResultRow, SourceKind, SourceResult};

/// Adapter that answers from a fixed table.
///
/// Tracks how many fetches ran and the peak number running at once, so
/// concurrency bounds can be asserted.
#[derive(Clone)]
pub struct MockAdapter {
    kind: SourceKind,
    responses: HashMap<String, SourceResult>,
    default: SourceResult,
    echo: bool,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
}

impl MockAdapter {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            responses: HashMap::new(),
            default: SourceResult::Empty,
            echo: false,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Fixed answer for one gene (matched case-insensitively).
    pub fn with(mut self, gene: &str, result: SourceResult) -> Self {
        self.responses.insert(gene.trim().to_uppercase(), result);
        self
    }

    /// Answer for genes without a fixed entry. Defaults to `Empty`.
    pub fn with_default(mut self, result: SourceResult) -> Self {
        self.default = result;
        self
    }

    /// Answers every gene with rows derived from the gene symbol itself.
    pub fn echoing(mut self) -> Self {
        self.echo = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Share call and in-flight counters with `other`, so several mocks
    /// report one combined peak.
    pub fn sharing_counters(mut self, other: &MockAdapter) -> Self {
        self.calls = Arc::clone(&other.calls);
        self.in_flight = Arc::clone(&other.in_flight);
        self.peak_in_flight = Arc::clone(&other.peak_in_flight);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn answer(&self, gene: &GeneSymbol) -> SourceResult {
        match self.responses.get(gene.as_str()) {
            Some(result) => result.clone(),
            None if self.echo => {
                let values = self
                    .kind
                    .schema()
                    .iter()
                    .map(|field| format!("{}-{}", gene, field));
                SourceResult::from_rows(vec![ResultRow::from_strings(self.kind, values)])
            }
            None => self.default.clone(),
        }
    }
}

#[async_trait]
impl SourceAdapter for MockAdapter {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn api(&self) -> &'static str {
        "mock"
    }

    async fn fetch(&self, gene: &GeneSymbol) -> SourceResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let result = self.answer(gene);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
