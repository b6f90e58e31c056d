//! clinomics-ingestion: Gene-centric aggregation of biomedical sources.
//!
//! - Source adapters (GTEx, ClinVar/MyVariant, DGIdb, ClinicalTrials.gov)
//! - Local fallback table for failed or empty sources
//! - Per-gene aggregation under a shared request bound
//! - Ordered, cancellable batch analysis
//! - Gene-list parsing for text and file uploads

pub mod aggregator;
pub mod batch;
pub mod fallback;
pub mod gene_list;
pub mod models;
pub mod registry;
pub mod sources;

pub use aggregator::Aggregator;
pub use batch::{normalize_genes, BatchDriver, BatchProgress};
pub use fallback::{FallbackConfig, FallbackTable};
pub use models::{
    BatchReport, GeneReport, Origin, ResultRow, SourceEntry, SourceKind, SourceResult, UpstreamIssue,
};
pub use registry::{build_adapters, SourceApi, SourceSettings, SourcesConfig};
pub use sources::SourceAdapter;
