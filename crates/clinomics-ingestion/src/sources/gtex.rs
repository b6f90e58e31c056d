//! GTEx (Genotype-Tissue Expression) Portal API v2 client.
//! Fetches median gene expression (TPM) in normal tissues.
//!
//! GTEx keys expression by versioned GENCODE id, so a lookup is two requests:
//!   1. /reference/gene?geneId=TP53            → gencodeId
//!   2. /expression/medianGeneExpression       → one record per tissue

use async_trait::async_trait;
use clinomics_common::{GeneSymbol, SandboxClient as Client};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{fetch_body, or_na, parse_body, SourceAdapter};
use crate::models::{ResultRow, SourceKind, SourceResult};

pub const GTEX_API_URL: &str = "https://gtexportal.org/api/v2";

const GTEX_DATASET: &str = "gtex_v8";

pub struct GtexClient {
    client: Client,
    base_url: String,
    max_rows: usize,
}

impl GtexClient {
    pub fn new(client: Client, max_rows: usize) -> Self {
        Self { client, base_url: GTEX_API_URL.to_string(), max_rows }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn resolve_gencode_id(&self, gene: &GeneSymbol) -> Result<Option<String>, SourceResult> {
        let url = format!("{}/reference/gene", self.base_url);
        let request = self
            .client
            .get(&url)
            .map(|r| r.query(&[("geneId", gene.as_str())]));
        let body = fetch_body(self.api(), request).await?;
        parse_gene_reference(&body, gene)
    }
}

#[derive(Debug, Deserialize)]
struct Paged<T> {
    data: Option<Vec<T>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeneReference {
    gencode_id: Option<String>,
    gene_symbol: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MedianExpression {
    tissue_site_detail_id: Option<String>,
    median: Option<f64>,
    unit: Option<String>,
}

/// Picks the GENCODE id for `gene` out of a `/reference/gene` response.
///
/// `Ok(None)` when GTEx does not know the symbol.
pub fn parse_gene_reference(body: &str, gene: &GeneSymbol) -> Result<Option<String>, SourceResult> {
    let page: Paged<GeneReference> = parse_body("gtex", body)?;
    let candidates = page.data.unwrap_or_default();
    let exact = candidates.iter().find(|g| {
        g.gene_symbol
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(gene.as_str()))
    });
    Ok(exact
        .or_else(|| candidates.first())
        .and_then(|g| g.gencode_id.clone()))
}

/// Normalise a `/expression/medianGeneExpression` response.
pub fn parse_median_expression(body: &str, max_rows: usize) -> SourceResult {
    let page: Paged<MedianExpression> = match parse_body("gtex", body) {
        Ok(p) => p,
        Err(failed) => return failed,
    };
    let Some(records) = page.data else {
        return SourceResult::Empty;
    };

    let rows = records
        .into_iter()
        .take(max_rows)
        .map(|r| {
            ResultRow::new(
                SourceKind::Expression,
                vec![
                    or_na(r.tissue_site_detail_id),
                    or_na(r.median.map(|m| format!("{:.2}", m))),
                    or_na(r.unit),
                ],
            )
        })
        .collect();

    SourceResult::from_rows(rows)
}

#[async_trait]
impl SourceAdapter for GtexClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Expression
    }

    fn api(&self) -> &'static str {
        "gtex"
    }

    #[instrument(skip(self), fields(api = "gtex"))]
    async fn fetch(&self, gene: &GeneSymbol) -> SourceResult {
        let gencode_id = match self.resolve_gencode_id(gene).await {
            Ok(Some(id)) => id,
            Ok(None) => return SourceResult::Empty,
            Err(failed) => return failed,
        };
        debug!(%gencode_id, "Resolved GENCODE id");

        let url = format!("{}/expression/medianGeneExpression", self.base_url);
        let request = self.client.get(&url).map(|r| {
            r.query(&[
                ("gencodeId", gencode_id.as_str()),
                ("datasetId", GTEX_DATASET),
            ])
        });

        match fetch_body(self.api(), request).await {
            Ok(body) => parse_median_expression(&body, self.max_rows),
            Err(failed) => failed,
        }
    }
}
