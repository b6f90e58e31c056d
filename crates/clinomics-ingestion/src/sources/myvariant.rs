//! MyVariant.info query client (ClinVar annotations per gene).
//!
//! Endpoint: https://myvariant.info/v1/query
//! Rows: VariantID = hit `_id` (HGVS genomic id), Description = the ClinVar
//! clinical significance of the first RCV record.

use async_trait::async_trait;
use clinomics_common::{GeneSymbol, SandboxClient as Client};
use serde::Deserialize;
use tracing::instrument;

use super::{fetch_body, or_na, parse_body, SourceAdapter};
use crate::models::{ResultRow, SourceKind, SourceResult};

pub const MYVARIANT_API_URL: &str = "https://myvariant.info/v1/query";

pub struct MyVariantClient {
    client: Client,
    base_url: String,
    max_rows: usize,
}

impl MyVariantClient {
    pub fn new(client: Client, max_rows: usize) -> Self {
        Self { client, base_url: MYVARIANT_API_URL.to_string(), max_rows }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    hits: Option<Vec<Hit>>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: Option<String>,
    clinvar: Option<ClinVarAnnotation>,
}

#[derive(Debug, Deserialize)]
struct ClinVarAnnotation {
    rcv: Option<OneOrMany<Rcv>>,
}

#[derive(Debug, Deserialize)]
struct Rcv {
    clinical_significance: Option<String>,
}

/// MyVariant collapses single-element lists into a bare object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_first(self) -> Option<T> {
        match self {
            OneOrMany::Many(items) => items.into_iter().next(),
            OneOrMany::One(item) => Some(item),
        }
    }
}

/// Normalise a MyVariant.info query response.
pub fn parse_hits(body: &str, max_rows: usize) -> SourceResult {
    let response: QueryResponse = match parse_body("myvariant", body) {
        Ok(r) => r,
        Err(failed) => return failed,
    };
    let Some(hits) = response.hits else {
        return SourceResult::Empty;
    };

    let rows = hits
        .into_iter()
        .take(max_rows)
        .map(|hit| {
            let significance = hit
                .clinvar
                .and_then(|c| c.rcv)
                .and_then(OneOrMany::into_first)
                .and_then(|rcv| rcv.clinical_significance);
            ResultRow::new(SourceKind::Mutation, vec![or_na(hit.id), or_na(significance)])
        })
        .collect();

    SourceResult::from_rows(rows)
}

#[async_trait]
impl SourceAdapter for MyVariantClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Mutation
    }

    fn api(&self) -> &'static str {
        "myvariant"
    }

    #[instrument(skip(self), fields(api = "myvariant"))]
    async fn fetch(&self, gene: &GeneSymbol) -> SourceResult {
        let query = format!("clinvar.gene.symbol:{}", gene);
        let size = self.max_rows.to_string();
        let request = self.client.get(&self.base_url).map(|r| {
            r.query(&[
                ("q",      query.as_str()),
                ("fields", "clinvar.rcv.clinical_significance"),
                ("size",   size.as_str()),
            ])
        });

        match fetch_body(self.api(), request).await {
            Ok(body) => parse_hits(&body, self.max_rows),
            Err(failed) => failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_hits_single_and_many_rcv() {
        let body = json!({
            "total": 3,
            "hits": [
                { "_id": "chr17:g.7674220C>T", "clinvar": { "rcv": { "clinical_significance": "Pathogenic" } } },
                { "_id": "chr17:g.7673802C>T", "clinvar": { "rcv": [
                    { "clinical_significance": "Likely pathogenic" },
                    { "clinical_significance": "Uncertain significance" }
                ] } },
                { "_id": "chr17:g.7670000A>G" }
            ]
        })
        .to_string();

        let result = parse_hits(&body, 10);
        let rows = result.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].get("Description"), Some("Pathogenic"));
        assert_eq!(rows[1].get("Description"), Some("Likely pathogenic"));
        assert_eq!(rows[2].get("Description"), Some("N/A"));
    }

    #[test]
    fn test_missing_hits_is_empty() {
        assert_eq!(parse_hits(r#"{"success": false}"#, 10), SourceResult::Empty);
        assert_eq!(parse_hits(r#"{"total": 0, "hits": []}"#, 10), SourceResult::Empty);
    }
}
