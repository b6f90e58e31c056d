//! DGIdb (Drug-Gene Interaction database) clients.
//!
//! Two API generations are supported:
//!   - v2 REST:  https://dgidb.org/api/v2/interactions.json?genes=TP53
//!   - GraphQL:  https://dgidb.org/api/graphql (DGIdb 5)
//!
//! Rows: Drug, InteractionType, Source. Interaction types and sources are
//! joined with ", ".

use async_trait::async_trait;
use clinomics_common::{GeneSymbol, SandboxClient as Client};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

use super::{fetch_body, join_or_na, or_na, parse_body, SourceAdapter};
use crate::models::{ResultRow, SourceKind, SourceResult};

pub const DGIDB_V2_API_URL: &str = "https://dgidb.org/api/v2/interactions.json";
pub const DGIDB_GRAPHQL_URL: &str = "https://dgidb.org/api/graphql";

const INTERACTIONS_QUERY: &str = "query Interactions($names: [String!]) {
  genes(names: $names) {
    nodes {
      name
      interactions {
        drug { name }
        interactionTypes { type }
        sources { sourceDbName }
      }
    }
  }
}";

// ── v2 REST ───────────────────────────────────────────────────────────────────

pub struct DgidbV2Client {
    client: Client,
    base_url: String,
    max_rows: usize,
}

impl DgidbV2Client {
    pub fn new(client: Client, max_rows: usize) -> Self {
        Self { client, base_url: DGIDB_V2_API_URL.to_string(), max_rows }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InteractionsResponse {
    matched_terms: Option<Vec<MatchedTerm>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchedTerm {
    gene_name: Option<String>,
    interactions: Option<Vec<V2Interaction>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct V2Interaction {
    drug_name: Option<String>,
    #[serde(default)]
    interaction_types: Vec<String>,
    #[serde(default)]
    sources: Vec<String>,
}

/// Normalise a v2 `interactions.json` response.
///
/// The matched term whose gene name equals `gene` is preferred; otherwise the
/// first matched term is used.
pub fn parse_interactions_v2(body: &str, gene: &GeneSymbol, max_rows: usize) -> SourceResult {
    let response: InteractionsResponse = match parse_body("dgidb_v2", body) {
        Ok(r) => r,
        Err(failed) => return failed,
    };
    let Some(terms) = response.matched_terms else {
        return SourceResult::Empty;
    };

    let term = pick_term(terms, gene, |t| t.gene_name.as_deref());
    let Some(interactions) = term.and_then(|t| t.interactions) else {
        return SourceResult::Empty;
    };

    let rows = interactions
        .into_iter()
        .take(max_rows)
        .map(|i| {
            ResultRow::new(
                SourceKind::DrugInteraction,
                vec![
                    or_na(i.drug_name),
                    join_or_na(i.interaction_types),
                    join_or_na(i.sources),
                ],
            )
        })
        .collect();

    SourceResult::from_rows(rows)
}

fn pick_term<T>(terms: Vec<T>, gene: &GeneSymbol, name: impl Fn(&T) -> Option<&str>) -> Option<T> {
    let exact = terms
        .iter()
        .position(|t| name(t).is_some_and(|n| n.eq_ignore_ascii_case(gene.as_str())));
    let mut terms = terms.into_iter();
    match exact {
        Some(idx) => terms.nth(idx),
        None => terms.next(),
    }
}

#[async_trait]
impl SourceAdapter for DgidbV2Client {
    fn kind(&self) -> SourceKind {
        SourceKind::DrugInteraction
    }

    fn api(&self) -> &'static str {
        "dgidb_v2"
    }

    #[instrument(skip(self), fields(api = "dgidb_v2"))]
    async fn fetch(&self, gene: &GeneSymbol) -> SourceResult {
        let request = self.client.get(&self.base_url).map(|r| {
            r.header(reqwest::header::ACCEPT, "application/json")
                .query(&[("genes", gene.as_str())])
        });

        match fetch_body(self.api(), request).await {
            Ok(body) => {
                let result = parse_interactions_v2(&body, gene, self.max_rows);
                debug!(rows = result.rows().len(), "DGIdb interactions retrieved");
                result
            }
            Err(failed) => failed,
        }
    }
}

// ── GraphQL ───────────────────────────────────────────────────────────────────

pub struct DgidbGraphqlClient {
    client: Client,
    base_url: String,
    max_rows: usize,
}

impl DgidbGraphqlClient {
    pub fn new(client: Client, max_rows: usize) -> Self {
        Self { client, base_url: DGIDB_GRAPHQL_URL.to_string(), max_rows }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct GraphqlEnvelope {
    data: Option<GraphqlData>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphqlData {
    genes: Option<GeneConnection>,
}

#[derive(Debug, Deserialize)]
struct GeneConnection {
    #[serde(default)]
    nodes: Vec<GeneNode>,
}

#[derive(Debug, Deserialize)]
struct GeneNode {
    name: Option<String>,
    #[serde(default)]
    interactions: Vec<GqlInteraction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GqlInteraction {
    drug: Option<GqlDrug>,
    #[serde(default)]
    interaction_types: Vec<GqlInteractionType>,
    #[serde(default)]
    sources: Vec<GqlSource>,
}

#[derive(Debug, Deserialize)]
struct GqlDrug {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GqlInteractionType {
    #[serde(rename = "type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GqlSource {
    source_db_name: Option<String>,
}

/// Normalise a DGIdb GraphQL response envelope.
///
/// GraphQL errors without data are a failure; errors alongside data are
/// ignored.
pub fn parse_interactions_graphql(body: &str, gene: &GeneSymbol, max_rows: usize) -> SourceResult {
    let envelope: GraphqlEnvelope = match parse_body("dgidb_graphql", body) {
        Ok(e) => e,
        Err(failed) => return failed,
    };

    let Some(data) = envelope.data else {
        if envelope.errors.is_empty() {
            return SourceResult::Empty;
        }
        let messages: Vec<String> = envelope
            .errors
            .into_iter()
            .filter_map(|e| e.message)
            .collect();
        return SourceResult::failed(format!("dgidb_graphql returned errors: {}", messages.join("; ")));
    };

    let Some(genes) = data.genes else {
        return SourceResult::Empty;
    };
    let Some(node) = pick_term(genes.nodes, gene, |n| n.name.as_deref()) else {
        return SourceResult::Empty;
    };

    let rows = node
        .interactions
        .into_iter()
        .take(max_rows)
        .map(|i| {
            ResultRow::new(
                SourceKind::DrugInteraction,
                vec![
                    or_na(i.drug.and_then(|d| d.name)),
                    join_or_na(i.interaction_types.into_iter().filter_map(|t| t.kind)),
                    join_or_na(i.sources.into_iter().filter_map(|s| s.source_db_name)),
                ],
            )
        })
        .collect();

    SourceResult::from_rows(rows)
}

#[async_trait]
impl SourceAdapter for DgidbGraphqlClient {
    fn kind(&self) -> SourceKind {
        SourceKind::DrugInteraction
    }

    fn api(&self) -> &'static str {
        "dgidb_graphql"
    }

    #[instrument(skip(self), fields(api = "dgidb_graphql"))]
    async fn fetch(&self, gene: &GeneSymbol) -> SourceResult {
        let payload = json!({
            "query": INTERACTIONS_QUERY,
            "variables": { "names": [gene.as_str()] },
        });
        let request = self.client.post(&self.base_url).map(|r| r.json(&payload));

        match fetch_body(self.api(), request).await {
            Ok(body) => parse_interactions_graphql(&body, gene, self.max_rows),
            Err(failed) => failed,
        }
    }
}
