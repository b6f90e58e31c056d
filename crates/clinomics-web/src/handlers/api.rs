//! JSON API handlers.

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use clinomics_common::GeneSymbol;
use clinomics_ingestion::{BatchReport, GeneReport, SourceEntry, SourceKind};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;
use crate::handlers::{read_gene_upload, submit, ApiJson};
use crate::state::{Caller, SharedState};

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub gene: String,
}

#[derive(Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub genes: Vec<String>,
}

#[derive(Serialize)]
struct SourceInfo {
    kind: SourceKind,
    adapter: &'static str,
}

pub async fn health(State(state): State<SharedState>) -> Json<Value> {
    let aggregator = state.driver.aggregator();
    let sources: Vec<SourceInfo> = aggregator
        .sources()
        .into_iter()
        .map(|(kind, adapter)| SourceInfo { kind, adapter })
        .collect();

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sources": sources,
        "max_concurrent_requests": aggregator.max_concurrent_requests(),
        "max_genes": state.driver.max_genes(),
        "require_login": state.require_login,
    }))
}

/// POST /api/analyze
pub async fn api_analyze(
    State(state): State<SharedState>,
    caller: Caller,
    ApiJson(req): ApiJson<AnalyzeRequest>,
) -> Result<Json<GeneReport>, ApiError> {
    let gene = GeneSymbol::parse(&req.gene)?;
    let batch = submit(&state, &caller, vec![gene]).await?;
    batch
        .into_reports()
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| ApiError::internal("analysis returned no report"))
}

/// POST /api/batch
pub async fn api_batch(
    State(state): State<SharedState>,
    caller: Caller,
    ApiJson(req): ApiJson<BatchRequest>,
) -> Result<Json<BatchReport>, ApiError> {
    let genes = state.prepare(&req.genes)?;
    info!(genes = genes.len(), "Batch submitted");
    Ok(Json(submit(&state, &caller, genes).await?))
}

/// POST /api/batch/upload
pub async fn api_batch_upload(
    State(state): State<SharedState>,
    caller: Caller,
    multipart: Multipart,
) -> Result<Json<BatchReport>, ApiError> {
    let tokens = read_gene_upload(multipart).await?;
    let genes = state.prepare(tokens)?;
    info!(genes = genes.len(), "Batch upload submitted");
    Ok(Json(submit(&state, &caller, genes).await?))
}

/// GET /api/genes/{gene}/{source}
pub async fn api_source(
    State(state): State<SharedState>,
    caller: Caller,
    Path((gene, source)): Path<(String, String)>,
) -> Result<Json<SourceEntry>, ApiError> {
    let gene = GeneSymbol::parse(&gene)?;
    let kind = SourceKind::from_name(&source)
        .filter(|kind| state.driver.aggregator().kinds().contains(kind))
        .ok_or_else(|| ApiError::NotFound(format!("Unknown source: {}", source)))?;

    state.charge(&caller).await?;
    let lookup = state.driver.aggregator().analyze_source(&gene, kind);
    match tokio::time::timeout(state.batch_timeout, lookup).await {
        Ok(Some(entry)) => Ok(Json(entry)),
        Ok(None) => Err(ApiError::NotFound(format!("Unknown source: {}", source))),
        Err(_) => Err(ApiError::Timeout(
            "The analysis took too long and was cancelled.".to_string(),
        )),
    }
}
