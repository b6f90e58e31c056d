//! Adapters and the full aggregation path against a local stand-in upstream.
//!
//! Run with: cargo test --package clinomics-ingestion --test test_http_adapters

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use clinomics_common::{GeneSymbol, SandboxClient};
use clinomics_ingestion::fallback::FallbackTable;
use clinomics_ingestion::sources::dgidb::DgidbV2Client;
use clinomics_ingestion::sources::gtex::GtexClient;
use clinomics_ingestion::sources::SourceAdapter;
use clinomics_ingestion::{
    build_adapters, Aggregator, BatchDriver, Origin, ResultRow, SourceKind, SourceResult, SourcesConfig,
    UpstreamIssue,
};
use serde_json::{json, Value};
use std::collections::HashMap;

async fn dgidb(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    let gene = q.get("genes").cloned().unwrap_or_default();
    let interactions: Vec<Value> = (1..=20)
        .map(|i| json!({ "drugName": format!("DRUG{}", i), "interactionTypes": ["inhibitor"], "sources": ["CIViC"] }))
        .collect();
    Json(json!({ "matchedTerms": [{ "geneName": gene, "interactions": interactions }] }))
}

async fn gtex_reference(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    match q.get("geneId").map(String::as_str) {
        Some("TP53") => Json(json!({ "data": [{ "gencodeId": "ENSG00000141510.16", "geneSymbol": "TP53" }] })),
        _ => Json(json!({ "data": [] })),
    }
}

async fn gtex_median(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    assert_eq!(q.get("gencodeId").map(String::as_str), Some("ENSG00000141510.16"));
    Json(json!({ "data": [
        { "tissueSiteDetailId": "Lung", "median": 40.5, "unit": "TPM" },
        { "tissueSiteDetailId": "Liver", "median": 12.0, "unit": "TPM" }
    ] }))
}

async fn clinvar() -> Json<Value> {
    Json(json!([2, ["1", "2"], null, [["12345", "NM_000546.6(TP53):c.215C>G"], ["67890", null]]]))
}

async fn broken() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!({}))
}

async fn spawn_upstream() -> SocketAddr {
    let app = Router::new()
        .route("/dgidb/interactions.json", get(dgidb))
        .route("/gtex/reference/gene", get(gtex_reference))
        .route("/gtex/expression/medianGeneExpression", get(gtex_median))
        .route("/clinvar/search", get(clinvar))
        .route("/broken", get(broken))
        .route("/slow", get(slow));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn client(timeout: Duration) -> SandboxClient {
    SandboxClient::new(timeout).unwrap()
}

fn tp53() -> GeneSymbol {
    GeneSymbol::parse("tp53").unwrap()
}

#[tokio::test]
async fn test_dgidb_truncates_to_max_rows_in_upstream_order() {
    let addr = spawn_upstream().await;
    let adapter = DgidbV2Client::new(client(Duration::from_secs(5)), 5)
        .with_base_url(format!("http://{}/dgidb/interactions.json", addr));

    let result = adapter.fetch(&tp53()).await;
    let drugs: Vec<_> = result.rows().iter().map(|r| r.get("Drug").unwrap()).collect();
    assert_eq!(drugs, vec!["DRUG1", "DRUG2", "DRUG3", "DRUG4", "DRUG5"]);
}

#[tokio::test]
async fn test_gtex_two_step_lookup() {
    let addr = spawn_upstream().await;
    let adapter = GtexClient::new(client(Duration::from_secs(5)), 10)
        .with_base_url(format!("http://{}/gtex/", addr));

    let result = adapter.fetch(&tp53()).await;
    assert_eq!(result.rows().len(), 2);
    assert_eq!(result.rows()[0].get("MedianTPM"), Some("40.50"));

    let unknown = GeneSymbol::parse("NOTAGENE").unwrap();
    assert_eq!(adapter.fetch(&unknown).await, SourceResult::Empty);
}

#[tokio::test]
async fn test_server_error_is_failed() {
    let addr = spawn_upstream().await;
    let adapter = DgidbV2Client::new(client(Duration::from_secs(5)), 5)
        .with_base_url(format!("http://{}/broken", addr));

    match adapter.fetch(&tp53()).await {
        SourceResult::Failed { reason } => assert!(reason.contains("500"), "reason: {}", reason),
        other => panic!("expected Failed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_timeout_is_failed() {
    let addr = spawn_upstream().await;
    let adapter = DgidbV2Client::new(client(Duration::from_millis(200)), 5)
        .with_base_url(format!("http://{}/slow", addr));

    match adapter.fetch(&tp53()).await {
        SourceResult::Failed { reason } => assert!(reason.contains("timed out"), "reason: {}", reason),
        other => panic!("expected Failed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_disallowed_host_is_failed_without_request() {
    let adapter = DgidbV2Client::new(client(Duration::from_secs(1)), 5)
        .with_base_url("http://example.invalid/interactions.json");
    assert!(matches!(adapter.fetch(&tp53()).await, SourceResult::Failed { .. }));
}

#[tokio::test]
async fn test_configured_pipeline_end_to_end() {
    let addr = spawn_upstream().await;
    let mut config = SourcesConfig::default();
    config.expression.base_url = Some(format!("http://{}/gtex", addr));
    config.mutation.base_url = Some(format!("http://{}/clinvar/search", addr));
    config.drug_interaction.base_url = Some(format!("http://{}/dgidb/interactions.json", addr));
    config.clinical_trial.base_url = Some(format!("http://{}/broken", addr));

    let adapters = build_adapters(&config, client(Duration::from_secs(5))).unwrap();
    let fallback = FallbackTable::empty().with(
        "TP53",
        SourceKind::ClinicalTrial,
        ResultRow::from_strings(SourceKind::ClinicalTrial, ["NCT00000001", "Fallback trial", "Completed", "France"]),
    );
    let aggregator = Aggregator::new(adapters, Arc::new(fallback), 3).unwrap();
    let driver = BatchDriver::new(Arc::new(aggregator));

    let batch = driver.analyze_batch(["tp53", "BRCA1", "TP53"]).await.unwrap();
    let genes: Vec<_> = batch.genes().map(|g| g.as_str()).collect();
    assert_eq!(genes, vec!["TP53", "BRCA1"]);

    let tp53 = batch.get(&tp53()).unwrap();
    assert_eq!(tp53.sources.len(), 4);
    assert_eq!(tp53.get(SourceKind::Mutation).unwrap().result.rows()[1].get("Description"), Some("N/A"));

    let trials = tp53.get(SourceKind::ClinicalTrial).unwrap();
    assert_eq!(trials.origin, Origin::Fallback);
    assert!(matches!(trials.upstream, Some(UpstreamIssue::Unavailable { .. })));

    let brca1 = batch.get(&GeneSymbol::parse("BRCA1").unwrap()).unwrap();
    let expression = brca1.get(SourceKind::Expression).unwrap();
    assert_eq!(expression.result, SourceResult::Empty);
    assert_eq!(expression.upstream, Some(UpstreamIssue::NoData));
    // No fallback rows for BRCA1: empty, not failed.
    assert_eq!(brca1.get(SourceKind::ClinicalTrial).unwrap().result, SourceResult::Empty);
}
