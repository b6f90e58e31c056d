//! Upstream source adapters.
//!
//! Each adapter owns exactly one upstream API: it knows the request shape and
//! the response schema, and nothing else in the crate does. Several adapters
//! may serve the same [`SourceKind`] (different API versions); configuration
//! picks one per kind.

pub mod clinicaltrials;
pub mod clinvar;
pub mod dgidb;
pub mod gtex;
pub mod mock;
pub mod myvariant;

use async_trait::async_trait;
use clinomics_common::sandbox::fetch_text;
use clinomics_common::{ClinomicsError, GeneSymbol};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::models::{SourceKind, SourceResult, NOT_AVAILABLE};

pub use clinicaltrials::{ClinicalTrialsLegacyClient, ClinicalTrialsV2Client};
pub use clinvar::ClinVarClient;
pub use dgidb::{DgidbGraphqlClient, DgidbV2Client};
pub use gtex::GtexClient;
pub use mock::MockAdapter;
pub use myvariant::MyVariantClient;

/// Common interface for all upstream source adapters.
///
/// `fetch` never fails: transport and parse problems are reported as
/// [`SourceResult::Failed`], absence of data as [`SourceResult::Empty`].
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Which logical source this adapter serves.
    fn kind(&self) -> SourceKind;

    /// Identifier of the upstream API version, e.g. `dgidb_v2`.
    fn api(&self) -> &'static str;

    /// Query the upstream for one gene and normalise the answer.
    async fn fetch(&self, gene: &GeneSymbol) -> SourceResult;
}

/// Sends a prepared request and returns the body, or the `Failed` result
/// describing why there is none.
pub(crate) async fn fetch_body(
    api: &str,
    request: Result<reqwest::RequestBuilder, ClinomicsError>,
) -> Result<String, SourceResult> {
    let outcome = match request {
        Ok(request) => fetch_text(request).await,
        Err(e) => Err(e),
    };
    outcome.map_err(|e| {
        debug!(api, error = %e, "Upstream request failed");
        SourceResult::failed(format!("{} request failed: {}", api, e.upstream_reason()))
    })
}

/// Deserialises an upstream body into its schema type.
pub(crate) fn parse_body<T: DeserializeOwned>(api: &str, body: &str) -> Result<T, SourceResult> {
    serde_json::from_str(body).map_err(|e| {
        SourceResult::failed(format!("{} returned an unexpected response: {}", api, e))
    })
}

/// Present, non-blank value or the `N/A` sentinel.
pub(crate) fn or_na(value: Option<String>) -> Option<String> {
    Some(
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
    )
}

/// Joins non-blank values, keeping first occurrences only; `N/A` when none remain.
pub(crate) fn join_or_na<I, S>(values: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen: Vec<String> = Vec::new();
    for value in values {
        let value = value.as_ref().trim();
        if !value.is_empty() && !seen.iter().any(|s| s == value) {
            seen.push(value.to_string());
        }
    }
    if seen.is_empty() {
        or_na(None)
    } else {
        Some(seen.join(", "))
    }
}
