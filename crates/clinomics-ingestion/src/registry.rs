//! Source configuration and adapter construction.
//!
//! One slot per [`SourceKind`]; each slot selects the upstream API version
//! that serves it. An API may only fill the slot of the kind it produces.

use std::sync::Arc;

use clinomics_common::{ClinomicsError, SandboxClient};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::SourceKind;
use crate::sources::{
    ClinVarClient, ClinicalTrialsLegacyClient, ClinicalTrialsV2Client, DgidbGraphqlClient,
    DgidbV2Client, GtexClient, MyVariantClient, SourceAdapter,
};

/// Upstream API versions known to the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceApi {
    Gtex,
    Clinvar,
    Myvariant,
    DgidbV2,
    DgidbGraphql,
    CtgovV2,
    CtgovLegacy,
}

impl SourceApi {
    /// The kind of rows this API produces.
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceApi::Gtex                               => SourceKind::Expression,
            SourceApi::Clinvar | SourceApi::Myvariant     => SourceKind::Mutation,
            SourceApi::DgidbV2 | SourceApi::DgidbGraphql  => SourceKind::DrugInteraction,
            SourceApi::CtgovV2 | SourceApi::CtgovLegacy   => SourceKind::ClinicalTrial,
        }
    }

    pub fn default_for(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Expression      => SourceApi::Gtex,
            SourceKind::Mutation        => SourceApi::Clinvar,
            SourceKind::DrugInteraction => SourceApi::DgidbV2,
            SourceKind::ClinicalTrial   => SourceApi::CtgovV2,
        }
    }
}

/// Row cap applied when a slot does not set `max_rows`.
pub fn default_max_rows(kind: SourceKind) -> usize {
    match kind {
        SourceKind::Expression | SourceKind::Mutation             => 10,
        SourceKind::DrugInteraction | SourceKind::ClinicalTrial   => 5,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub api: Option<SourceApi>,
    pub base_url: Option<String>,
    pub max_rows: Option<usize>,
}

fn default_enabled() -> bool { true }

impl Default for SourceSettings {
    fn default() -> Self {
        Self { enabled: true, api: None, base_url: None, max_rows: None }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub expression: SourceSettings,
    #[serde(default)]
    pub mutation: SourceSettings,
    #[serde(default)]
    pub drug_interaction: SourceSettings,
    #[serde(default)]
    pub clinical_trial: SourceSettings,
}

impl SourcesConfig {
    pub fn settings(&self, kind: SourceKind) -> &SourceSettings {
        match kind {
            SourceKind::Expression      => &self.expression,
            SourceKind::Mutation        => &self.mutation,
            SourceKind::DrugInteraction => &self.drug_interaction,
            SourceKind::ClinicalTrial   => &self.clinical_trial,
        }
    }

    pub fn settings_mut(&mut self, kind: SourceKind) -> &mut SourceSettings {
        match kind {
            SourceKind::Expression      => &mut self.expression,
            SourceKind::Mutation        => &mut self.mutation,
            SourceKind::DrugInteraction => &mut self.drug_interaction,
            SourceKind::ClinicalTrial   => &mut self.clinical_trial,
        }
    }
}

/// A validated slot, ready to build.
struct ResolvedSource<'a> {
    api: SourceApi,
    max_rows: usize,
    base_url: Option<&'a str>,
}

fn resolve(kind: SourceKind, settings: &SourceSettings) -> Result<ResolvedSource<'_>, ClinomicsError> {
    let api = settings.api.unwrap_or_else(|| SourceApi::default_for(kind));
    if api.kind() != kind {
        return Err(ClinomicsError::Config(format!(
            "sources.{}: api {:?} produces {} rows, not {}",
            kind,
            api,
            api.kind(),
            kind
        )));
    }
    let max_rows = settings.max_rows.unwrap_or_else(|| default_max_rows(kind));
    if max_rows == 0 {
        return Err(ClinomicsError::Config(format!("sources.{}: max_rows must be at least 1", kind)));
    }
    Ok(ResolvedSource { api, max_rows, base_url: settings.base_url.as_deref() })
}

macro_rules! adapter {
    ($client:expr, $base_url:expr) => {{
        let adapter = $client;
        let adapter: Arc<dyn SourceAdapter> = match $base_url {
            Some(url) => Arc::new(adapter.with_base_url(url)),
            None => Arc::new(adapter),
        };
        adapter
    }};
}

/// Builds one adapter per enabled source, in [`SourceKind`] order.
///
/// Base URL overrides are added to the client's allowlist before any adapter
/// receives a copy of it.
pub fn build_adapters(
    config: &SourcesConfig,
    mut client: SandboxClient,
) -> Result<Vec<Arc<dyn SourceAdapter>>, ClinomicsError> {
    let mut resolved = Vec::new();
    for kind in SourceKind::ALL {
        let settings = config.settings(kind);
        if !settings.enabled {
            info!(source = %kind, "Source disabled");
            continue;
        }
        let source = resolve(kind, settings)?;
        if let Some(url) = source.base_url {
            client.allow_url(url)?;
        }
        resolved.push((kind, source));
    }

    let adapters = resolved
        .into_iter()
        .map(|(kind, source)| {
            let c = client.clone();
            let rows = source.max_rows;
            let url = source.base_url;
            let adapter = match source.api {
                SourceApi::Gtex         => adapter!(GtexClient::new(c, rows), url),
                SourceApi::Clinvar      => adapter!(ClinVarClient::new(c, rows), url),
                SourceApi::Myvariant    => adapter!(MyVariantClient::new(c, rows), url),
                SourceApi::DgidbV2      => adapter!(DgidbV2Client::new(c, rows), url),
                SourceApi::DgidbGraphql => adapter!(DgidbGraphqlClient::new(c, rows), url),
                SourceApi::CtgovV2      => adapter!(ClinicalTrialsV2Client::new(c, rows), url),
                SourceApi::CtgovLegacy  => adapter!(ClinicalTrialsLegacyClient::new(c, rows), url),
            };
            info!(source = %kind, api = adapter.api(), max_rows = rows, "Source configured");
            adapter
        })
        .collect();

    Ok(adapters)
}
