//! Data models for the gene aggregation pipeline.

use std::collections::BTreeMap;

use clinomics_common::GeneSymbol;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// Sentinel substituted for optional upstream fields that are absent.
pub const NOT_AVAILABLE: &str = "N/A";

/// One logical upstream data provider.
///
/// Variant order is the order sources appear in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Expression,
    Mutation,
    DrugInteraction,
    ClinicalTrial,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Expression,
        SourceKind::Mutation,
        SourceKind::DrugInteraction,
        SourceKind::ClinicalTrial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Expression      => "expression",
            SourceKind::Mutation        => "mutation",
            SourceKind::DrugInteraction => "drug_interaction",
            SourceKind::ClinicalTrial   => "clinical_trial",
        }
    }

    /// Section title used by the UI and the PDF report.
    pub fn title(&self) -> &'static str {
        match self {
            SourceKind::Expression      => "Gene Expression",
            SourceKind::Mutation        => "Mutations",
            SourceKind::DrugInteraction => "Drug Matches",
            SourceKind::ClinicalTrial   => "Clinical Trials",
        }
    }

    /// Ordered output fields for rows of this source.
    pub fn schema(&self) -> &'static [&'static str] {
        match self {
            SourceKind::Expression      => &["Tissue", "MedianTPM", "Unit"],
            SourceKind::Mutation        => &["VariantID", "Description"],
            SourceKind::DrugInteraction => &["Drug", "InteractionType", "Source"],
            SourceKind::ClinicalTrial   => &["TrialId", "Title", "Status", "Country"],
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        SourceKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalised record: the source's schema fields, in schema order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    fields: Vec<(&'static str, Option<String>)>,
}

impl ResultRow {
    /// Builds a row for `kind`. Missing trailing values become null and
    /// surplus values are ignored.
    pub fn new(kind: SourceKind, values: Vec<Option<String>>) -> Self {
        let mut values = values.into_iter();
        let fields = kind
            .schema()
            .iter()
            .map(|name| (*name, values.next().flatten()))
            .collect();
        Self { fields }
    }

    /// Builds a row where every value is present.
    pub fn from_strings<I, S>(kind: SourceKind, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(kind, values.into_iter().map(|v| Some(v.into())).collect())
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| *name == field)
            .and_then(|(_, value)| value.as_deref())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, Option<&str>)> + '_ {
        self.fields.iter().map(|(name, value)| (*name, value.as_deref()))
    }
}

impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Outcome of one source lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceResult {
    /// At least one row.
    Ok { rows: Vec<ResultRow> },
    /// The upstream answered but had nothing for this gene.
    Empty,
    /// Transport or parse failure.
    Failed { reason: String },
}

impl SourceResult {
    /// `Ok` for a non-empty row set, `Empty` otherwise.
    pub fn from_rows(rows: Vec<ResultRow>) -> Self {
        if rows.is_empty() {
            SourceResult::Empty
        } else {
            SourceResult::Ok { rows }
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        SourceResult::Failed { reason: reason.into() }
    }

    pub fn is_usable(&self) -> bool {
        matches!(self, SourceResult::Ok { .. })
    }

    pub fn rows(&self) -> &[ResultRow] {
        match self {
            SourceResult::Ok { rows } => rows,
            _ => &[],
        }
    }
}

/// Where the rows of a [`SourceEntry`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Live,
    Fallback,
}

/// Why the live call produced nothing usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpstreamIssue {
    NoData,
    Unavailable { reason: String },
}

impl UpstreamIssue {
    pub fn message(&self) -> String {
        match self {
            UpstreamIssue::NoData => "No data found".to_string(),
            UpstreamIssue::Unavailable { reason } => format!("Service unavailable: {}", reason),
        }
    }
}

/// The final result for one source of one gene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceEntry {
    pub result: SourceResult,
    pub origin: Origin,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream: Option<UpstreamIssue>,
}

impl SourceEntry {
    pub fn live(result: SourceResult) -> Self {
        Self { result, origin: Origin::Live, upstream: None }
    }

    /// True when the rows shown are substitute data from the fallback table.
    pub fn is_degraded(&self) -> bool {
        self.origin == Origin::Fallback
    }
}

/// Every configured source's entry for one gene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneReport {
    pub gene: GeneSymbol,
    pub sources: BTreeMap<SourceKind, SourceEntry>,
}

impl GeneReport {
    pub fn get(&self, kind: SourceKind) -> Option<&SourceEntry> {
        self.sources.get(&kind)
    }

    pub fn degraded_sources(&self) -> Vec<SourceKind> {
        self.sources
            .iter()
            .filter(|(_, entry)| entry.is_degraded())
            .map(|(kind, _)| *kind)
            .collect()
    }
}

/// Gene reports in first-occurrence input order, one per distinct gene.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    reports: Vec<GeneReport>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a report unless the gene is already present.
    /// Returns false for a duplicate.
    pub fn push(&mut self, report: GeneReport) -> bool {
        if self.get(&report.gene).is_some() {
            return false;
        }
        self.reports.push(report);
        true
    }

    pub fn get(&self, gene: &GeneSymbol) -> Option<&GeneReport> {
        self.reports.iter().find(|r| &r.gene == gene)
    }

    pub fn genes(&self) -> impl Iterator<Item = &GeneSymbol> {
        self.reports.iter().map(|r| &r.gene)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GeneReport> {
        self.reports.iter()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn into_reports(self) -> Vec<GeneReport> {
        self.reports
    }
}

impl From<GeneReport> for BatchReport {
    fn from(report: GeneReport) -> Self {
        Self { reports: vec![report] }
    }
}

impl<'a> IntoIterator for &'a BatchReport {
    type Item = &'a GeneReport;
    type IntoIter = std::slice::Iter<'a, GeneReport>;

    fn into_iter(self) -> Self::IntoIter {
        self.reports.iter()
    }
}

impl Serialize for BatchReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.reports.len()))?;
        for report in &self.reports {
            map.serialize_entry(report.gene.as_str(), &report.sources)?;
        }
        map.end()
    }
}
