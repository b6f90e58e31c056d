//! HTML rendering with minijinja.
//!
//! Templates are compiled into the binary. Names end in `.html`, so every
//! interpolated value is auto-escaped.

use clinomics_accounts::Account;
use clinomics_ingestion::models::NOT_AVAILABLE;
use clinomics_ingestion::{BatchReport, GeneReport, SourceEntry, SourceKind, SourceResult};
use minijinja::{context, Environment};
use serde::Serialize;

use crate::error::ApiError;

pub struct Templates {
    env: Environment<'static>,
}

#[derive(Debug, Serialize)]
struct GeneView {
    gene: String,
    sections: Vec<SectionView>,
}

#[derive(Debug, Serialize)]
struct SectionView {
    kind: &'static str,
    title: &'static str,
    columns: &'static [&'static str],
    rows: Vec<Vec<String>>,
    /// Shown instead of a table.
    warning: Option<String>,
    /// Shown above the table of a degraded source.
    fallback_note: Option<String>,
}

impl SectionView {
    fn new(kind: SourceKind, entry: &SourceEntry) -> Self {
        let rows = entry
            .result
            .rows()
            .iter()
            .map(|row| {
                row.fields()
                    .map(|(_, value)| value.unwrap_or(NOT_AVAILABLE).to_string())
                    .collect()
            })
            .collect();

        let upstream = entry.upstream.as_ref().map(|u| u.message());
        let (warning, fallback_note) = match &entry.result {
            SourceResult::Ok { .. } if entry.is_degraded() => (
                None,
                Some(match upstream {
                    Some(reason) => format!("Served from local fallback ({}).", reason),
                    None => "Served from local fallback.".to_string(),
                }),
            ),
            SourceResult::Ok { .. } => (None, None),
            SourceResult::Empty => (Some(upstream.unwrap_or_else(|| "No data found".to_string())), None),
            SourceResult::Failed { reason } => (Some(format!("Service unavailable: {}", reason)), None),
        };

        Self {
            kind: kind.as_str(),
            title: kind.title(),
            columns: kind.schema(),
            rows,
            warning,
            fallback_note,
        }
    }
}

impl GeneView {
    fn new(report: &GeneReport) -> Self {
        Self {
            gene: report.gene.to_string(),
            sections: report
                .sources
                .iter()
                .map(|(kind, entry)| SectionView::new(*kind, entry))
                .collect(),
        }
    }
}

impl Templates {
    pub fn new() -> Result<Self, ApiError> {
        let mut env = Environment::new();
        env.add_template("base.html", include_str!("../templates/base.html"))?;
        env.add_template("index.html", include_str!("../templates/index.html"))?;
        env.add_template("results.html", include_str!("../templates/results.html"))?;
        env.add_template("account.html", include_str!("../templates/account.html"))?;
        Ok(Self { env })
    }

    pub fn index(&self, account: Option<&Account>, error: Option<&str>) -> Result<String, ApiError> {
        let tmpl = self.env.get_template("index.html")?;
        Ok(tmpl.render(context! { account, error })?)
    }

    pub fn results(&self, batch: &BatchReport, account: Option<&Account>) -> Result<String, ApiError> {
        let genes: Vec<GeneView> = batch.iter().map(GeneView::new).collect();
        let tmpl = self.env.get_template("results.html")?;
        Ok(tmpl.render(context! { genes, account })?)
    }

    pub fn account(
        &self,
        account: Option<&Account>,
        message: Option<&str>,
        error: Option<&str>,
    ) -> Result<String, ApiError> {
        let tmpl = self.env.get_template("account.html")?;
        Ok(tmpl.render(context! { account, message, error })?)
    }
}
