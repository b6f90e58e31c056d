//! ClinicalTrials.gov clients.
//!
//! Two API generations are supported:
//!   - v2:     https://clinicaltrials.gov/api/v2/studies (nested protocol modules)
//!   - legacy: https://clinicaltrials.gov/api/query/study_fields (every field is
//!             an array of strings)
//!
//! Both normalise to ClinicalTrial rows: TrialId, Title, Status, Country.

use async_trait::async_trait;
use clinomics_common::{GeneSymbol, SandboxClient as Client};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{fetch_body, join_or_na, or_na, parse_body, SourceAdapter};
use crate::models::{ResultRow, SourceKind, SourceResult};

pub const CT_V2_API_URL: &str = "https://clinicaltrials.gov/api/v2/studies";
pub const CT_LEGACY_API_URL: &str = "https://clinicaltrials.gov/api/query/study_fields";

const CT_FIELDS: &str = "NCTId,BriefTitle,OverallStatus,LocationCountry";

// ── v2 ────────────────────────────────────────────────────────────────────────

pub struct ClinicalTrialsV2Client {
    client: Client,
    base_url: String,
    max_rows: usize,
}

impl ClinicalTrialsV2Client {
    pub fn new(client: Client, max_rows: usize) -> Self {
        Self { client, base_url: CT_V2_API_URL.to_string(), max_rows }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct StudiesResponse {
    studies: Option<Vec<Study>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Study {
    #[serde(default)]
    protocol_section: ProtocolSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProtocolSection {
    #[serde(default)]
    identification_module: IdentificationModule,
    #[serde(default)]
    status_module: StatusModule,
    #[serde(default)]
    contacts_locations_module: ContactsLocationsModule,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentificationModule {
    nct_id: Option<String>,
    brief_title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusModule {
    overall_status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ContactsLocationsModule {
    #[serde(default)]
    locations: Vec<Location>,
}

#[derive(Debug, Default, Deserialize)]
struct Location {
    country: Option<String>,
}

/// Normalise a v2 `studies` response.
pub fn parse_studies_v2(body: &str, max_rows: usize) -> SourceResult {
    let response: StudiesResponse = match parse_body("ctgov_v2", body) {
        Ok(r) => r,
        Err(failed) => return failed,
    };
    let Some(studies) = response.studies else {
        return SourceResult::Empty;
    };

    let rows = studies
        .into_iter()
        .take(max_rows)
        .map(|study| {
            let proto = study.protocol_section;
            let countries = proto
                .contacts_locations_module
                .locations
                .into_iter()
                .filter_map(|l| l.country);
            ResultRow::new(
                SourceKind::ClinicalTrial,
                vec![
                    or_na(proto.identification_module.nct_id),
                    or_na(proto.identification_module.brief_title),
                    or_na(proto.status_module.overall_status),
                    join_or_na(countries),
                ],
            )
        })
        .collect();

    SourceResult::from_rows(rows)
}

#[async_trait]
impl SourceAdapter for ClinicalTrialsV2Client {
    fn kind(&self) -> SourceKind {
        SourceKind::ClinicalTrial
    }

    fn api(&self) -> &'static str {
        "ctgov_v2"
    }

    #[instrument(skip(self), fields(api = "ctgov_v2"))]
    async fn fetch(&self, gene: &GeneSymbol) -> SourceResult {
        let page_size = self.max_rows.to_string();
        let request = self.client.get(&self.base_url).map(|r| {
            r.query(&[
                ("query.term", gene.as_str()),
                ("pageSize",   page_size.as_str()),
                ("format",     "json"),
                ("fields",     CT_FIELDS),
            ])
        });

        match fetch_body(self.api(), request).await {
            Ok(body) => {
                let result = parse_studies_v2(&body, self.max_rows);
                debug!(rows = result.rows().len(), "ClinicalTrials.gov studies retrieved");
                result
            }
            Err(failed) => failed,
        }
    }
}

// ── legacy study_fields ───────────────────────────────────────────────────────

pub struct ClinicalTrialsLegacyClient {
    client: Client,
    base_url: String,
    max_rows: usize,
}

impl ClinicalTrialsLegacyClient {
    pub fn new(client: Client, max_rows: usize) -> Self {
        Self { client, base_url: CT_LEGACY_API_URL.to_string(), max_rows }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct LegacyEnvelope {
    #[serde(rename = "StudyFieldsResponse")]
    study_fields_response: Option<LegacyResponse>,
}

#[derive(Debug, Deserialize)]
struct LegacyResponse {
    #[serde(rename = "StudyFields")]
    study_fields: Option<Vec<LegacyStudy>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct LegacyStudy {
    #[serde(rename = "NCTId", default)]
    nct_id: Vec<String>,
    #[serde(default)]
    brief_title: Vec<String>,
    #[serde(default)]
    overall_status: Vec<String>,
    #[serde(default)]
    location_country: Vec<String>,
}

/// Normalise a legacy `study_fields` response.
pub fn parse_study_fields(body: &str, max_rows: usize) -> SourceResult {
    let envelope: LegacyEnvelope = match parse_body("ctgov_legacy", body) {
        Ok(e) => e,
        Err(failed) => return failed,
    };
    let Some(studies) = envelope
        .study_fields_response
        .and_then(|r| r.study_fields)
    else {
        return SourceResult::Empty;
    };

    let rows = studies
        .into_iter()
        .take(max_rows)
        .map(|s| {
            ResultRow::new(
                SourceKind::ClinicalTrial,
                vec![
                    or_na(s.nct_id.into_iter().next()),
                    or_na(s.brief_title.into_iter().next()),
                    or_na(s.overall_status.into_iter().next()),
                    join_or_na(s.location_country),
                ],
            )
        })
        .collect();

    SourceResult::from_rows(rows)
}

#[async_trait]
impl SourceAdapter for ClinicalTrialsLegacyClient {
    fn kind(&self) -> SourceKind {
        SourceKind::ClinicalTrial
    }

    fn api(&self) -> &'static str {
        "ctgov_legacy"
    }

    #[instrument(skip(self), fields(api = "ctgov_legacy"))]
    async fn fetch(&self, gene: &GeneSymbol) -> SourceResult {
        let max_rnk = self.max_rows.to_string();
        let request = self.client.get(&self.base_url).map(|r| {
            r.query(&[
                ("expr",    gene.as_str()),
                ("fields",  CT_FIELDS),
                ("min_rnk", "1"),
                ("max_rnk", max_rnk.as_str()),
                ("fmt",     "json"),
            ])
        });

        match fetch_body(self.api(), request).await {
            Ok(body) => parse_study_fields(&body, self.max_rows),
            Err(failed) => failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_v2_studies() {
        let body = json!({
            "studies": [
                {
                    "protocolSection": {
                        "identificationModule": { "nctId": "NCT01", "briefTitle": "TP53 study" },
                        "statusModule": { "overallStatus": "RECRUITING" },
                        "contactsLocationsModule": {
                            "locations": [
                                { "country": "France" },
                                { "country": "Spain" },
                                { "country": "France" }
                            ]
                        }
                    }
                },
                { "protocolSection": { "identificationModule": { "nctId": "NCT02" } } }
            ]
        })
        .to_string();

        let result = parse_studies_v2(&body, 5);
        let rows = result.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("TrialId"), Some("NCT01"));
        assert_eq!(rows[0].get("Country"), Some("France, Spain"));
        assert_eq!(rows[1].get("Title"), Some("N/A"));
        assert_eq!(rows[1].get("Status"), Some("N/A"));
        assert_eq!(rows[1].get("Country"), Some("N/A"));
    }

    #[test]
    fn test_parse_v2_missing_studies_is_empty() {
        assert_eq!(parse_studies_v2("{}", 5), SourceResult::Empty);
        assert_eq!(parse_studies_v2(r#"{"studies": []}"#, 5), SourceResult::Empty);
    }

    #[test]
    fn test_parse_v2_wrong_shape_is_failed() {
        let result = parse_studies_v2(r#"{"studies": "nope"}"#, 5);
        assert!(matches!(result, SourceResult::Failed { .. }));
    }

    #[test]
    fn test_parse_v2_truncates() {
        let studies: Vec<_> = (0..8)
            .map(|i| json!({ "protocolSection": { "identificationModule": { "nctId": format!("NCT{i}") } } }))
            .collect();
        let body = json!({ "studies": studies }).to_string();
        let result = parse_studies_v2(&body, 5);
        let ids: Vec<_> = result.rows().iter().map(|r| r.get("TrialId").unwrap()).collect();
        assert_eq!(ids, vec!["NCT0", "NCT1", "NCT2", "NCT3", "NCT4"]);
    }

    #[test]
    fn test_parse_legacy_study_fields() {
        let body = json!({
            "StudyFieldsResponse": {
                "StudyFields": [
                    {
                        "NCTId": ["NCT00000001"],
                        "BriefTitle": ["BRCA1 carriers"],
                        "OverallStatus": ["Completed"],
                        "LocationCountry": ["United States", "Canada"]
                    },
                    { "NCTId": ["NCT00000002"], "BriefTitle": [] }
                ]
            }
        })
        .to_string();

        let result = parse_study_fields(&body, 5);
        let rows = result.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("Country"), Some("United States, Canada"));
        assert_eq!(rows[1].get("Title"), Some("N/A"));
    }

    #[test]
    fn test_parse_legacy_missing_envelope_is_empty() {
        assert_eq!(parse_study_fields(r#"{"other": 1}"#, 5), SourceResult::Empty);
        assert_eq!(parse_study_fields(r#"{"StudyFieldsResponse": {}}"#, 5), SourceResult::Empty);
    }
}
