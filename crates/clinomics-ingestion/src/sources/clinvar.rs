//! ClinVar variants via the NLM Clinical Tables search API.
//!
//! Endpoint: https://clinicaltables.nlm.nih.gov/api/variants/v4/search
//!
//! The response is a positional array:
//!   `[total, [codes], extra_data, [[display fields], ...]]`
//! and only the fourth element carries rows. Each display row is read
//! positionally as (VariantID, Description).

use async_trait::async_trait;
use clinomics_common::{GeneSymbol, SandboxClient as Client};
use serde_json::Value;
use tracing::instrument;

use super::{fetch_body, or_na, parse_body, SourceAdapter};
use crate::models::{ResultRow, SourceKind, SourceResult};

pub const CLINVAR_API_URL: &str = "https://clinicaltables.nlm.nih.gov/api/variants/v4/search";

/// Position of the display rows in the response array.
const DISPLAY_ROWS_INDEX: usize = 3;

pub struct ClinVarClient {
    client: Client,
    base_url: String,
    max_rows: usize,
}

impl ClinVarClient {
    pub fn new(client: Client, max_rows: usize) -> Self {
        Self { client, base_url: CLINVAR_API_URL.to_string(), max_rows }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

/// Normalise a Clinical Tables search response.
pub fn parse_variants(body: &str, max_rows: usize) -> SourceResult {
    let response: Vec<Value> = match parse_body("clinvar", body) {
        Ok(r) => r,
        Err(failed) => return failed,
    };

    let display_rows = match response.into_iter().nth(DISPLAY_ROWS_INDEX) {
        None | Some(Value::Null) => return SourceResult::Empty,
        Some(Value::Array(rows)) => rows,
        Some(other) => {
            return SourceResult::failed(format!(
                "clinvar returned an unexpected response: display rows are {}",
                json_type(&other)
            ))
        }
    };

    let rows = display_rows
        .into_iter()
        .take(max_rows)
        .map(|row| {
            let mut cells = match row {
                Value::Array(cells) => cells.into_iter().map(cell_text),
                other => vec![other].into_iter().map(cell_text),
            };
            ResultRow::new(
                SourceKind::Mutation,
                vec![or_na(cells.next().flatten()), or_na(cells.next().flatten())],
            )
        })
        .collect();

    SourceResult::from_rows(rows)
}

fn cell_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl SourceAdapter for ClinVarClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Mutation
    }

    fn api(&self) -> &'static str {
        "clinvar"
    }

    #[instrument(skip(self), fields(api = "clinvar"))]
    async fn fetch(&self, gene: &GeneSymbol) -> SourceResult {
        let max_list = self.max_rows.to_string();
        let request = self.client.get(&self.base_url).map(|r| {
            r.query(&[
                ("terms",   gene.as_str()),
                ("maxList", max_list.as_str()),
            ])
        });

        match fetch_body(self.api(), request).await {
            Ok(body) => parse_variants(&body, self.max_rows),
            Err(failed) => failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_positional_rows() {
        let body = json!([
            2,
            ["12345", "67890"],
            null,
            [
                ["12345", "NM_000546.6(TP53):c.743G>A (p.Arg248Gln)"],
                ["67890", null]
            ]
        ])
        .to_string();

        let result = parse_variants(&body, 10);
        let rows = result.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("VariantID"), Some("12345"));
        assert!(rows[0].get("Description").unwrap().contains("p.Arg248Gln"));
        assert_eq!(rows[1].get("Description"), Some("N/A"));
    }

    #[test]
    fn test_short_array_is_empty() {
        assert_eq!(parse_variants("[0, []]", 10), SourceResult::Empty);
        assert_eq!(parse_variants("[0, [], null, null]", 10), SourceResult::Empty);
        assert_eq!(parse_variants("[0, [], null, []]", 10), SourceResult::Empty);
    }

    #[test]
    fn test_non_array_is_failed() {
        assert!(matches!(parse_variants(r#"{"error": "bad"}"#, 10), SourceResult::Failed { .. }));
        assert!(matches!(parse_variants("[0, [], null, \"x\"]", 10), SourceResult::Failed { .. }));
    }

    #[test]
    fn test_truncates_in_upstream_order() {
        let rows: Vec<_> = (0..12).map(|i| json!([i.to_string(), "desc"])).collect();
        let body = json!([12, [], null, rows]).to_string();
        let result = parse_variants(&body, 10);
        let ids: Vec<_> = result.rows().iter().map(|r| r.get("VariantID").unwrap().to_string()).collect();
        assert_eq!(ids, (0..10).map(|i| i.to_string()).collect::<Vec<_>>());
    }
}
