use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use clinomics_ingestion::gene_list::parse_gene_text;
use serde::Deserialize;

use crate::error::ApiError;
use crate::handlers::submit;
use crate::report::{render_pdf, report_filename};
use crate::state::{Caller, SharedState};

#[derive(Deserialize)]
pub struct ReportQuery {
    /// One gene, or several separated by commas.
    #[serde(default)]
    pub gene: String,
}

/// GET /report?gene=TP53
pub async fn report_pdf(
    State(state): State<SharedState>,
    caller: Caller,
    Query(query): Query<ReportQuery>,
) -> Result<Response, ApiError> {
    let genes = state.prepare(parse_gene_text(&query.gene))?;
    let batch = submit(&state, &caller, genes).await?;

    let pdf = render_pdf(&batch).map_err(|e| ApiError::internal(format!("pdf: {}", e)))?;
    let disposition = format!("attachment; filename=\"{}\"", report_filename(&batch));

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    )
        .into_response())
}
