//! HTTP handlers for all web routes.

pub mod account;
pub mod api;
pub mod download;
pub mod pages;

use axum::extract::{FromRequest, Multipart};
use clinomics_common::GeneSymbol;
use clinomics_ingestion::gene_list::{parse_gene_file, parse_gene_text};
use clinomics_ingestion::BatchReport;

use crate::error::ApiError;
use crate::state::{AppState, Caller};

/// JSON request body whose rejections use the API error shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Charge the caller once, then analyze already validated genes.
pub(crate) async fn submit(
    state: &AppState,
    caller: &Caller,
    genes: Vec<GeneSymbol>,
) -> Result<BatchReport, ApiError> {
    state.charge(caller).await?;
    state.run(genes).await
}

/// Gene tokens from a multipart form: a `genes` text field and/or any file
/// field. An empty file input (nothing chosen) is ignored.
pub(crate) async fn read_gene_upload(mut multipart: Multipart) -> Result<Vec<String>, ApiError> {
    let upload_error = |e: axum::extract::multipart::MultipartError| {
        ApiError::bad_request(format!("Could not read upload: {}", e))
    };

    let mut tokens = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        let is_text = field.name() == Some("genes");
        let filename = field.file_name().map(str::to_string);

        if is_text {
            let text = field.text().await.map_err(upload_error)?;
            tokens.extend(parse_gene_text(&text));
        } else if let Some(filename) = filename {
            let bytes = field.bytes().await.map_err(upload_error)?;
            if !bytes.is_empty() {
                tokens.extend(parse_gene_file(&filename, &bytes)?);
            }
        }
    }
    Ok(tokens)
}
