//! HTML pages: search form, single-gene and batch results.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use clinomics_accounts::Account;
use clinomics_common::GeneSymbol;
use clinomics_ingestion::BatchReport;
use serde::Deserialize;

use crate::error::ApiError;
use crate::handlers::{read_gene_upload, submit};
use crate::state::{AppState, Caller, SharedState};

#[derive(Deserialize)]
pub struct AnalyzeForm {
    #[serde(default)]
    pub gene: String,
}

pub(crate) fn html(status: StatusCode, page: Result<String, ApiError>) -> Response {
    match page {
        Ok(body) => (status, Html(body)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Re-render the search form with the error message.
fn error_page(state: &AppState, account: Option<&Account>, err: ApiError) -> Response {
    html(err.status_code(), state.templates.index(account, Some(&err.user_message())))
}

pub async fn index(State(state): State<SharedState>, caller: Result<Caller, ApiError>) -> Response {
    let Ok(caller) = caller else {
        return Redirect::to("/account").into_response();
    };
    let account = caller.account(&state).await;
    html(StatusCode::OK, state.templates.index(account.as_ref(), None))
}

pub async fn analyze_page(
    State(state): State<SharedState>,
    caller: Result<Caller, ApiError>,
    Form(form): Form<AnalyzeForm>,
) -> Response {
    let Ok(caller) = caller else {
        return Redirect::to("/account").into_response();
    };

    let outcome = match GeneSymbol::parse(&form.gene) {
        Ok(gene) => submit(&state, &caller, vec![gene]).await,
        Err(e) => Err(e.into()),
    };
    let account = caller.account(&state).await;
    match outcome {
        Ok(batch) => html(StatusCode::OK, state.templates.results(&batch, account.as_ref())),
        Err(e) => error_page(&state, account.as_ref(), e),
    }
}

async fn run_upload(state: &AppState, caller: &Caller, multipart: Multipart) -> Result<BatchReport, ApiError> {
    let tokens = read_gene_upload(multipart).await?;
    let genes = state.prepare(tokens)?;
    submit(state, caller, genes).await
}

pub async fn batch_page(
    State(state): State<SharedState>,
    caller: Result<Caller, ApiError>,
    multipart: Multipart,
) -> Response {
    let Ok(caller) = caller else {
        return Redirect::to("/account").into_response();
    };

    let outcome = run_upload(&state, &caller, multipart).await;
    let account = caller.account(&state).await;
    match outcome {
        Ok(batch) => html(StatusCode::OK, state.templates.results(&batch, account.as_ref())),
        Err(e) => error_page(&state, account.as_ref(), e),
    }
}
