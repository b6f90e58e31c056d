//! clinomics-web: web front end for ClinOmics
//! Provides:
//!   - Single-gene and batch search pages
//!   - JSON API over the aggregation pipeline
//!   - PDF report downloads
//!   - Accounts with plans and a daily search quota
//!   - SSE stream of batch progress

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod handlers;
pub mod render;
pub mod report;
pub mod router;
pub mod state;
pub mod sse;
