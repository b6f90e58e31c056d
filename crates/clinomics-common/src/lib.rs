//! clinomics-common: Shared types, errors and the outbound HTTP client used
//! across all ClinOmics crates.

pub mod error;
pub mod gene;
pub mod sandbox;

// Re-export commonly used types
pub use error::{ClinomicsError, Result};
pub use gene::GeneSymbol;
pub use sandbox::SandboxClient;
