use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::error::ClinomicsError;

/// Default per-request timeout for upstream calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("clinomics/", env!("CARGO_PKG_VERSION"));

/// An HTTP client that only allows requests to approved domains.
///
/// Every upstream call made by a source adapter goes through this client, so
/// the timeout configured here bounds every network call in the system.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Creates a client with the default allowlist of biomedical data providers.
    pub fn new(timeout: Duration) -> Result<Self, ClinomicsError> {
        let mut allowlist = HashSet::new();
        let domains = vec![
            "gtexportal.org",            // GTEx expression
            "clinicaltables.nlm.nih.gov", // ClinVar variants (NLM Clinical Tables)
            "myvariant.info",            // MyVariant.info
            "dgidb.org",                 // DGIdb (REST + GraphQL)
            "clinicaltrials.gov",        // ClinicalTrials.gov
            "localhost",
            "127.0.0.1",
        ];

        for d in domains {
            allowlist.insert(d.to_string());
        }

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ClinomicsError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Allows the host of a configured base URL.
    pub fn allow_url(&mut self, url: &str) -> Result<(), ClinomicsError> {
        let parsed = Url::parse(url)
            .map_err(|e| ClinomicsError::Config(format!("Invalid base URL {}: {}", url, e)))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| ClinomicsError::Config(format!("Base URL {} has no host", url)))?;
        debug!(%host, "Allowlisted configured host");
        self.allow_domain(host);
        Ok(())
    }

    /// Validates if a URL is permitted under the current sandbox policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        if let Ok(parsed) = Url::parse(url) {
            if let Some(host) = parsed.host_str() {
                // Exact match or a subdomain of an allowed domain
                for allowed in &self.allowlist {
                    if host == allowed || host.ends_with(&format!(".{}", allowed)) {
                        return true;
                    }
                }
            }
        }
        false
    }

    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, ClinomicsError> {
        self.check(url)?;
        Ok(self.client.get(url))
    }

    pub fn post(&self, url: &str) -> Result<reqwest::RequestBuilder, ClinomicsError> {
        self.check(url)?;
        Ok(self.client.post(url))
    }

    fn check(&self, url: &str) -> Result<(), ClinomicsError> {
        if !self.is_allowed(url) {
            warn!(%url, "Blocked request to a host outside the allowlist");
            return Err(ClinomicsError::SecurityError(format!(
                "Network capabilities capped: domain not in allowlist for URL {}",
                url
            )));
        }
        Ok(())
    }
}

/// Sends a request and returns the body text of a 2xx response.
///
/// Non-success statuses become [`ClinomicsError::UpstreamStatus`].
pub async fn fetch_text(request: reqwest::RequestBuilder) -> Result<String, ClinomicsError> {
    let resp = request.send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(ClinomicsError::UpstreamStatus {
            status: status.as_u16(),
            url: resp.url().to_string(),
        });
    }
    Ok(resp.text().await?)
}
