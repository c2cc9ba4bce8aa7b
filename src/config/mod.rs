/// Configuration management for okectl
pub mod store;

use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

use crate::error::{OkeError, OkeResult};

pub use store::{ConfigDir, NodePoolStore};

/// Container Engine API access settings
///
/// Values come from CLI flags and environment variables first, then from an
/// optional YAML profile, then from defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiConfig {
    /// OCI region (e.g., "us-ashburn-1"), used to derive the endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Full endpoint override (e.g., a local signing proxy)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Bearer token sent with every request (can also be set via OCI_AUTH_TOKEN env var)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,

    /// Per-request HTTP timeout in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

impl ApiConfig {
    /// Load a profile from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> OkeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ApiConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Layer `overrides` on top of this config; set fields in `overrides` win
    pub fn merge(self, overrides: ApiConfig) -> Self {
        Self {
            region: overrides.region.or(self.region),
            endpoint: overrides.endpoint.or(self.endpoint),
            auth_token: overrides.auth_token.or(self.auth_token),
            request_timeout_secs: overrides.request_timeout_secs.or(self.request_timeout_secs),
        }
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        let secs = self.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        std::time::Duration::from_secs(secs)
    }

    /// Resolve the API base URL from the endpoint override or the region
    pub fn endpoint_url(&self) -> OkeResult<Url> {
        let raw = match (&self.endpoint, &self.region) {
            (Some(endpoint), _) => endpoint.clone(),
            (None, Some(region)) => format!("https://containerengine.{}.oraclecloud.com", region),
            (None, None) => {
                return Err(OkeError::InvalidConfig(
                    "No API endpoint configured. Set --region/OCI_REGION or --endpoint/OKE_ENDPOINT"
                        .to_string(),
                ))
            }
        };

        let url = Url::parse(&raw)
            .map_err(|e| OkeError::InvalidConfig(format!("Invalid endpoint {}: {}", raw, e)))?;
        if url.cannot_be_a_base() {
            return Err(OkeError::InvalidConfig(format!(
                "Endpoint cannot be used as a base URL: {}",
                raw
            )));
        }
        Ok(url)
    }
}
