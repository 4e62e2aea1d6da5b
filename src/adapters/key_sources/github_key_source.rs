use std::time::Duration;

use serde::Deserialize;

use crate::core::errors::ProvisionError;
use crate::core::models::key_record::is_valid_identity;
use crate::core::traits::key_source::KeySource;

/// One entry of `GET /users/{login}/keys`. Other fields are ignored.
#[derive(Debug, Deserialize)]
struct GitHubKey {
    key: String,
}

/// Public keys published on GitHub (`/users/{login}/keys`).
pub struct GitHubKeySource {
    endpoint: String,
    timeout: Duration,
}

impl GitHubKeySource {
    /// Source rooted at `endpoint` (the API base, e.g. `https://api.github.com`).
    pub fn new(endpoint: &str, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    fn keys_url(&self, identity: &str) -> String {
        format!("{}/users/{identity}/keys", self.endpoint)
    }
}

/// Build a reqwest client with the given timeout.
fn build_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .user_agent(format!("hostward/{}", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Extract key material from the JSON body, ignoring every other field.
fn parse_keys(body: &str) -> Result<Vec<String>, serde_json::Error> {
    let keys: Vec<GitHubKey> = serde_json::from_str(body)?;
    Ok(keys.into_iter().map(|k| k.key).collect())
}

impl KeySource for GitHubKeySource {
    fn fetch(&self, identity: &str) -> Result<Vec<String>, ProvisionError> {
        if !is_valid_identity(identity) {
            return Err(ProvisionError::InvalidIdentity {
                identity: identity.to_string(),
            });
        }

        let failed = |reason: String| ProvisionError::FetchFailed {
            identity: identity.to_string(),
            reason,
        };

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| failed(format!("Failed to create async runtime: {e}")))?;

        let url = self.keys_url(identity);
        log::debug!("GET {url} (timeout {:?})", self.timeout);

        rt.block_on(async {
            let client = build_client(self.timeout)
                .map_err(|e| failed(format!("Failed to create HTTP client: {e}")))?;
            let resp = client
                .get(&url)
                .header("Accept", "application/vnd.github+json")
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        failed(format!("no response within {}s", self.timeout.as_secs()))
                    } else {
                        failed(format!("request to {url} failed: {e}"))
                    }
                })?;

            if !resp.status().is_success() {
                return Err(failed(format!("{url} returned status {}", resp.status())));
            }

            let body = resp
                .text()
                .await
                .map_err(|e| failed(format!("Failed to read response: {e}")))?;

            parse_keys(&body).map_err(|e| failed(format!("Failed to parse response: {e}")))
        })
    }

    fn name(&self) -> &str {
        "github"
    }
}
