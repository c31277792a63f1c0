//! Outbound HTTP for collaborators outside the data-access facade
//!
//! In mock mode nothing leaves the machine: every fetch fails with
//! [`Error::Blocked`] naming the URL that was attempted.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::NetworkPolicy;
use crate::domain::result::{Error, Result};

const USER_AGENT: &str = concat!("roadside/", env!("CARGO_PKG_VERSION"));

/// Policy-aware HTTP client
#[derive(Debug, Clone)]
pub struct NetworkGuard {
    policy: NetworkPolicy,
    client: Client,
}

impl NetworkGuard {
    pub fn new(policy: NetworkPolicy) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { policy, client })
    }

    pub fn policy(&self) -> NetworkPolicy {
        self.policy
    }

    /// Fail if `url` may not be fetched under the current policy
    pub fn check(&self, url: &Url) -> Result<()> {
        match self.policy {
            NetworkPolicy::Blocked => Err(Error::Blocked(url.to_string())),
            NetworkPolicy::Open => Ok(()),
        }
    }

    /// GET `url` and decode a JSON body
    ///
    /// Non-success responses surface the server's text as a network error.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T> {
        self.check(url)?;

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                format!("HTTP {} from {}", status.as_u16(), url.host_str().unwrap_or(""))
            } else {
                body.trim().to_string()
            };
            return Err(Error::network(message));
        }

        Ok(response.json::<T>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_mode_blocks_and_names_url() {
        let guard = NetworkGuard::new(NetworkPolicy::Blocked).unwrap();
        let url = Url::parse("https://tiles.example.com/map?q=1").unwrap();

        let err = guard.get_json::<serde_json::Value>(&url).await.unwrap_err();
        assert!(matches!(err, Error::Blocked(_)));
        assert!(err.to_string().contains("https://tiles.example.com/map?q=1"));
    }

    #[test]
    fn test_open_policy_allows() {
        let guard = NetworkGuard::new(NetworkPolicy::Open).unwrap();
        let url = Url::parse("https://tiles.example.com/").unwrap();
        assert!(guard.check(&url).is_ok());
    }
}
