//! HTTP client for a running Cluster Claimer server.

use anyhow::{Context, Result};
use kc_api::dto::{ClusterResponse, CreateLeaseRequest, LeaseResponse, LeaseSummary};
use kc_api::error::ErrorResponse;
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// API client for the claimer server.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Creates a new API client.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// Leases a cluster for `duration_secs`.
    pub async fn create_lease(&self, duration_secs: u64) -> Result<LeaseResponse> {
        self.post(
            "/api/v1/leases",
            &CreateLeaseRequest {
                max_time_secs: duration_secs,
            },
        )
        .await
    }

    /// Releases a lease.
    pub async fn release_lease(&self, token: Uuid) -> Result<()> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/api/v1/leases/{}", token))
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(Self::api_error(status, response).await)
    }

    /// Lists active leases.
    pub async fn list_leases(&self) -> Result<Vec<LeaseSummary>> {
        self.get("/api/v1/leases").await
    }

    /// Lists the cluster pool.
    pub async fn list_clusters(&self) -> Result<Vec<ClusterResponse>> {
        self.get("/api/v1/clusters").await
    }

    // Helper methods

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .request(reqwest::Method::GET, path)
            .send()
            .await
            .context("Failed to send request")?;

        self.handle_response(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .request(reqwest::Method::POST, path)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        self.handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .context("Failed to parse response body")
        } else {
            Err(Self::api_error(status, response).await)
        }
    }

    async fn api_error(status: reqwest::StatusCode, response: reqwest::Response) -> anyhow::Error {
        let error: ErrorResponse = response.json().await.unwrap_or_else(|_| ErrorResponse {
            code: "UNKNOWN".to_string(),
            message: "Unknown error".to_string(),
            details: None,
            request_id: None,
        });

        anyhow::anyhow!("API error ({}): {} - {}", status, error.code, error.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new("http://localhost:8080/", None).unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_empty_token_is_ignored() {
        let client = ApiClient::new("http://localhost:8080", Some(String::new())).unwrap();
        assert!(client.token.is_none());
    }
}
