// # Docker Hub Registry Client
//
// This crate provides the Docker Hub implementation of ImageRegistry.
//
// The client is stateless and read-only: one HTTP request per trait call,
// no caching and no retry logic (scheduling is owned by the watcher), and
// no registry writes.
//
// ## API Reference
//
// - Login: POST `/v2/users/login` with `{username, password}` → `{token}`
// - Repository: GET `/v2/repositories/{ns}/{name}` → `{last_updated, ...}`
// - Tags: GET `/v2/repositories/{ns}/{name}/tags?page_size=N&page=K`
//   → `{count, results: [{name, last_updated}], next, previous}`
//
// Requests carry `Authorization: Bearer {token}` when a token is held.
//
// ## Security
//
// Credentials never appear in logs; they pass through `authenticate` and
// are not retained by the client.

use async_trait::async_trait;
use regwatch_core::traits::{ImageRegistry, RepositoryInfo, TAG_PAGE_SIZE, TagInfo, TagPage};
use regwatch_core::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

/// Docker Hub API base URL
const HUB_API_BASE: &str = "https://hub.docker.com";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Docker Hub registry client
#[derive(Debug, Clone)]
pub struct DockerHubClient {
    base_url: String,
    client: reqwest::Client,
}

impl DockerHubClient {
    /// Create a client against the public Docker Hub API
    pub fn new() -> Self {
        Self::with_base_url(HUB_API_BASE)
    }

    /// Create a client against a different API root (mirrors, tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    fn bearer(
        request: reqwest::RequestBuilder,
        token: Option<&str>,
    ) -> reqwest::RequestBuilder {
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Map a non-success response to the error taxonomy: auth failures
    /// and missing repositories are distinct from transport failures.
    async fn check_status(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "unable to read error response".to_string());

        Err(match status.as_u16() {
            401 | 403 => Error::auth(format!("{}: {}", what, status)),
            404 => Error::not_found(what.to_string()),
            500..=599 => Error::registry(format!("{}: server error {}: {}", what, status, body)),
            _ => Error::registry(format!("{}: {}: {}", what, status, body)),
        })
    }
}

impl Default for DockerHubClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Login response payload
#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

/// Repository response payload (extra fields ignored)
#[derive(Debug, Deserialize)]
struct RepositoryResponse {
    // The Hub reports null for repositories that never pushed
    #[serde(default)]
    last_updated: Option<String>,
}

/// One page of the tag listing
#[derive(Debug, Deserialize)]
struct TagPageResponse {
    count: usize,
    results: Vec<TagResult>,
}

#[derive(Debug, Deserialize)]
struct TagResult {
    name: String,
    #[serde(default)]
    last_updated: Option<String>,
}

/// The login endpoint matches usernames case-sensitively even though the
/// registry itself does not; lower-case before submission.
fn login_payload(username: &str, password: &str) -> serde_json::Value {
    serde_json::json!({
        "username": username.to_lowercase(),
        "password": password,
    })
}

#[async_trait]
impl ImageRegistry for DockerHubClient {
    async fn authenticate(&self, username: &str, password: &str) -> Result<String> {
        let url = format!("{}/v2/users/login", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&login_payload(username, password))
            .send()
            .await
            .map_err(|e| Error::registry(format!("login request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::auth(format!("login rejected: {}", response.status())));
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| Error::registry(format!("failed to parse login response: {}", e)))?;

        tracing::debug!("authenticated against {}", self.base_url);
        Ok(login.token)
    }

    async fn fetch_repository(
        &self,
        namespace: &str,
        name: &str,
        token: Option<&str>,
    ) -> Result<RepositoryInfo> {
        let url = format!("{}/v2/repositories/{}/{}", self.base_url, namespace, name);

        let response = Self::bearer(self.client.get(&url), token)
            .send()
            .await
            .map_err(|e| Error::registry(format!("repository request failed: {}", e)))?;

        let what = format!("repository {}/{}", namespace, name);
        let response = Self::check_status(response, &what).await?;

        let repository: RepositoryResponse = response
            .json()
            .await
            .map_err(|e| Error::registry(format!("failed to parse {}: {}", what, e)))?;

        // A missing instant flows through as unparsable and compares as
        // "not updated" downstream.
        Ok(RepositoryInfo {
            last_updated: repository.last_updated.unwrap_or_default(),
        })
    }

    async fn fetch_tag_page(
        &self,
        namespace: &str,
        name: &str,
        page: usize,
        token: Option<&str>,
    ) -> Result<TagPage> {
        let url = format!(
            "{}/v2/repositories/{}/{}/tags?page_size={}&page={}",
            self.base_url, namespace, name, TAG_PAGE_SIZE, page
        );

        let response = Self::bearer(self.client.get(&url), token)
            .send()
            .await
            .map_err(|e| Error::registry(format!("tag page request failed: {}", e)))?;

        let what = format!("tags page {} of {}/{}", page, namespace, name);
        let response = Self::check_status(response, &what).await?;

        let parsed: TagPageResponse = response
            .json()
            .await
            .map_err(|e| Error::registry(format!("failed to parse {}: {}", what, e)))?;

        Ok(TagPage {
            count: parsed.count,
            results: parsed
                .results
                .into_iter()
                .map(|tag| TagInfo {
                    name: tag.name,
                    last_updated: tag.last_updated.unwrap_or_default(),
                })
                .collect(),
        })
    }
}
