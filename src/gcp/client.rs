//! GCP Client
//!
//! Main client for interacting with the Cloud SQL Admin API, combining
//! authentication and HTTP functionality.

use super::auth::GcpCredentials;
use super::http::GcpHttpClient;
use crate::error::{Result, SqlError};
use serde_json::Value;

/// Default Cloud SQL Admin API endpoint
pub const DEFAULT_SQLADMIN_ENDPOINT: &str = "https://sqladmin.googleapis.com/sql/v1beta4";

/// Main GCP client
#[derive(Clone)]
pub struct GcpClient {
    pub credentials: GcpCredentials,
    pub http: GcpHttpClient,
    endpoint: String,
}

impl GcpClient {
    /// Create a new client against the given Cloud SQL Admin endpoint
    pub fn new(credentials: GcpCredentials, endpoint: &str) -> Result<Self> {
        let parsed = url::Url::parse(endpoint).map_err(|e| {
            SqlError::Configuration(format!("Invalid API endpoint '{}': {}", endpoint, e))
        })?;
        if !matches!(parsed.scheme(), "https" | "http") {
            return Err(SqlError::Configuration(format!(
                "Unsupported API endpoint scheme: {}",
                parsed.scheme()
            )));
        }

        Ok(Self {
            credentials,
            http: GcpHttpClient::new()?,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Get the current access token
    pub async fn get_token(&self) -> Result<String> {
        self.credentials.get_token().await
    }

    /// Make a GET request to a GCP API
    pub async fn get(&self, url: &str) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.get(url, &token).await
    }

    /// Make a POST request to a GCP API
    pub async fn post(&self, url: &str, body: Option<&Value>) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.post(url, &token, body).await
    }

    /// Make a DELETE request to a GCP API
    pub async fn delete(&self, url: &str) -> Result<Value> {
        let token = self.get_token().await?;
        self.http.delete(url, &token).await
    }

    // =========================================================================
    // Cloud SQL Admin API helpers
    // =========================================================================

    /// Build Cloud SQL Admin API URL for a project-scoped path
    pub fn sqladmin_url(&self, project: &str, path: &str) -> String {
        format!(
            "{}/projects/{}/{}",
            self.endpoint,
            urlencoding::encode(project),
            path
        )
    }

    /// Build an instance URL
    pub fn instance_url(&self, project: &str, name: &str) -> String {
        self.sqladmin_url(project, &format!("instances/{}", urlencoding::encode(name)))
    }

    /// Build an operation URL
    pub fn operation_url(&self, project: &str, operation: &str) -> String {
        self.sqladmin_url(
            project,
            &format!("operations/{}", urlencoding::encode(operation)),
        )
    }
}

/// Append query parameters, skipping empty values
pub fn add_query_params(url: &str, params: &[(&str, Option<String>)]) -> String {
    let query_parts: Vec<String> = params
        .iter()
        .filter_map(|(key, value)| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| format!("{}={}", key, urlencoding::encode(v)))
        })
        .collect();

    if query_parts.is_empty() {
        url.to_string()
    } else if url.contains('?') {
        format!("{}&{}", url, query_parts.join("&"))
    } else {
        format!("{}?{}", url, query_parts.join("&"))
    }
}
