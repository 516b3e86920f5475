//! HTTP utilities for GCP REST API calls

use crate::error::{Result, SqlError};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips non-printable characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// GCP JSON error envelope: `{"error": {"code": 404, "message": "...", "status": "NOT_FOUND"}}`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

/// Build a transport error from a non-success response
fn api_error(status: reqwest::StatusCode, body: &str) -> SqlError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);
    let (code, message, canonical) = match parsed {
        Some(err) => (
            err.code.unwrap_or(status.as_u16()),
            err.message,
            err.status,
        ),
        None => (status.as_u16(), None, None),
    };

    SqlError::Transport {
        code: Some(code),
        status: canonical,
        message: message.unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        }),
    }
}

/// HTTP client wrapper for GCP API calls
#[derive(Clone)]
pub struct GcpHttpClient {
    client: Client,
}

impl GcpHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("gcsql/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SqlError::transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Make a GET request to a GCP API
    pub async fn get(&self, url: &str, token: &str) -> Result<Value> {
        tracing::debug!("GET {}", url);
        self.execute(self.client.get(url).bearer_auth(token)).await
    }

    /// Make a POST request to a GCP API
    pub async fn post(&self, url: &str, token: &str, body: Option<&Value>) -> Result<Value> {
        tracing::debug!("POST {}", url);

        let mut request = self.client.post(url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        self.execute(request).await
    }

    /// Make a DELETE request to a GCP API
    pub async fn delete(&self, url: &str, token: &str) -> Result<Value> {
        tracing::debug!("DELETE {}", url);
        self.execute(self.client.delete(url).bearer_auth(token)).await
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Value> {
        let response = request.send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(api_error(status, &body));
        }

        if body.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body)
            .map_err(|e| SqlError::transport(format!("Failed to parse response JSON: {}", e)))
    }
}

/// Format an error for display on the terminal
pub fn format_gcp_error(error: &SqlError) -> String {
    let SqlError::Transport { code: Some(code), message, .. } = error else {
        return error.to_string();
    };

    let hint = match *code {
        401 => "Authentication failed. Run 'gcloud auth application-default login'.",
        403 => "Permission denied. Check your Cloud SQL IAM permissions.",
        404 => "Resource not found.",
        409 => "Resource conflict. The instance may already exist or be in use.",
        429 => "Rate limit exceeded. Please try again later.",
        500 | 503 => "Cloud SQL service temporarily unavailable. Please try again.",
        _ => return error.to_string(),
    };

    format!("{} ({}: {})", hint, code, sanitize_for_log(message))
}
