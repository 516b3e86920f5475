//! GCP Authentication
//!
//! Handles authentication using Application Default Credentials (ADC),
//! service account keys, or gcloud CLI credentials, and resolves the
//! ambient default project from the gcloud configuration.

use crate::error::{Result, SqlError};
use gcp_auth::TokenProvider;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default scopes for GCP API access
pub const DEFAULT_SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform"];

/// Environment variable holding a pre-minted access token
pub const ACCESS_TOKEN_ENV: &str = "GCSQL_ACCESS_TOKEN";

/// Refresh tokens this long before the assumed expiry
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// gcp_auth does not surface expiry reliably, so tokens are assumed to live 30 minutes
const ASSUMED_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Clone)]
enum TokenSource {
    Provider(Arc<dyn TokenProvider>),
    Static(String),
}

/// Bearer token source for Cloud SQL Admin calls
#[derive(Clone)]
pub struct GcpCredentials {
    source: TokenSource,
    cache: Arc<RwLock<Option<(String, Instant)>>>,
}

impl GcpCredentials {
    /// Credentials from `GCSQL_ACCESS_TOKEN` if set, otherwise from
    /// Application Default Credentials
    pub async fn new() -> Result<Self> {
        if let Some(token) = std::env::var(ACCESS_TOKEN_ENV)
            .ok()
            .filter(|t| !t.trim().is_empty())
        {
            tracing::debug!("Using access token from {}", ACCESS_TOKEN_ENV);
            return Ok(Self::from_token(token.trim()));
        }

        let provider = gcp_auth::provider().await.map_err(|e| {
            SqlError::Auth(format!(
                "{}. Run 'gcloud auth application-default login' or set {}",
                e, ACCESS_TOKEN_ENV
            ))
        })?;

        Ok(Self {
            source: TokenSource::Provider(provider),
            cache: Arc::default(),
        })
    }

    /// Credentials that always present the given bearer token
    pub fn from_token(token: &str) -> Self {
        Self {
            source: TokenSource::Static(token.to_string()),
            cache: Arc::default(),
        }
    }

    /// Access token for the next request
    pub async fn get_token(&self) -> Result<String> {
        let provider = match &self.source {
            TokenSource::Static(token) => return Ok(token.clone()),
            TokenSource::Provider(provider) => provider,
        };

        if let Some((token, refresh_at)) = self.cache.read().await.as_ref() {
            if Instant::now() < *refresh_at {
                return Ok(token.clone());
            }
            tracing::debug!("Cached token expired, fetching new token");
        }

        let token = provider
            .token(DEFAULT_SCOPES)
            .await
            .map_err(|e| SqlError::Auth(format!("Failed to get access token: {}", e)))?
            .as_str()
            .to_string();

        let refresh_at = Instant::now() + ASSUMED_TOKEN_TTL - TOKEN_EXPIRY_BUFFER;
        *self.cache.write().await = Some((token.clone(), refresh_at));
        tracing::debug!("New token cached");

        Ok(token)
    }
}

/// Get the gcloud configuration directory
pub fn get_gcloud_config_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CLOUDSDK_CONFIG") {
        return Some(PathBuf::from(path));
    }

    dirs::config_dir().map(|p| p.join("gcloud"))
}

/// Validate a GCP project ID format
/// Project IDs must be 6-30 characters, lowercase letters, digits, and hyphens
/// Must start with a letter and cannot end with a hyphen
pub fn validate_project_id(project: &str) -> bool {
    if project.len() < 6 || project.len() > 30 {
        return false;
    }

    match project.chars().next() {
        Some(c) if c.is_ascii_lowercase() => {},
        _ => return false,
    }

    if project.ends_with('-') {
        return false;
    }

    project.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Value of `project = ...` inside `section` of an INI-style gcloud file.
/// `None` for `section` matches keys outside any section header.
fn read_project_property(content: &str, section: Option<&str>) -> Option<String> {
    let mut current: Option<&str> = None;
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') && line.ends_with(']') {
            current = Some(&line[1..line.len() - 1]);
            continue;
        }
        if section.is_some() && current != section {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if key.trim() == "project" {
            let project = value.trim().to_string();
            if validate_project_id(&project) {
                return Some(project);
            }
            tracing::warn!("Ignoring invalid project ID in gcloud configuration");
        }
    }
    None
}

/// Read the default project from the environment or gcloud configuration
pub fn get_default_project() -> Option<String> {
    for var in ["CLOUDSDK_CORE_PROJECT", "GOOGLE_CLOUD_PROJECT", "GCLOUD_PROJECT"] {
        if let Ok(project) = std::env::var(var) {
            if validate_project_id(&project) {
                return Some(project);
            }
            tracing::warn!("Invalid project ID format in {}", var);
        }
    }

    let config_dir = get_gcloud_config_dir()?;

    if let Ok(content) = std::fs::read_to_string(config_dir.join("properties")) {
        if let Some(project) = read_project_property(&content, Some("core"))
            .or_else(|| read_project_property(&content, None))
        {
            return Some(project);
        }
    }

    let active_config = std::fs::read_to_string(config_dir.join("active_config")).ok()?;
    let config_name = active_config.trim();

    // Security: Validate config name to prevent path traversal
    if !config_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        tracing::warn!("Invalid characters in active_config name");
        return None;
    }

    let config_path = config_dir
        .join("configurations")
        .join(format!("config_{}", config_name));
    let content = std::fs::read_to_string(config_path).ok()?;
    read_project_property(&content, Some("core"))
}
