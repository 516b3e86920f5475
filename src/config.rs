//! Configuration Management
//!
//! Handles persistent configuration storage for gcsql.

use crate::gcp::client::DEFAULT_SQLADMIN_ENDPOINT;
use crate::sql::PollPolicy;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// User configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default project ID
    #[serde(default)]
    pub project_id: Option<String>,
    /// Cloud SQL Admin API endpoint override
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Backoff between operation polls
    #[serde(default)]
    pub poll: PollPolicy,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("gcsql").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from a specific file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring invalid config file {:?}: {}", path, e);
                Self::default()
            }),
            Err(e) => {
                tracing::warn!("Failed to read config file {:?}: {}", path, e);
                Self::default()
            },
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }

    /// Get effective project (config > gcloud default)
    pub fn effective_project(&self) -> Option<String> {
        self.project_id
            .clone()
            .filter(|p| !p.is_empty())
            .or_else(crate::gcp::auth::get_default_project)
    }

    /// Get effective API endpoint
    pub fn effective_endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or(DEFAULT_SQLADMIN_ENDPOINT)
    }

    /// Set project and save
    pub fn set_project(&mut self, project_id: &str) -> Result<()> {
        if !crate::gcp::auth::validate_project_id(project_id) {
            anyhow::bail!("Invalid project ID: {}", project_id);
        }
        self.project_id = Some(project_id.to_string());
        self.save()
    }
}
