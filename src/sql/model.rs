//! Cloud SQL Admin API resources
//!
//! Only the fields the tool reasons about are typed. Everything else the API
//! returns is kept in `extra` so a snapshot printed by `get` can be fed back
//! into `remove --instance-object` or `add` unchanged.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// (project, name) pair addressing one instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceRef {
    pub project: String,
    pub name: String,
}

impl InstanceRef {
    pub fn new(project: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for InstanceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.name)
    }
}

/// A Cloud SQL instance as returned by the API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseInstance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_addresses: Vec<IpMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DatabaseInstance {
    /// Identity of this snapshot, if it carries both project and name
    pub fn identity(&self) -> Option<InstanceRef> {
        let project = self.project.as_deref().filter(|p| !p.is_empty())?;
        let name = self.name.as_deref().filter(|n| !n.is_empty())?;
        Some(InstanceRef::new(project, name))
    }

    /// Address of the first `PRIMARY` IP mapping
    pub fn primary_address(&self) -> Option<&str> {
        self.ip_addresses
            .iter()
            .find(|ip| ip.kind.as_deref() == Some("PRIMARY"))
            .and_then(|ip| ip.ip_address.as_deref())
    }

    pub fn tier(&self) -> Option<&str> {
        self.settings.as_ref().and_then(|s| s.tier.as_deref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpMapping {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// One page of `instances.list`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstancesListResponse {
    #[serde(default)]
    pub items: Option<Vec<DatabaseInstance>>,
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub warnings: Vec<ApiWarning>,
}

/// Non-fatal warning attached to a list response (e.g. an unreachable region)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiWarning {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Status of a long-running operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Pending,
    Running,
    Done,
    /// `SQL_OPERATION_STATUS_UNSPECIFIED` or anything newer than this client
    #[default]
    #[serde(other)]
    Unknown,
}

impl OperationStatus {
    /// Position in the `PENDING -> RUNNING -> DONE` progression
    fn rank(self) -> Option<u8> {
        match self {
            Self::Pending => Some(0),
            Self::Running => Some(1),
            Self::Done => Some(2),
            Self::Unknown => None,
        }
    }

    /// True if moving from `self` to `next` would go backwards
    pub fn regresses_to(self, next: OperationStatus) -> bool {
        match (self.rank(), next.rank()) {
            (Some(a), Some(b)) => b < a,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Done
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Done => "DONE",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// A long-running operation handle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub name: String,
    #[serde(default)]
    pub status: OperationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_project: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationErrors>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationErrors {
    #[serde(default)]
    pub errors: Vec<OperationError>,
}

/// Error reported by the server for a finished operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Builder for a new instance configuration, the input of `add`
#[derive(Debug, Clone)]
pub struct InstanceConfig {
    pub name: String,
    pub database_version: String,
    pub tier: String,
    pub region: String,
}

impl InstanceConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            database_version: "MYSQL_8_0".to_string(),
            tier: "db-f1-micro".to_string(),
            region: "us-central1".to_string(),
        }
    }

    pub fn build(self) -> DatabaseInstance {
        DatabaseInstance {
            name: Some(self.name),
            region: Some(self.region),
            database_version: Some(self.database_version),
            settings: Some(Settings {
                tier: Some(self.tier),
                extra: Map::new(),
            }),
            ..Default::default()
        }
    }
}
