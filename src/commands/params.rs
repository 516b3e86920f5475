//! Parameter sets
//!
//! Every command accepts a closed set of mutually exclusive input shapes.
//! The raw flags are resolved into exactly one of them up front; anything
//! that matches none fails with a configuration error before any request.

use crate::config::Config;
use crate::error::{Result, SqlError};
use crate::sql::{DatabaseInstance, InstanceListRequest, InstanceRef};

/// Source of the ambient default project
pub trait ProjectSource {
    fn default_project(&self) -> Option<String>;
}

impl ProjectSource for Config {
    fn default_project(&self) -> Option<String> {
        self.effective_project()
    }
}

/// Explicit project, otherwise the ambient default
fn resolve_project(explicit: Option<String>, defaults: &dyn ProjectSource) -> Result<String> {
    non_empty(explicit)
        .or_else(|| defaults.default_project())
        .ok_or_else(|| {
            SqlError::Configuration(
                "No project configured. Use --project, set GOOGLE_CLOUD_PROJECT, or run 'gcloud config set project'"
                    .to_string(),
            )
        })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Flags accepted by `get`
#[derive(Debug, Clone, Default)]
pub struct RawGetArgs {
    pub project: Option<String>,
    pub name: Option<String>,
    pub filter: Option<String>,
    pub max_results: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetRequest {
    Single(InstanceRef),
    List(InstanceListRequest),
}

impl GetRequest {
    pub fn resolve(raw: RawGetArgs, defaults: &dyn ProjectSource) -> Result<Self> {
        let name = non_empty(raw.name);
        let filter = non_empty(raw.filter);

        match name {
            Some(name) => {
                if filter.is_some() || raw.max_results.is_some() {
                    return Err(SqlError::Configuration(
                        "--filter and --max-results only apply when listing; omit the instance name"
                            .to_string(),
                    ));
                }
                let project = resolve_project(raw.project, defaults)?;
                Ok(GetRequest::Single(InstanceRef::new(project, name)))
            },
            None => {
                if raw.max_results == Some(0) {
                    return Err(SqlError::Configuration(
                        "--max-results must be greater than zero".to_string(),
                    ));
                }
                let project = resolve_project(raw.project, defaults)?;
                Ok(GetRequest::List(InstanceListRequest {
                    project,
                    filter,
                    max_results: raw.max_results,
                }))
            },
        }
    }
}

/// Flags accepted by `add`
#[derive(Debug, Clone, Default)]
pub struct RawCreateArgs {
    pub project: Option<String>,
    pub config: Option<DatabaseInstance>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateRequest {
    pub project: String,
    pub config: DatabaseInstance,
}

impl CreateRequest {
    /// The project comes from `--project`, then the configuration object,
    /// then the ambient default.
    pub fn resolve(raw: RawCreateArgs, defaults: &dyn ProjectSource) -> Result<Self> {
        let config = raw.config.ok_or_else(|| {
            SqlError::Configuration("An instance configuration object is required".to_string())
        })?;
        if non_empty(config.name.clone()).is_none() {
            return Err(SqlError::Configuration(
                "The instance configuration has no name".to_string(),
            ));
        }
        let project = resolve_project(non_empty(raw.project).or(config.project.clone()), defaults)?;
        Ok(CreateRequest { project, config })
    }

    /// Identity of the instance being created
    pub fn identity(&self) -> InstanceRef {
        InstanceRef::new(
            self.project.clone(),
            self.config.name.clone().unwrap_or_default(),
        )
    }
}

/// Flags accepted by `remove`
#[derive(Debug, Clone, Default)]
pub struct RawRemoveArgs {
    pub project: Option<String>,
    pub name: Option<String>,
    pub instance_object: Option<DatabaseInstance>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RemoveRequest {
    ByName { project: String, name: String },
    ByInstance { instance: DatabaseInstance },
}

impl RemoveRequest {
    pub fn resolve(raw: RawRemoveArgs, defaults: &dyn ProjectSource) -> Result<Self> {
        match (non_empty(raw.name), raw.instance_object) {
            (Some(name), None) => {
                let project = resolve_project(raw.project, defaults)?;
                Ok(RemoveRequest::ByName { project, name })
            },
            (None, Some(instance)) => {
                if non_empty(raw.project).is_some() {
                    return Err(SqlError::Configuration(
                        "--project cannot be combined with an instance object; the object's project is used"
                            .to_string(),
                    ));
                }
                if instance.identity().is_none() {
                    return Err(SqlError::Configuration(
                        "The instance object must carry both 'project' and 'name'".to_string(),
                    ));
                }
                Ok(RemoveRequest::ByInstance { instance })
            },
            (Some(_), Some(_)) => Err(SqlError::Configuration(
                "Specify either an instance name or an instance object, not both".to_string(),
            )),
            (None, None) => Err(SqlError::Configuration(
                "Specify an instance name or an instance object to remove".to_string(),
            )),
        }
    }

    pub fn identity(&self) -> InstanceRef {
        match self {
            RemoveRequest::ByName { project, name } => InstanceRef::new(project.clone(), name.clone()),
            RemoveRequest::ByInstance { instance } => instance
                .identity()
                .unwrap_or_else(|| InstanceRef::new(String::new(), String::new())),
        }
    }
}
