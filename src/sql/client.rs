//! Cloud SQL Admin API client
//!
//! [`SqlAdminApi`] is the seam between the command logic and the network:
//! one typed request per method, no retries, no pagination, no polling.

use super::model::{DatabaseInstance, InstancesListResponse, Operation};
use crate::error::{Result, SqlError};
use crate::gcp::client::{add_query_params, GcpClient};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Parameters of `instances.list`, reused for every page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceListRequest {
    pub project: String,
    pub filter: Option<String>,
    pub max_results: Option<u32>,
}

impl InstanceListRequest {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            filter: None,
            max_results: None,
        }
    }
}

/// Typed operations of the Cloud SQL Admin instances/operations resources
#[async_trait]
pub trait SqlAdminApi: Send + Sync {
    async fn get_instance(&self, project: &str, name: &str) -> Result<DatabaseInstance>;

    async fn list_instances(
        &self,
        request: &InstanceListRequest,
        page_token: Option<&str>,
    ) -> Result<InstancesListResponse>;

    async fn insert_instance(&self, project: &str, instance: &DatabaseInstance) -> Result<Operation>;

    async fn delete_instance(&self, project: &str, name: &str) -> Result<Operation>;

    async fn get_operation(&self, project: &str, operation: &str) -> Result<Operation>;
}

fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| SqlError::transport(format!("Unexpected {} response: {}", what, e)))
}

#[async_trait]
impl SqlAdminApi for GcpClient {
    async fn get_instance(&self, project: &str, name: &str) -> Result<DatabaseInstance> {
        let response = self.get(&self.instance_url(project, name)).await?;
        decode(response, "instance")
    }

    async fn list_instances(
        &self,
        request: &InstanceListRequest,
        page_token: Option<&str>,
    ) -> Result<InstancesListResponse> {
        let url = add_query_params(
            &self.sqladmin_url(&request.project, "instances"),
            &[
                ("filter", request.filter.clone()),
                ("maxResults", request.max_results.map(|n| n.to_string())),
                ("pageToken", page_token.map(str::to_string)),
            ],
        );
        let response = self.get(&url).await?;
        if response.is_null() {
            return Ok(InstancesListResponse::default());
        }
        decode(response, "instance list")
    }

    async fn insert_instance(&self, project: &str, instance: &DatabaseInstance) -> Result<Operation> {
        let body = serde_json::to_value(instance)
            .map_err(|e| SqlError::Configuration(format!("Invalid instance configuration: {}", e)))?;
        let response = self
            .post(&self.sqladmin_url(project, "instances"), Some(&body))
            .await?;
        decode(response, "insert operation")
    }

    async fn delete_instance(&self, project: &str, name: &str) -> Result<Operation> {
        let response = self.delete(&self.instance_url(project, name)).await?;
        decode(response, "delete operation")
    }

    async fn get_operation(&self, project: &str, operation: &str) -> Result<Operation> {
        let response = self.get(&self.operation_url(project, operation)).await?;
        decode(response, "operation")
    }
}
