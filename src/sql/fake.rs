//! Scripted in-memory [`SqlAdminApi`] used by unit tests

use super::client::{InstanceListRequest, SqlAdminApi};
use super::model::{DatabaseInstance, InstancesListResponse, Operation, OperationStatus};
use crate::error::{Result, SqlError};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Get(String, String),
    List(String, Option<String>),
    Insert(String, Option<String>),
    Delete(String, String),
    GetOperation(String, String),
}

#[derive(Default)]
pub struct FakeApi {
    calls: Mutex<Vec<Call>>,
    pages: Mutex<VecDeque<Result<InstancesListResponse>>>,
    instances: Mutex<HashMap<(String, String), DatabaseInstance>>,
    submits: Mutex<VecDeque<Result<Operation>>>,
    polls: Mutex<VecDeque<Result<Operation>>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, items: Option<Vec<DatabaseInstance>>, next: Option<&str>) -> Self {
        self.pages.lock().unwrap().push_back(Ok(InstancesListResponse {
            items,
            next_page_token: next.map(str::to_string),
            warnings: vec![],
        }));
        self
    }

    pub fn with_page_error(self, err: SqlError) -> Self {
        self.pages.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn with_instance(self, instance: DatabaseInstance) -> Self {
        let key = (
            instance.project.clone().unwrap_or_default(),
            instance.name.clone().unwrap_or_default(),
        );
        self.instances.lock().unwrap().insert(key, instance);
        self
    }

    pub fn with_submit(self, op: Result<Operation>) -> Self {
        self.submits.lock().unwrap().push_back(op);
        self
    }

    pub fn with_poll(self, op: Result<Operation>) -> Self {
        self.polls.lock().unwrap().push_back(op);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

pub fn instance(project: &str, name: &str) -> DatabaseInstance {
    DatabaseInstance {
        name: Some(name.to_string()),
        project: Some(project.to_string()),
        ..Default::default()
    }
}

pub fn operation(name: &str, status: OperationStatus) -> Operation {
    Operation {
        name: name.to_string(),
        status,
        ..Default::default()
    }
}

#[async_trait]
impl SqlAdminApi for FakeApi {
    async fn get_instance(&self, project: &str, name: &str) -> Result<DatabaseInstance> {
        self.record(Call::Get(project.to_string(), name.to_string()));
        self.instances
            .lock()
            .unwrap()
            .get(&(project.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| SqlError::Transport {
                code: Some(404),
                status: Some("NOT_FOUND".to_string()),
                message: format!("instance {}/{} does not exist", project, name),
            })
    }

    async fn list_instances(
        &self,
        request: &InstanceListRequest,
        page_token: Option<&str>,
    ) -> Result<InstancesListResponse> {
        self.record(Call::List(
            request.project.clone(),
            page_token.map(str::to_string),
        ));
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(InstancesListResponse::default()))
    }

    async fn insert_instance(&self, project: &str, instance: &DatabaseInstance) -> Result<Operation> {
        self.record(Call::Insert(project.to_string(), instance.name.clone()));
        self.submits
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(operation("insert-op", OperationStatus::Done)))
    }

    async fn delete_instance(&self, project: &str, name: &str) -> Result<Operation> {
        self.record(Call::Delete(project.to_string(), name.to_string()));
        self.submits
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(operation("delete-op", OperationStatus::Done)))
    }

    async fn get_operation(&self, project: &str, operation: &str) -> Result<Operation> {
        self.record(Call::GetOperation(project.to_string(), operation.to_string()));
        self.polls
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SqlError::transport("no scripted poll response")))
    }
}
