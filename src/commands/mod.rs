//! Command Dispatcher
//!
//! Each command runs exactly one execution path, chosen from its resolved
//! parameter set:
//!
//! - `get`: one fetch, or a streamed listing through [`InstancePager`]
//! - `add`: insert, wait for the operation, re-fetch the instance
//! - `remove`: confirm, delete, wait for the operation

pub mod input;
pub mod params;

pub use input::{read_instance_data, Confirm, TerminalConfirm};
pub use params::{
    CreateRequest, GetRequest, ProjectSource, RawCreateArgs, RawGetArgs, RawRemoveArgs,
    RemoveRequest,
};

use crate::error::{Result, SqlError};
use crate::sql::{
    DatabaseInstance, InstanceRef, InstancePager, OperationWaiter, PollPolicy, SqlAdminApi,
};
use serde::Serialize;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Receives instances as they are produced
pub trait InstanceSink {
    fn emit(&mut self, instance: &DatabaseInstance) -> Result<()>;
}

impl InstanceSink for Vec<DatabaseInstance> {
    fn emit(&mut self, instance: &DatabaseInstance) -> Result<()> {
        self.push(instance.clone());
        Ok(())
    }
}

/// Result of `remove`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RemoveOutcome {
    Deleted {
        instance: InstanceRef,
        operation: String,
    },
    /// The confirmation gate declined; nothing was sent
    Skipped { instance: InstanceRef },
}

pub struct Dispatcher<'a, A: SqlAdminApi + ?Sized> {
    api: &'a A,
    policy: PollPolicy,
    cancel: CancellationToken,
}

impl<'a, A: SqlAdminApi + ?Sized> Dispatcher<'a, A> {
    pub fn new(api: &'a A, policy: PollPolicy, cancel: CancellationToken) -> Self {
        Self { api, policy, cancel }
    }

    fn waiter(&self) -> OperationWaiter<'a, A> {
        OperationWaiter::new(self.api, self.policy)
    }

    /// Run a single request unless the token fires first. A request already
    /// on the wire is abandoned; whatever it started remotely keeps running.
    async fn unless_cancelled<T>(&self, request: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(SqlError::Cancelled { operation: None }),
            result = request => result,
        }
    }

    /// Emit one instance, or every instance of the project as pages arrive.
    /// Returns the number of instances emitted.
    pub async fn get(&self, request: GetRequest, sink: &mut dyn InstanceSink) -> Result<usize> {
        match request {
            GetRequest::Single(identity) => {
                tracing::info!("Fetching instance {}", identity);
                let instance = self
                    .unless_cancelled(self.api.get_instance(&identity.project, &identity.name))
                    .await?;
                sink.emit(&instance)?;
                Ok(1)
            },
            GetRequest::List(list) => {
                tracing::info!("Listing instances in {}", list.project);
                let mut pager = InstancePager::new(self.api, list);
                let mut count = 0;
                while let Some(instance) = pager.next_cancellable(&self.cancel).await? {
                    sink.emit(&instance)?;
                    count += 1;
                }
                tracing::info!("Listed {} instances over {} pages", count, pager.pages_fetched());
                Ok(count)
            },
        }
    }

    /// Create the instance and return it as re-fetched after completion, so
    /// server-assigned fields (addresses, connection name) are present.
    pub async fn create(&self, request: CreateRequest) -> Result<DatabaseInstance> {
        let identity = request.identity();
        tracing::info!("Creating instance {}", identity);

        let submitted = self
            .unless_cancelled(self.api.insert_instance(&request.project, &request.config))
            .await?;
        self.waiter()
            .await_completion(&request.project, submitted, &self.cancel)
            .await?;

        self.unless_cancelled(self.api.get_instance(&identity.project, &identity.name))
            .await
    }

    /// Delete the instance once `confirm` agrees (or `force` is set)
    pub async fn remove(
        &self,
        request: RemoveRequest,
        force: bool,
        confirm: &mut dyn Confirm,
    ) -> Result<RemoveOutcome> {
        let identity = request.identity();

        if !force && !confirm.confirm(&format!("Delete instance {}? All data in it will be lost.", identity))? {
            tracing::info!("Deletion of {} declined", identity);
            return Ok(RemoveOutcome::Skipped { instance: identity });
        }

        tracing::info!("Deleting instance {}", identity);
        let submitted = self
            .unless_cancelled(self.api.delete_instance(&identity.project, &identity.name))
            .await?;
        let done = self
            .waiter()
            .await_completion(&identity.project, submitted, &self.cancel)
            .await?;

        Ok(RemoveOutcome::Deleted {
            instance: identity,
            operation: done.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::fake::{instance, operation, Call, FakeApi};
    use crate::sql::{InstanceListRequest, OperationStatus};
    use std::time::Duration;

    struct Answer {
        value: bool,
        asked: usize,
    }

    impl Confirm for Answer {
        fn confirm(&mut self, _prompt: &str) -> Result<bool> {
            self.asked += 1;
            Ok(self.value)
        }
    }

    fn dispatcher(api: &FakeApi) -> Dispatcher<'_, FakeApi> {
        Dispatcher::new(
            api,
            PollPolicy::fixed(Duration::from_millis(1)),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_get_single() {
        let api = FakeApi::new().with_instance(instance("p", "db-1"));
        let mut out = Vec::new();
        let n = dispatcher(&api)
            .get(GetRequest::Single(InstanceRef::new("p", "db-1")), &mut out)
            .await
            .unwrap();
        assert_eq!(n, 1);
        assert_eq!(out[0].name.as_deref(), Some("db-1"));
        assert_eq!(api.calls(), vec![Call::Get("p".into(), "db-1".into())]);
    }

    #[tokio::test]
    async fn test_get_list_streams_all_pages() {
        let api = FakeApi::new()
            .with_page(Some(vec![instance("p", "a")]), Some("next"))
            .with_page(Some(vec![instance("p", "b")]), None);
        let mut out = Vec::new();
        let n = dispatcher(&api)
            .get(GetRequest::List(InstanceListRequest::new("p")), &mut out)
            .await
            .unwrap();
        assert_eq!(n, 2);
        assert_eq!(out.len(), 2);
    }

    #[tokio::test]
    async fn test_create_emits_refetched_instance() {
        let mut refetched = instance("P", "X");
        refetched.connection_name = Some("P:us-central1:X".into());
        refetched.state = Some("RUNNABLE".into());

        let mut op_payload = operation("create-op", OperationStatus::Pending);
        op_payload.target_id = Some("X".into());

        let api = FakeApi::new()
            .with_instance(refetched.clone())
            .with_submit(Ok(op_payload))
            .with_poll(Ok(operation("create-op", OperationStatus::Running)))
            .with_poll(Ok(operation("create-op", OperationStatus::Done)));

        let request = CreateRequest {
            project: "P".into(),
            config: DatabaseInstance {
                name: Some("X".into()),
                ..Default::default()
            },
        };
        let created = dispatcher(&api).create(request).await.unwrap();

        assert_eq!(created, refetched);
        assert_eq!(
            api.calls(),
            vec![
                Call::Insert("P".into(), Some("X".into())),
                Call::GetOperation("P".into(), "create-op".into()),
                Call::GetOperation("P".into(), "create-op".into()),
                Call::Get("P".into(), "X".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_create_failure_skips_refetch() {
        let mut failed = operation("create-op", OperationStatus::Done);
        failed.error = Some(crate::sql::model::OperationErrors {
            errors: vec![crate::sql::model::OperationError {
                kind: None,
                code: Some("INVALID_TIER".into()),
                message: Some("tier not available".into()),
            }],
        });
        let api = FakeApi::new().with_submit(Ok(failed));

        let err = dispatcher(&api)
            .create(CreateRequest {
                project: "P".into(),
                config: instance("P", "X"),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, SqlError::OperationFailed { .. }));
        assert_eq!(api.calls(), vec![Call::Insert("P".into(), Some("X".into()))]);
    }

    #[tokio::test]
    async fn test_remove_declined_makes_no_calls() {
        let api = FakeApi::new();
        let mut answer = Answer { value: false, asked: 0 };
        let outcome = dispatcher(&api)
            .remove(
                RemoveRequest::ByName {
                    project: "p1".into(),
                    name: "db1".into(),
                },
                false,
                &mut answer,
            )
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RemoveOutcome::Skipped {
                instance: InstanceRef::new("p1", "db1")
            }
        );
        assert_eq!(answer.asked, 1);
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_remove_by_instance_object() {
        let api = FakeApi::new()
            .with_submit(Ok(operation("delete-op", OperationStatus::Pending)))
            .with_poll(Ok(operation("delete-op", OperationStatus::Done)));
        let mut answer = Answer { value: true, asked: 0 };

        let outcome = dispatcher(&api)
            .remove(
                RemoveRequest::ByInstance {
                    instance: instance("p1", "db1"),
                },
                false,
                &mut answer,
            )
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RemoveOutcome::Deleted {
                instance: InstanceRef::new("p1", "db1"),
                operation: "delete-op".into(),
            }
        );
        assert_eq!(
            api.calls(),
            vec![
                Call::Delete("p1".into(), "db1".into()),
                Call::GetOperation("p1".into(), "delete-op".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_remove_force_skips_gate() {
        let api = FakeApi::new();
        let mut answer = Answer { value: false, asked: 0 };
        let outcome = dispatcher(&api)
            .remove(
                RemoveRequest::ByName {
                    project: "p1".into(),
                    name: "db1".into(),
                },
                true,
                &mut answer,
            )
            .await
            .unwrap();
        assert!(matches!(outcome, RemoveOutcome::Deleted { .. }));
        assert_eq!(answer.asked, 0);
    }

    #[tokio::test]
    async fn test_remove_cancelled_mid_poll() {
        let api = FakeApi::new().with_submit(Ok(operation("delete-op", OperationStatus::Running)));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let dispatcher = Dispatcher::new(&api, PollPolicy::default(), cancel);

        let err = dispatcher
            .remove(
                RemoveRequest::ByName {
                    project: "p1".into(),
                    name: "db1".into(),
                },
                true,
                &mut Answer { value: true, asked: 0 },
            )
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(api.calls(), vec![Call::Delete("p1".into(), "db1".into())]);
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_single_get() {
        let api = FakeApi::new().with_instance(instance("p", "db-1"));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut out = Vec::new();

        let err = Dispatcher::new(&api, PollPolicy::default(), cancel)
            .get(GetRequest::Single(InstanceRef::new("p", "db-1")), &mut out)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(out.is_empty());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_create_before_submit() {
        let api = FakeApi::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = Dispatcher::new(&api, PollPolicy::default(), cancel)
            .create(CreateRequest {
                project: "P".into(),
                config: instance("P", "X"),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, SqlError::Cancelled { operation: None }));
        assert!(api.calls().is_empty());
    }
}
