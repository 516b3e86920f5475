//! Operation Waiter
//!
//! Mutating calls return an [`Operation`] handle instead of a finished
//! resource. [`OperationWaiter::await_completion`] polls that handle until the
//! server reports `DONE`, then surfaces either the finished operation or the
//! server's error payload.
//!
//! Cancelling the token only stops the local wait; the remote operation keeps
//! running and its outcome has to be re-queried.

use super::client::SqlAdminApi;
use super::model::{Operation, OperationStatus};
use crate::error::{Result, SqlError};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Backoff between operation polls
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    /// Delay before the first poll
    pub initial_interval_ms: u64,
    /// Upper bound of the (un-jittered) delay
    pub max_interval_ms: u64,
    pub multiplier: f64,
    /// Fraction of the delay randomly added or removed, 0.0..=1.0
    pub jitter: f64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval_ms: 1_000,
            max_interval_ms: 10_000,
            multiplier: 1.5,
            jitter: 0.2,
        }
    }
}

impl PollPolicy {
    /// Constant interval without jitter
    pub fn fixed(interval: Duration) -> Self {
        let ms = interval.as_millis() as u64;
        Self {
            initial_interval_ms: ms,
            max_interval_ms: ms,
            multiplier: 1.0,
            jitter: 0.0,
        }
    }
}

/// Delay sequence derived from a [`PollPolicy`]
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: PollPolicy,
    current_ms: f64,
}

impl Backoff {
    pub fn new(policy: PollPolicy) -> Self {
        let max = policy.max_interval_ms.max(1) as f64;
        Self {
            current_ms: (policy.initial_interval_ms as f64).min(max),
            policy,
        }
    }

    /// Delay before the next poll
    pub fn next_delay(&mut self) -> Duration {
        let max = self.policy.max_interval_ms.max(1) as f64;
        let base = self.current_ms;
        self.current_ms = (self.current_ms * self.policy.multiplier.max(1.0)).min(max);

        let jitter = self.policy.jitter.clamp(0.0, 1.0);
        let factor = 1.0 + jitter * (2.0 * rand::random::<f64>() - 1.0);
        Duration::from_millis((base * factor).max(0.0).round() as u64)
    }
}

/// Polls an operation handle until it settles
pub struct OperationWaiter<'a, A: SqlAdminApi + ?Sized> {
    api: &'a A,
    policy: PollPolicy,
}

impl<'a, A: SqlAdminApi + ?Sized> OperationWaiter<'a, A> {
    pub fn new(api: &'a A, policy: PollPolicy) -> Self {
        Self { api, policy }
    }

    /// Wait for `submitted` (as returned by insert/delete) to reach `DONE`.
    ///
    /// * `DONE` without error: the final operation.
    /// * `DONE` with error: [`SqlError::OperationFailed`] with the server's
    ///   errors verbatim.
    /// * A failed poll request is returned immediately.
    /// * Cancellation returns [`SqlError::Cancelled`] without issuing further
    ///   requests.
    pub async fn await_completion(
        &self,
        project: &str,
        submitted: Operation,
        cancel: &CancellationToken,
    ) -> Result<Operation> {
        let started = Instant::now();
        let mut backoff = Backoff::new(self.policy);
        let mut current = submitted;
        let mut polls: u32 = 0;

        tracing::info!(
            "Waiting for operation {} ({})",
            current.name,
            current.operation_type.as_deref().unwrap_or("unknown type")
        );

        loop {
            if current.status.is_terminal() {
                tracing::info!(
                    "Operation {} finished after {} polls in {:.1}s",
                    current.name,
                    polls,
                    started.elapsed().as_secs_f64()
                );
                return settle(current);
            }

            if cancel.is_cancelled() {
                return Err(cancelled(&current));
            }

            let delay = backoff.next_delay();
            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                polled = async {
                    tokio::time::sleep(delay).await;
                    self.api.get_operation(project, &current.name).await
                } => Some(polled),
            };
            let Some(polled) = polled else {
                return Err(cancelled(&current));
            };
            let next = polled?;
            polls += 1;

            if current.status.regresses_to(next.status) {
                tracing::warn!(
                    "Operation {} reported {} after {}; continuing to poll",
                    current.name,
                    next.status,
                    current.status
                );
            } else if next.status != current.status {
                tracing::debug!(
                    "Operation {}: {} -> {}",
                    current.name,
                    current.status,
                    next.status
                );
            }

            current = next;
        }
    }
}

fn cancelled(op: &Operation) -> SqlError {
    tracing::warn!("Stopped waiting for operation {} (last status {})", op.name, op.status);
    SqlError::Cancelled {
        operation: Some(op.name.clone()),
    }
}

fn settle(op: Operation) -> Result<Operation> {
    debug_assert_eq!(op.status, OperationStatus::Done);
    match op.error {
        Some(error) => Err(SqlError::OperationFailed {
            operation: op.name,
            errors: error.errors,
        }),
        None => Ok(op),
    }
}
