//! Job handler functions, dispatched by job type from the worker pools.
//!
//! These are the only places in the pipeline allowed to perform external
//! side effects. Handlers must tolerate re-execution with the same payload
//! (retries re-run it verbatim) and must let unresolvable errors propagate
//! so the queue schedules a retry.

pub mod email;
pub mod lead;
pub mod notification;

use leadrail_domain::RepositoryError;
use leadrail_queue::{Job, QueueError, QueueResult};
use serde::de::DeserializeOwned;

pub(crate) fn parse_payload<T: DeserializeOwned>(job: &Job) -> QueueResult<T> {
    serde_json::from_value(job.data.clone()).map_err(|e| QueueError::Deserialization(e.to_string()))
}

pub(crate) fn repo_error(e: RepositoryError) -> QueueError {
    QueueError::ExecutionFailed(e.to_string())
}
