//! Handler trait - Task を実行して Outcome を返す
//!
//! - ジェネリック trait (`Handler<T>`)
//! - Object-safe trait (`DynHandler`)
//! - Type erasure (`TypedHandler<T, H>` → `DynHandler`)

use std::marker::PhantomData;

use async_trait::async_trait;

use super::task::Task;
use crate::domain::Outcome;
use crate::error::JobError;

/// Executes one decoded payload.
///
/// Domain failures (validation, lookups, I/O) should come back as
/// `Ok(Outcome::failure(..))`; `Err` is for the plumbing around it.
#[async_trait]
pub trait Handler<T: Task>: Send + Sync {
    async fn handle(&self, task: T) -> Result<Outcome, JobError>;
}

/// Object-safe handler over raw JSON payloads, stored per queue in
/// `TypedRegistry`.
#[async_trait]
pub trait DynHandler: Send + Sync {
    async fn handle_dyn(&self, payload: serde_json::Value) -> Result<Outcome, JobError>;
    fn queue(&self) -> &str;
}

pub struct TypedHandler<T: Task, H: Handler<T>> {
    handler: H,
    _marker: PhantomData<fn(T)>,
}

impl<T: Task, H: Handler<T>> TypedHandler<T, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Task, H: Handler<T>> DynHandler for TypedHandler<T, H> {
    async fn handle_dyn(&self, payload: serde_json::Value) -> Result<Outcome, JobError> {
        let task: T = serde_json::from_value(payload)?;
        self.handler.handle(task).await
    }

    fn queue(&self) -> &str {
        T::QUEUE
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PingTask {
        pub value: i32,
    }

    impl Task for PingTask {
        const QUEUE: &'static str = "test.ping";
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PongTask {
        pub name: String,
    }

    impl Task for PongTask {
        const QUEUE: &'static str = "test.pong";
    }

    /// Succeeds for non-negative values, fails otherwise.
    pub struct PingHandler;

    #[async_trait]
    impl Handler<PingTask> for PingHandler {
        async fn handle(&self, task: PingTask) -> Result<Outcome, JobError> {
            if task.value < 0 {
                return Ok(Outcome::failure(format!("negative value {}", task.value)));
            }
            Ok(Outcome::success())
        }
    }

    pub struct PongHandler;

    #[async_trait]
    impl Handler<PongTask> for PongHandler {
        async fn handle(&self, _task: PongTask) -> Result<Outcome, JobError> {
            Ok(Outcome::success())
        }
    }
}
