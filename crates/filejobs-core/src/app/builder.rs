//! AppBuilder - executor の登録とワイヤリング
//!
//! ```ignore
//! let app = AppBuilder::new(store)
//!     .register::<ThumbnailJobPayload, _>(thumbnails)?
//!     .register::<WelcomeJobPayload, _>(welcome)?
//!     .expect_queues(&[QueueName::FILES, QueueName::USERS])
//!     .build()?;
//! let workers = app.run();
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::ports::JobStore;
use crate::typed::{Handler, RegistryError, Task, TypedRegistry};

use super::worker_group::WorkerGroup;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing queues: {0:?}. These queues were expected but have no executor.")]
    MissingQueues(Vec<String>),
}

pub struct AppBuilder {
    store: Arc<dyn JobStore>,
    registry: TypedRegistry,
    expected_queues: Option<Vec<String>>,
    error_backoff: Duration,
}

impl AppBuilder {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self {
            store,
            registry: TypedRegistry::new(),
            expected_queues: None,
            error_backoff: Duration::from_secs(1),
        }
    }

    /// Bind `handler` to the queue of `T`.
    pub fn register<T: Task, H: Handler<T> + 'static>(
        mut self,
        handler: H,
    ) -> Result<Self, RegistryError> {
        self.registry.register::<T, H>(handler)?;
        Ok(self)
    }

    /// Queues that must have an executor for `build` to succeed.
    pub fn expect_queues(mut self, queues: &[&str]) -> Self {
        self.expected_queues = Some(queues.iter().map(|q| q.to_string()).collect());
        self
    }

    /// Pause after a job store error before leasing again.
    pub fn with_error_backoff(mut self, backoff: Duration) -> Self {
        self.error_backoff = backoff;
        self
    }

    pub fn build(self) -> Result<App, BuildError> {
        if let Some(expected) = &self.expected_queues {
            let registered = self.registry.registered_queues();
            let missing: Vec<String> = expected
                .iter()
                .filter(|q| !registered.contains(q))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingQueues(missing));
            }
        }
        Ok(App {
            store: self.store,
            registry: self.registry,
            error_backoff: self.error_backoff,
        })
    }
}

/// A validated set of executors bound to a job store.
pub struct App {
    store: Arc<dyn JobStore>,
    registry: TypedRegistry,
    error_backoff: Duration,
}

impl App {
    pub fn registered_queues(&self) -> Vec<String> {
        self.registry.registered_queues()
    }

    /// Start one serial worker per registered queue.
    pub fn run(self) -> WorkerGroup {
        WorkerGroup::spawn(self.store, &self.registry, self.error_backoff)
    }
}
