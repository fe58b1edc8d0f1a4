//! TypedRegistry - queue ごとの Handler 登録

use std::collections::HashMap;
use std::sync::Arc;

use super::handler::{DynHandler, Handler, TypedHandler};
use super::task::Task;

/// Queue name -> type-erased handler.
///
/// Built during initialization (mutable), read-only once the workers run.
#[derive(Default)]
pub struct TypedRegistry {
    handlers: HashMap<String, Arc<dyn DynHandler>>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Handler for queue '{0}' is already registered")]
    AlreadyRegistered(String),
}

impl TypedRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register<T: Task, H: Handler<T> + 'static>(
        &mut self,
        handler: H,
    ) -> Result<(), RegistryError> {
        let queue = T::QUEUE.to_string();
        if self.handlers.contains_key(&queue) {
            return Err(RegistryError::AlreadyRegistered(queue));
        }
        self.handlers
            .insert(queue, Arc::new(TypedHandler::<T, H>::new(handler)));
        Ok(())
    }

    pub fn get(&self, queue: &str) -> Option<Arc<dyn DynHandler>> {
        self.handlers.get(queue).cloned()
    }

    /// Registered queue names, sorted.
    pub fn registered_queues(&self) -> Vec<String> {
        let mut queues: Vec<String> = self.handlers.keys().cloned().collect();
        queues.sort();
        queues
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn DynHandler>)> {
        self.handlers.iter().map(|(q, h)| (q.as_str(), h))
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
