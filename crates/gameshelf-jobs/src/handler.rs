use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BoxError;
use crate::types::{JobKind, WorkItem};

/// Executes one kind of work item.
///
/// An `Err` schedules a retry until the queue's attempt limit is reached.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, item: &WorkItem) -> Result<(), BoxError>;
}

/// Handler per [`JobKind`].
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<JobKind, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`, replacing any previous one.
    pub fn register(mut self, kind: JobKind, handler: impl JobHandler + 'static) -> Self {
        self.handlers.insert(kind, Arc::new(handler));
        self
    }

    pub fn get(&self, kind: JobKind) -> Option<&Arc<dyn JobHandler>> {
        self.handlers.get(&kind)
    }

    pub fn kinds(&self) -> Vec<JobKind> {
        self.handlers.keys().copied().collect()
    }

    /// Run the handler registered for the item's kind. A missing handler is
    /// a failure like any other.
    pub async fn dispatch(&self, item: &WorkItem) -> Result<(), BoxError> {
        match self.get(item.kind) {
            Some(handler) => handler.handle(item).await,
            None => Err(format!("No handler registered for job kind '{}'", item.kind).into()),
        }
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
