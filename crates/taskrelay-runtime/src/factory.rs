//! `TaskHandlerFactory` registry, keyed `"{kind}:{commandKind}"`, built on
//! the crate's generic [`BaseRegistry`].

use std::sync::Arc;

use taskrelay_core::registry::{BaseRegistry, Registerable};

use crate::handler::{factory_key, TaskHandlerFactory};

struct FactoryEntry {
    key: String,
    factory: Arc<dyn TaskHandlerFactory>,
}

impl Registerable for FactoryEntry {
    fn registry_id(&self) -> &str {
        &self.key
    }
}

/// Registry of task handler factories, keyed by `(kind, commandKind)`.
pub struct FactoryRegistry {
    inner: BaseRegistry<FactoryEntry>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self {
            inner: BaseRegistry::new(),
        }
    }

    pub fn register(&self, factory: Arc<dyn TaskHandlerFactory>) {
        let key = factory_key(factory.kind(), factory.command_kind());
        self.inner.register(Arc::new(FactoryEntry { key, factory }));
    }

    pub fn lookup(&self, kind: &str, command_kind: &str) -> Option<Arc<dyn TaskHandlerFactory>> {
        let key = factory_key(kind, command_kind);
        self.inner.get(&key).map(|entry| entry.factory.clone())
    }
}

impl Default for FactoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{CancellationFlag, TaskError, TaskHandler, TaskRunContext};
    use async_trait::async_trait;

    struct EchoHandler;

    #[async_trait]
    impl TaskHandler for EchoHandler {
        async fn run(&self, _cancel: CancellationFlag) -> Result<String, TaskError> {
            Ok("echo".to_string())
        }
    }

    struct EchoFactory;

    impl TaskHandlerFactory for EchoFactory {
        fn kind(&self) -> &str {
            "ECHO"
        }

        fn command_kind(&self) -> &str {
            "Say"
        }

        fn create(&self, _ctx: TaskRunContext) -> Box<dyn TaskHandler> {
            Box::new(EchoHandler)
        }
    }

    #[test]
    fn registers_and_looks_up_by_kind_and_command() {
        let registry = FactoryRegistry::new();
        registry.register(Arc::new(EchoFactory));

        assert!(registry.lookup("ECHO", "Say").is_some());
        assert!(registry.lookup("ECHO", "Other").is_none());
        assert!(registry.lookup("UNKNOWN", "Say").is_none());
    }
}
