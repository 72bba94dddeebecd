//! Handler registry: tool name to asynchronous callable.
//!
//! Handlers receive validated arguments and a [`CancellationToken`] that is
//! cancelled when the dispatcher gives up on the call (timeout). Long
//! running handlers should observe it; the dispatcher also aborts the task.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::error::RegistryError;
use crate::schema::Catalog;

/// A domain failure reported by a tool handler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HandlerError {
    /// The operation failed.
    #[error("{0}")]
    Failed(String),

    /// The handler needs configuration that is not available.
    #[error("missing configuration: {0}")]
    MissingConfig(String),
}

impl HandlerError {
    /// Creates a generic failure.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::Failed(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::Failed(message.to_string())
    }
}

/// Boxed future returned by a handler invocation.
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<Value, HandlerError>> + Send>>;

/// An asynchronous tool implementation.
pub trait ToolHandler: Send + Sync {
    /// Starts one invocation. The returned future must be `'static`; clone
    /// whatever state it needs out of `self`.
    fn call(&self, arguments: Value, cancel: CancellationToken) -> HandlerFuture;
}

/// Adapts a plain async closure into a [`ToolHandler`].
pub struct FnHandler<F> {
    inner: F,
}

impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(Value, CancellationToken) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
{
    fn call(&self, arguments: Value, cancel: CancellationToken) -> HandlerFuture {
        Box::pin((self.inner)(arguments, cancel))
    }
}

/// Mapping from tool name to handler. Built at startup, read-only afterwards.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateHandler`] if `name` is taken.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.handlers.contains_key(&name) {
            return Err(RegistryError::DuplicateHandler { name });
        }
        self.handlers.insert(name, handler);
        Ok(())
    }

    /// Registers an async closure under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateHandler`] if `name` is taken.
    pub fn register_fn<F, Fut>(&mut self, name: impl Into<String>, f: F) -> Result<(), RegistryError>
    where
        F: Fn(Value, CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
    {
        self.register(name, Arc::new(FnHandler { inner: f }))
    }

    /// Resolves a handler by tool name.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Returns `true` if a handler is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if no handlers are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Checks the registry against the catalog at startup.
    ///
    /// A handler without a declared tool is an error. A declared tool
    /// without a handler is only logged; calls to it fail at request time.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UndeclaredHandler`] for the first orphaned
    /// handler (in name order).
    pub fn check_against(&self, catalog: &Catalog) -> Result<(), RegistryError> {
        let mut names: Vec<&String> = self.handlers.keys().collect();
        names.sort();
        if let Some(orphan) = names.into_iter().find(|n| catalog.lookup(n).is_none()) {
            return Err(RegistryError::UndeclaredHandler {
                name: orphan.clone(),
            });
        }

        for tool in catalog.list() {
            if !self.contains(tool.name()) {
                tracing::warn!(tool = tool.name(), "Declared tool has no registered handler");
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    use super::*;

    fn catalog() -> Catalog {
        Catalog::from_value(json!({
            "name": "t",
            "tools": [
                {"name": "echo", "inputSchema": {"type": "object"}},
                {"name": "unhandled", "inputSchema": {"type": "object"}}
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn registered_closure_is_callable() {
        let mut registry = HandlerRegistry::new();
        assert_ok!(registry.register_fn("echo", |args, _cancel| async move { Ok(args) }));

        let handler = registry.resolve("echo").unwrap();
        let out = handler
            .call(json!({"text": "hi"}), CancellationToken::new())
            .await;
        assert_eq!(out, Ok(json!({"text": "hi"})));
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = HandlerRegistry::new();
        assert_ok!(registry.register_fn("echo", |a, _| async move { Ok(a) }));
        let err = assert_err!(registry.register_fn("echo", |a, _| async move { Ok(a) }));
        assert_eq!(
            err,
            RegistryError::DuplicateHandler {
                name: "echo".to_string()
            }
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn resolve_unknown_is_none() {
        let registry = HandlerRegistry::new();
        assert!(registry.resolve("echo").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn check_against_rejects_undeclared_handlers() {
        let mut registry = HandlerRegistry::new();
        assert_ok!(registry.register_fn("echo", |a, _| async move { Ok(a) }));
        assert_ok!(registry.check_against(&catalog()));

        assert_ok!(registry.register_fn("ghost", |a, _| async move { Ok(a) }));
        assert_eq!(
            registry.check_against(&catalog()),
            Err(RegistryError::UndeclaredHandler {
                name: "ghost".to_string()
            })
        );
    }

    #[test]
    fn handler_error_messages() {
        assert_eq!(HandlerError::from("boom").to_string(), "boom");
        assert_eq!(
            HandlerError::MissingConfig("WEATHER_API_KEY".into()).to_string(),
            "missing configuration: WEATHER_API_KEY"
        );
    }
}
