//! Built-in demonstration tools.
//!
//! These back the bundled `catalog/tools.json`. Real deployments register
//! their own handlers next to (or instead of) these.

use std::time::Duration;

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::error::RegistryError;
use crate::mcp::handlers::{HandlerError, HandlerRegistry};
use crate::schema::Catalog;

/// Longest sleep `delay` accepts, in milliseconds.
pub const MAX_DELAY_MS: u64 = 60_000;

/// The bundled catalog describing the built-in tools.
pub const BUILTIN_CATALOG: &str = include_str!("../../catalog/tools.json");

/// Registers the built-in tools that `catalog` declares.
///
/// Tools the catalog does not mention are skipped so that every registered
/// handler keeps a matching descriptor. Returns how many were registered.
///
/// # Errors
///
/// Returns an error if a built-in name is already registered.
pub fn register_builtin(
    registry: &mut HandlerRegistry,
    catalog: &Catalog,
) -> Result<usize, RegistryError> {
    let mut registered = 0;
    if catalog.lookup("echo").is_some() {
        registry.register_fn("echo", |arguments, _cancel| echo(arguments))?;
        registered += 1;
    }
    if catalog.lookup("delay").is_some() {
        registry.register_fn("delay", delay)?;
        registered += 1;
    }
    Ok(registered)
}

/// Returns the arguments unchanged.
async fn echo(arguments: Value) -> Result<Value, HandlerError> {
    Ok(arguments)
}

/// Sleeps for `ms` milliseconds unless cancelled first.
async fn delay(arguments: Value, cancel: CancellationToken) -> Result<Value, HandlerError> {
    let ms = arguments
        .get("ms")
        .and_then(Value::as_u64)
        .ok_or_else(|| HandlerError::failed("'ms' must be a non-negative integer"))?;
    if ms > MAX_DELAY_MS {
        return Err(HandlerError::failed(format!(
            "'ms' must not exceed {MAX_DELAY_MS}"
        )));
    }

    tokio::select! {
        () = tokio::time::sleep(Duration::from_millis(ms)) => Ok(json!({ "slept_ms": ms })),
        () = cancel.cancelled() => {
            tracing::debug!(ms, "delay cancelled");
            Err(HandlerError::failed("cancelled"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_matches_handlers() {
        let catalog = Catalog::from_json(BUILTIN_CATALOG).unwrap();
        let mut registry = HandlerRegistry::new();
        assert_eq!(register_builtin(&mut registry, &catalog).unwrap(), 2);

        assert!(registry.check_against(&catalog).is_ok());
        for tool in catalog.list() {
            assert!(registry.contains(tool.name()), "{} has no handler", tool.name());
        }
    }

    #[test]
    fn skips_tools_the_catalog_does_not_declare() {
        let catalog = Catalog::from_json(
            r#"{"name": "c", "tools": [{"name": "echo", "inputSchema": {"type": "object"}}]}"#,
        )
        .unwrap();
        let mut registry = HandlerRegistry::new();
        assert_eq!(register_builtin(&mut registry, &catalog).unwrap(), 1);
        assert!(registry.resolve("delay").is_none());
        assert!(registry.check_against(&catalog).is_ok());
    }

    #[tokio::test]
    async fn echo_returns_arguments() {
        let out = echo(json!({"text": "hi"})).await;
        assert_eq!(out, Ok(json!({"text": "hi"})));
    }

    #[tokio::test]
    async fn delay_sleeps_then_reports() {
        let out = delay(json!({"ms": 1}), CancellationToken::new()).await;
        assert_eq!(out, Ok(json!({"slept_ms": 1})));
    }

    #[tokio::test]
    async fn delay_observes_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let out = delay(json!({"ms": MAX_DELAY_MS}), cancel).await;
        assert_eq!(out, Err(HandlerError::failed("cancelled")));
    }

    #[tokio::test]
    async fn delay_rejects_excessive_duration() {
        let out = delay(json!({"ms": MAX_DELAY_MS + 1}), CancellationToken::new()).await;
        assert!(out.is_err());
    }
}
