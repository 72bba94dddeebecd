//! Request dispatch: resolve, validate, invoke, validate again, respond.
//!
//! A `call_tool` request moves through
//!
//! ```text
//! Idle -> ValidatingInput -> Invoking -> ValidatingOutput -> Done
//!   \__________\_______________\______________\___________-> Errored
//! ```
//!
//! Input validation is strict: any violation rejects the call before the
//! handler runs. Output validation is advisory: violations are logged and
//! the handler's result is returned unchanged.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use thiserror::Error;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

use crate::mcp::handlers::HandlerRegistry;
use crate::mcp::protocol::{ErrorBody, ErrorCode, Method, Request, RequestId, Response};
use crate::schema::{validate, Catalog, ToolDefinition, Violation};

/// Stages of a single tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// Request received, nothing resolved yet.
    Idle,
    /// Checking arguments against the input contract.
    ValidatingInput,
    /// Handler running.
    Invoking,
    /// Checking the handler result against the output contract.
    ValidatingOutput,
    /// Result ready.
    Done,
    /// Call failed; absorbing.
    Errored,
}

/// A per-request failure. None of these end the session.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallError {
    /// The tool is not in the catalog.
    #[error("unknown tool: {name}")]
    UnknownTool {
        /// Requested tool name.
        name: String,
    },

    /// The arguments violate the input contract.
    #[error("invalid arguments for tool '{name}' ({} violation(s))", .violations.len())]
    InvalidInput {
        /// Tool name.
        name: String,
        /// Every violation found.
        violations: Vec<Violation>,
    },

    /// The tool is declared but has no handler.
    #[error("tool '{name}' has no handler")]
    HandlerNotImplemented {
        /// Tool name.
        name: String,
    },

    /// The handler returned an error or panicked.
    #[error("{message}")]
    HandlerFailure {
        /// Failure message from the handler.
        message: String,
    },

    /// The handler did not finish in time.
    #[error("tool '{name}' timed out after {} ms", .after.as_millis())]
    Timeout {
        /// Tool name.
        name: String,
        /// The configured limit.
        after: Duration,
    },
}

impl CallError {
    /// Wire error code for this failure.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownTool { .. } => ErrorCode::UnknownTool,
            Self::InvalidInput { .. } => ErrorCode::InvalidInput,
            Self::HandlerNotImplemented { .. } => ErrorCode::HandlerNotImplemented,
            Self::HandlerFailure { .. } => ErrorCode::HandlerFailure,
            Self::Timeout { .. } => ErrorCode::Timeout,
        }
    }

    /// Converts into a response error body.
    #[must_use]
    pub fn into_body(self) -> ErrorBody {
        let body = ErrorBody::new(self.code(), self.to_string());
        match self {
            Self::InvalidInput { violations, .. } => body.with_details(violations),
            _ => body,
        }
    }
}

/// Routes decoded requests to the catalog and handler registry.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    catalog: Arc<Catalog>,
    handlers: Arc<HandlerRegistry>,
    call_timeout: Duration,
}

impl Dispatcher {
    /// Creates a dispatcher over a loaded catalog and handler set.
    #[must_use]
    pub fn new(catalog: Catalog, handlers: HandlerRegistry, call_timeout: Duration) -> Self {
        Self {
            catalog: Arc::new(catalog),
            handlers: Arc::new(handlers),
            call_timeout,
        }
    }

    /// The catalog this dispatcher serves.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The per-call handler timeout.
    #[must_use]
    pub const fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Handles one decoded request and builds its response.
    pub async fn dispatch(&self, request: Request) -> Response {
        let Request { id, method } = request;
        tracing::debug!(id = %id, method = method.name(), "Dispatching request");

        match method {
            Method::ListTools => Response::success(id, self.list_tools()),
            Method::Ping => Response::success(id, json!({})),
            Method::CallTool(params) => {
                match self.call_tool(&id, &params.name, params.arguments).await {
                    Ok(result) => Response::success(id, result),
                    Err(error) => {
                        tracing::info!(
                            id = %id,
                            tool = %params.name,
                            code = %error.code(),
                            error = %error,
                            "Tool call failed"
                        );
                        Response::error(Some(id), error.into_body())
                    }
                }
            }
        }
    }

    /// The catalog in declaration order, wrapped as `{"tools": [...]}`.
    #[must_use]
    pub fn list_tools(&self) -> Value {
        let tools: Vec<ToolDefinition<'_>> = self
            .catalog
            .list()
            .iter()
            .map(|tool| tool.to_definition())
            .collect();
        json!({ "tools": tools })
    }

    /// Runs one tool call through validation and the handler boundary.
    ///
    /// # Errors
    ///
    /// Returns a [`CallError`] describing why the call did not produce a
    /// result.
    pub async fn call_tool(
        &self,
        id: &RequestId,
        name: &str,
        arguments: Value,
    ) -> Result<Value, CallError> {
        let mut state = CallState::Idle;
        let result = self.run_call(&mut state, id, name, arguments).await;
        if result.is_err() {
            transition(&mut state, CallState::Errored, id, name);
        }
        result
    }

    async fn run_call(
        &self,
        state: &mut CallState,
        id: &RequestId,
        name: &str,
        arguments: Value,
    ) -> Result<Value, CallError> {
        let Some(tool) = self.catalog.lookup(name) else {
            return Err(CallError::UnknownTool {
                name: name.to_string(),
            });
        };

        transition(state, CallState::ValidatingInput, id, name);
        let checked = validate(&arguments, tool.input());
        if !checked.is_valid() {
            return Err(CallError::InvalidInput {
                name: name.to_string(),
                violations: checked.into_violations(),
            });
        }

        let Some(handler) = self.handlers.resolve(name) else {
            return Err(CallError::HandlerNotImplemented {
                name: name.to_string(),
            });
        };

        transition(state, CallState::Invoking, id, name);
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        // Construct the future inside the task; eager panics must surface as JoinError.
        let mut task = tokio::spawn(async move { handler.call(arguments, task_cancel).await });

        let output = match tokio::time::timeout(self.call_timeout, &mut task).await {
            Ok(Ok(Ok(value))) => value,
            Ok(Ok(Err(failure))) => {
                return Err(CallError::HandlerFailure {
                    message: failure.to_string(),
                });
            }
            Ok(Err(join_error)) => {
                return Err(CallError::HandlerFailure {
                    message: describe_join_error(join_error),
                });
            }
            Err(_elapsed) => {
                cancel.cancel();
                task.abort();
                return Err(CallError::Timeout {
                    name: name.to_string(),
                    after: self.call_timeout,
                });
            }
        };

        transition(state, CallState::ValidatingOutput, id, name);
        let checked = validate(&output, tool.output());
        if !checked.is_valid() {
            let paths: Vec<String> = checked.violations().iter().map(ToString::to_string).collect();
            tracing::warn!(
                id = %id,
                tool = name,
                violations = ?paths,
                "Tool output does not match its declared outputSchema; returning it anyway"
            );
        }

        transition(state, CallState::Done, id, name);
        Ok(output)
    }
}

fn transition(state: &mut CallState, next: CallState, id: &RequestId, tool: &str) {
    tracing::debug!(id = %id, tool, from = ?*state, to = ?next, "Call state transition");
    *state = next;
}

fn describe_join_error(error: JoinError) -> String {
    if error.is_cancelled() {
        return "handler task was cancelled".to_string();
    }
    let payload = error.into_panic();
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("handler panicked: {detail}")
}
