//! Request and response envelopes.
//!
//! Every message is a JSON object carrying a correlation `id`. Requests name
//! a `method`; responses carry exactly one of `result` or `error`.
//!
//! # Methods
//!
//! - `list_tools` (alias `tools/list`): discovery
//! - `call_tool` (alias `tools/call`): invoke a tool with `params.name` and
//!   `params.arguments`
//! - `ping`: liveness check, answers `{}`
//!
//! # Errors
//!
//! Error codes are strings. A request that cannot be decoded yields a
//! `ProtocolDecodeError` response; its `id` is echoed when it could be read
//! and is `null` otherwise.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::Violation;

/// A request correlation ID: an integer or a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(i64),
    /// String request ID.
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// Parameters of a `call_tool` request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CallToolParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool (`{}` when omitted).
    #[serde(default = "empty_object")]
    pub arguments: Value,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// A decoded request method.
#[derive(Debug, Clone, PartialEq)]
pub enum Method {
    /// Return the tool catalog.
    ListTools,
    /// Invoke a tool.
    CallTool(CallToolParams),
    /// Liveness check.
    Ping,
}

impl Method {
    /// Canonical method name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ListTools => "list_tools",
            Self::CallTool(_) => "call_tool",
            Self::Ping => "ping",
        }
    }
}

/// A decoded request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Correlation ID echoed in the response.
    pub id: RequestId,
    /// What the caller asked for.
    pub method: Method,
}

/// Error codes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    /// The requested tool is not in the catalog.
    UnknownTool,
    /// The arguments violate the tool's input contract.
    InvalidInput,
    /// The tool is declared but no handler is registered.
    HandlerNotImplemented,
    /// The handler failed.
    HandlerFailure,
    /// The handler exceeded the call timeout.
    Timeout,
    /// The request envelope could not be decoded.
    ProtocolDecodeError,
}

impl ErrorCode {
    /// The wire string for this code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownTool => "UnknownTool",
            Self::InvalidInput => "InvalidInput",
            Self::HandlerNotImplemented => "HandlerNotImplemented",
            Self::HandlerFailure => "HandlerFailure",
            Self::Timeout => "Timeout",
            Self::ProtocolDecodeError => "ProtocolDecodeError",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `error` member of a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Machine-readable code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Per-field violations, for `InvalidInput`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<Violation>,
}

impl ErrorBody {
    /// Creates an error body without details.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Vec::new(),
        }
    }

    /// Attaches violation details.
    #[must_use]
    pub fn with_details(mut self, details: Vec<Violation>) -> Self {
        self.details = details;
        self
    }
}

/// Success or failure payload of a response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// Successful result.
    Result(Value),
    /// Structured error.
    Error(ErrorBody),
}

/// A response envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    /// The request ID this response corresponds to (`null` if unknown).
    pub id: Option<RequestId>,
    /// Result or error.
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl Response {
    /// Creates a success response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Value is not const-compatible
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            id: Some(id),
            outcome: Outcome::Result(result),
        }
    }

    /// Creates an error response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // ErrorBody contains String
    pub fn error(id: Option<RequestId>, error: ErrorBody) -> Self {
        Self {
            id,
            outcome: Outcome::Error(error),
        }
    }

    /// Returns the error body if this is an error response.
    #[must_use]
    pub const fn as_error(&self) -> Option<&ErrorBody> {
        match &self.outcome {
            Outcome::Error(e) => Some(e),
            Outcome::Result(_) => None,
        }
    }
}

/// A request that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    /// The request ID, if it could be read.
    pub id: Option<RequestId>,
    /// What was wrong.
    pub message: String,
}

impl DecodeError {
    fn new(id: Option<RequestId>, message: impl Into<String>) -> Self {
        Self {
            id,
            message: message.into(),
        }
    }

    /// Converts into a `ProtocolDecodeError` response.
    #[must_use]
    pub fn into_response(self) -> Response {
        Response::error(
            self.id,
            ErrorBody::new(ErrorCode::ProtocolDecodeError, self.message),
        )
    }
}

/// Parses one message into a request.
///
/// # Errors
///
/// Returns a [`DecodeError`] if the text is not JSON, not an object, lacks
/// a valid `id` or `method`, names an unsupported method, or carries
/// malformed `call_tool` parameters.
pub fn parse_request(json: &str) -> Result<Request, DecodeError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| DecodeError::new(None, format!("invalid JSON: {e}")))?;

    let Value::Object(mut obj) = value else {
        return Err(DecodeError::new(None, "request must be a JSON object"));
    };

    let id = match obj.remove("id") {
        Some(raw) => serde_json::from_value::<RequestId>(raw)
            .map_err(|_| DecodeError::new(None, "id must be an integer or a string"))?,
        None => return Err(DecodeError::new(None, "missing id")),
    };

    let method = match obj.get("method") {
        Some(Value::String(m)) if !m.is_empty() => m.clone(),
        Some(_) => {
            return Err(DecodeError::new(
                Some(id),
                "method must be a non-empty string",
            ))
        }
        None => return Err(DecodeError::new(Some(id), "missing method")),
    };

    let method = match method.as_str() {
        "list_tools" | "tools/list" => Method::ListTools,
        "ping" => Method::Ping,
        "call_tool" | "tools/call" => {
            let Some(params) = obj.remove("params") else {
                return Err(DecodeError::new(Some(id), "call_tool requires params"));
            };
            let params: CallToolParams = serde_json::from_value(params).map_err(|e| {
                DecodeError::new(Some(id.clone()), format!("invalid call_tool params: {e}"))
            })?;
            Method::CallTool(params)
        }
        other => {
            return Err(DecodeError::new(
                Some(id),
                format!("unsupported method: {other}"),
            ))
        }
    };

    Ok(Request { id, method })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parse_list_tools() {
        let req = parse_request(r#"{"id": 1, "method": "list_tools"}"#).unwrap();
        assert_eq!(req.id, RequestId::Number(1));
        assert_eq!(req.method, Method::ListTools);
    }

    #[test]
    fn parse_call_tool_with_string_id() {
        let req = parse_request(
            r#"{"id": "abc-123", "method": "call_tool", "params": {"name": "echo", "arguments": {"text": "hi"}}}"#,
        )
        .unwrap();
        assert_eq!(req.id, RequestId::String("abc-123".to_string()));
        let Method::CallTool(params) = req.method else {
            panic!("expected call_tool");
        };
        assert_eq!(params.name, "echo");
        assert_eq!(params.arguments, json!({"text": "hi"}));
    }

    #[test]
    fn arguments_default_to_empty_object() {
        let req =
            parse_request(r#"{"id": 2, "method": "call_tool", "params": {"name": "echo"}}"#)
                .unwrap();
        assert_eq!(
            req.method,
            Method::CallTool(CallToolParams {
                name: "echo".to_string(),
                arguments: json!({}),
            })
        );
    }

    #[test]
    fn mcp_aliases_and_jsonrpc_member_accepted() {
        let req =
            parse_request(r#"{"jsonrpc": "2.0", "id": 3, "method": "tools/list"}"#).unwrap();
        assert_eq!(req.method, Method::ListTools);
    }

    #[test]
    fn invalid_json_has_no_id() {
        let err = parse_request("not valid json").unwrap_err();
        assert_eq!(err.id, None);
        assert!(err.message.starts_with("invalid JSON"));
    }

    #[test]
    fn decode_errors_echo_readable_ids() {
        let err = parse_request(r#"{"id": 9, "method": "shutdown"}"#).unwrap_err();
        assert_eq!(err.id, Some(RequestId::Number(9)));
        assert!(err.message.contains("shutdown"));

        let err = parse_request(r#"{"id": 4, "method": "call_tool", "params": {"arguments": {}}}"#)
            .unwrap_err();
        assert_eq!(err.id, Some(RequestId::Number(4)));

        let err = parse_request(r#"{"id": 5, "method": "call_tool"}"#).unwrap_err();
        assert_eq!(err.id, Some(RequestId::Number(5)));
    }

    #[test]
    fn missing_or_invalid_id_is_rejected() {
        assert_eq!(
            parse_request(r#"{"method": "list_tools"}"#).unwrap_err().id,
            None
        );
        assert!(parse_request(r#"{"id": null, "method": "list_tools"}"#).is_err());
        assert!(parse_request(r#"{"id": [1], "method": "list_tools"}"#).is_err());
        assert!(parse_request("[1, 2]").is_err());
    }

    #[test]
    fn serialise_success_response() {
        let response = Response::success(RequestId::Number(1), json!({"text": "hi"}));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value, json!({"id": 1, "result": {"text": "hi"}}));
    }

    #[test]
    fn serialise_error_response_with_details() {
        let body = ErrorBody::new(ErrorCode::InvalidInput, "invalid arguments").with_details(vec![
            Violation {
                path: "text".to_string(),
                reason: "required".to_string(),
            },
        ]);
        let value = serde_json::to_value(Response::error(Some(RequestId::Number(2)), body)).unwrap();
        assert_eq!(
            value,
            json!({
                "id": 2,
                "error": {
                    "code": "InvalidInput",
                    "message": "invalid arguments",
                    "details": [{"path": "text", "reason": "required"}]
                }
            })
        );
    }

    #[test]
    fn serialise_decode_error_without_details_or_id() {
        let response = DecodeError::new(None, "invalid JSON").into_response();
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(
            json,
            r#"{"id":null,"error":{"code":"ProtocolDecodeError","message":"invalid JSON"}}"#
        );
    }

    #[test]
    fn request_id_display() {
        assert_eq!(format!("{}", RequestId::Number(42)), "42");
        assert_eq!(format!("{}", RequestId::String("abc".to_string())), "abc");
    }
}
