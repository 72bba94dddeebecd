//! Tool invocation protocol server.
//!
//! This module exposes a catalog of schema-described tools to a client over
//! a line-delimited JSON channel (stdio by default).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          McpServer                           │
//! │                                                              │
//! │   ┌─────────────┐    ┌──────────────┐    ┌───────────────┐   │
//! │   │  Transport  │───▶│  Dispatcher  │───▶│   Handlers    │   │
//! │   │   (lines)   │    │ (validation) │    │ (async tools) │   │
//! │   └─────────────┘    └──────────────┘    └───────────────┘   │
//! │          │                  │                                │
//! │          ▼                  ▼                                │
//! │   ┌──────────────┐   ┌──────────────────────────┐            │
//! │   │  Envelopes   │   │ Catalog + Contract check │            │
//! │   └──────────────┘   └──────────────────────────┘            │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod dispatcher;
pub mod handlers;
pub mod protocol;
pub mod server;
pub mod transport;

pub use dispatcher::{CallError, CallState, Dispatcher};
pub use handlers::{HandlerError, HandlerRegistry, ToolHandler};
pub use protocol::{parse_request, ErrorCode, Request, RequestId, Response};
pub use server::McpServer;
pub use transport::{Incoming, LineTransport, StdioTransport};
