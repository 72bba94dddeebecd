//! mcp-tool-server: a schema-validated tool invocation server.
//!
//! The server advertises a catalog of tools, each described by an input and
//! an output contract, and answers `list_tools` and `call_tool` requests over
//! a line-delimited JSON channel.
//!
//! # Architecture
//!
//! - **Catalog**: tool descriptors loaded from a declarative JSON document
//! - **Validator**: JSON-Schema subset checks that report every violation
//! - **Handlers**: tool name to async callable, registered at startup
//! - **Dispatcher**: validate input, invoke under a timeout, check output
//! - **Session loop**: one request at a time, responses in arrival order
//!
//! Input contracts are enforced; output contracts are advisory and only
//! produce warnings.
//!
//! # Modules
//!
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Startup error types
//! - [`schema`] — Catalog, contracts and validation
//! - [`mcp`] — Protocol, dispatch, transport and session loop
//! - [`tools`] — Built-in demonstration tools

pub mod config;
pub mod error;
pub mod mcp;
pub mod schema;
pub mod tools;
