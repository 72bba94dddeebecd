//! Tool contracts: catalog loading, the contract tree and validation.
//!
//! - [`catalog`] — declarative tool catalog, lookup by name, discovery list
//! - [`contract`] — JSON-Schema subset parsed into a [`Contract`] tree
//! - [`validator`] — single-pass structural validation producing violations

pub mod catalog;
pub mod contract;
pub mod validator;

pub use catalog::{Catalog, ToolDefinition, ToolDescriptor};
pub use contract::{Contract, ContractError};
pub use validator::{validate, ValidationResult, Violation};
