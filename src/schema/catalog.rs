//! The tool catalog: descriptors loaded from a declarative JSON document.
//!
//! ```json
//! {
//!   "name": "demo-server",
//!   "tools": [
//!     {
//!       "name": "echo",
//!       "description": "Returns its arguments",
//!       "inputSchema": { "type": "object", "properties": { "text": { "type": "string" } } },
//!       "outputSchema": { "type": "object" }
//!     }
//!   ]
//! }
//! ```
//!
//! The catalog is immutable once loaded and keeps declaration order for
//! discovery responses.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::contract::{Contract, ContractError};
use crate::error::SchemaLoadError;

/// A tool advertised by the server.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    name: String,
    description: String,
    input_schema: Value,
    output_schema: Value,
    input: Contract,
    output: Contract,
}

impl ToolDescriptor {
    /// Unique tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Parsed input contract.
    #[must_use]
    pub const fn input(&self) -> &Contract {
        &self.input
    }

    /// Parsed output contract.
    #[must_use]
    pub const fn output(&self) -> &Contract {
        &self.output
    }

    /// The input schema exactly as declared.
    #[must_use]
    pub const fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    /// The output schema as declared, or `{"type": "object"}` if none was.
    #[must_use]
    pub const fn output_schema(&self) -> &Value {
        &self.output_schema
    }

    /// Wire form used in discovery responses.
    #[must_use]
    pub fn to_definition(&self) -> ToolDefinition<'_> {
        ToolDefinition {
            name: &self.name,
            description: &self.description,
            input_schema: &self.input_schema,
            output_schema: &self.output_schema,
        }
    }
}

/// A tool definition for `list_tools` responses.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition<'a> {
    /// Unique tool name.
    pub name: &'a str,
    /// Human-readable description.
    pub description: &'a str,
    /// JSON Schema for the tool's input.
    pub input_schema: &'a Value,
    /// JSON Schema for the tool's output.
    pub output_schema: &'a Value,
}

#[derive(Deserialize)]
struct CatalogDocument {
    name: String,
    tools: Vec<ToolEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolEntry {
    name: String,
    #[serde(default)]
    description: String,
    input_schema: Value,
    #[serde(default)]
    output_schema: Option<Value>,
}

/// The ordered set of tool descriptors a server instance advertises.
#[derive(Debug, Clone)]
pub struct Catalog {
    name: String,
    tools: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Reads and parses a catalog file.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaLoadError::Read`] if the file cannot be read, or any
    /// error [`Catalog::from_json`] can return.
    pub fn load(path: &Path) -> Result<Self, SchemaLoadError> {
        let contents = std::fs::read_to_string(path).map_err(|e| SchemaLoadError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&contents)
    }

    /// Parses a catalog document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed, a tool name repeats,
    /// or a schema is not a well-formed contract.
    pub fn from_json(json: &str) -> Result<Self, SchemaLoadError> {
        let document: CatalogDocument =
            serde_json::from_str(json).map_err(|e| SchemaLoadError::Parse { source: e })?;
        Self::from_document(document)
    }

    /// Parses a catalog from an already decoded JSON value.
    ///
    /// # Errors
    ///
    /// Same as [`Catalog::from_json`].
    pub fn from_value(value: Value) -> Result<Self, SchemaLoadError> {
        let document: CatalogDocument =
            serde_json::from_value(value).map_err(|e| SchemaLoadError::Parse { source: e })?;
        Self::from_document(document)
    }

    fn from_document(document: CatalogDocument) -> Result<Self, SchemaLoadError> {
        if document.name.trim().is_empty() {
            return Err(SchemaLoadError::Malformed {
                message: "server name must not be empty".to_string(),
            });
        }

        let mut tools = Vec::with_capacity(document.tools.len());
        let mut index = HashMap::with_capacity(document.tools.len());

        for entry in document.tools {
            if entry.name.trim().is_empty() {
                return Err(SchemaLoadError::Malformed {
                    message: format!("tool #{} has an empty name", tools.len() + 1),
                });
            }
            if index.contains_key(&entry.name) {
                return Err(SchemaLoadError::DuplicateTool { name: entry.name });
            }

            let input = Contract::from_schema(&entry.input_schema)
                .map_err(|e| invalid_contract(&entry.name, "inputSchema", e))?;
            let (output_schema, output) = match entry.output_schema {
                Some(schema) => {
                    let output = Contract::from_schema(&schema)
                        .map_err(|e| invalid_contract(&entry.name, "outputSchema", e))?;
                    (schema, output)
                }
                None => (json!({"type": "object"}), Contract::any_object()),
            };

            index.insert(entry.name.clone(), tools.len());
            tools.push(ToolDescriptor {
                name: entry.name,
                description: entry.description,
                input_schema: entry.input_schema,
                output_schema,
                input,
                output,
            });
        }

        tracing::debug!(server = %document.name, tools = tools.len(), "Tool catalog loaded");

        Ok(Self {
            name: document.name,
            tools,
            index,
        })
    }

    /// Server name declared by the catalog.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up a tool by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    /// All tools in declaration order.
    #[must_use]
    pub fn list(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// Number of declared tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if the catalog declares no tools.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn invalid_contract(tool: &str, field: &'static str, error: ContractError) -> SchemaLoadError {
    SchemaLoadError::InvalidContract {
        tool: tool.to_string(),
        field,
        path: error.path,
        message: error.message,
    }
}
