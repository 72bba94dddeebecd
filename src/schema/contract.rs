//! The contract tree: a JSON-Schema subset parsed into a tagged enum.
//!
//! Parsing happens once, when the catalog is loaded. Anything the validator
//! could not interpret (unknown `type`, `$ref`, malformed constraint) is
//! rejected here so that validation itself never meets an unsupported kind.

use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

/// Maximum nesting depth accepted for a contract.
pub const MAX_CONTRACT_DEPTH: usize = 64;

/// A parsed value contract.
#[derive(Debug, Clone)]
pub enum Contract {
    /// A JSON object with optional typed properties.
    Object {
        /// Property contracts in declaration order.
        properties: IndexMap<String, Contract>,
        /// Names that must be present.
        required: Vec<String>,
    },
    /// A JSON array.
    Array {
        /// Contract applied to every element (`None` = unconstrained).
        items: Option<Box<Contract>>,
        /// Minimum element count.
        min_items: Option<usize>,
        /// Maximum element count.
        max_items: Option<usize>,
    },
    /// A JSON string.
    String(StringRules),
    /// Any JSON number.
    Number(NumberRules),
    /// A JSON number without a fractional part.
    Integer(NumberRules),
    /// `true` or `false`.
    Boolean,
    /// `null`.
    Null,
    /// One of a fixed set of literal values.
    Enum(Vec<Value>),
}

/// Constraints for string contracts.
#[derive(Debug, Clone, Default)]
pub struct StringRules {
    /// Minimum length in characters.
    pub min_length: Option<usize>,
    /// Maximum length in characters.
    pub max_length: Option<usize>,
    /// Pattern the string must match somewhere.
    pub pattern: Option<Regex>,
}

/// Constraints for number and integer contracts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberRules {
    /// Inclusive lower bound.
    pub minimum: Option<f64>,
    /// Inclusive upper bound.
    pub maximum: Option<f64>,
    /// Exclusive lower bound.
    pub exclusive_minimum: Option<f64>,
    /// Exclusive upper bound.
    pub exclusive_maximum: Option<f64>,
}

/// A schema that could not be turned into a [`Contract`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}{message}", location_prefix(.path))]
pub struct ContractError {
    /// Location inside the schema document (`""` for the root).
    pub path: String,
    /// What is wrong.
    pub message: String,
}

impl ContractError {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

fn location_prefix(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!("{path}: ")
    }
}

impl Contract {
    /// The trivial "any object" contract used when a tool declares no output schema.
    #[must_use]
    pub fn any_object() -> Self {
        Self::Object {
            properties: IndexMap::new(),
            required: Vec::new(),
        }
    }

    /// Parses a JSON-Schema-subset document into a contract tree.
    ///
    /// # Errors
    ///
    /// Returns a [`ContractError`] pointing at the first offending schema
    /// node if the document is not a well-formed contract.
    pub fn from_schema(schema: &Value) -> Result<Self, ContractError> {
        parse_node(schema, "", 0)
    }

    /// Short name of the contract kind, as used in violation messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Object { .. } => "object",
            Self::Array { .. } => "array",
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Integer(_) => "integer",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::Enum(_) => "enum",
        }
    }
}

fn parse_node(schema: &Value, path: &str, depth: usize) -> Result<Contract, ContractError> {
    if depth > MAX_CONTRACT_DEPTH {
        return Err(ContractError::new(
            path,
            format!("schema nesting exceeds {MAX_CONTRACT_DEPTH} levels"),
        ));
    }

    let Some(node) = schema.as_object() else {
        return Err(ContractError::new(path, "schema must be an object"));
    };

    if node.contains_key("$ref") {
        return Err(ContractError::new(path, "'$ref' is not supported"));
    }

    if let Some(allowed) = node.get("enum") {
        let Some(values) = allowed.as_array() else {
            return Err(ContractError::new(path, "'enum' must be an array"));
        };
        if values.is_empty() {
            return Err(ContractError::new(path, "'enum' must not be empty"));
        }
        return Ok(Contract::Enum(values.clone()));
    }

    let kind = match node.get("type") {
        Some(Value::String(kind)) => kind.as_str(),
        Some(Value::Array(_)) => {
            return Err(ContractError::new(path, "union types are not supported"));
        }
        Some(_) => return Err(ContractError::new(path, "'type' must be a string")),
        None => return Err(ContractError::new(path, "missing 'type'")),
    };

    match kind {
        "object" => parse_object(node, path, depth),
        "array" => parse_array(node, path, depth),
        "string" => parse_string(node, path).map(Contract::String),
        "number" => parse_number(node, path).map(Contract::Number),
        "integer" => parse_number(node, path).map(Contract::Integer),
        "boolean" => Ok(Contract::Boolean),
        "null" => Ok(Contract::Null),
        other => Err(ContractError::new(
            path,
            format!("unsupported type '{other}'"),
        )),
    }
}

fn parse_object(
    node: &Map<String, Value>,
    path: &str,
    depth: usize,
) -> Result<Contract, ContractError> {
    let mut properties = IndexMap::new();
    if let Some(props) = node.get("properties") {
        let props_path = child_path(path, "properties");
        let Some(props) = props.as_object() else {
            return Err(ContractError::new(
                &props_path,
                "'properties' must be an object",
            ));
        };
        for (name, sub) in props {
            let contract = parse_node(sub, &child_path(&props_path, name), depth + 1)?;
            properties.insert(name.clone(), contract);
        }
    }

    let mut required = Vec::new();
    if let Some(req) = node.get("required") {
        let Some(names) = req.as_array() else {
            return Err(ContractError::new(path, "'required' must be an array"));
        };
        for name in names {
            let Some(name) = name.as_str() else {
                return Err(ContractError::new(
                    path,
                    "'required' entries must be strings",
                ));
            };
            if !required.iter().any(|r| r == name) {
                required.push(name.to_string());
            }
        }
    }

    Ok(Contract::Object {
        properties,
        required,
    })
}

fn parse_array(
    node: &Map<String, Value>,
    path: &str,
    depth: usize,
) -> Result<Contract, ContractError> {
    let items = match node.get("items") {
        Some(sub) => Some(Box::new(parse_node(
            sub,
            &child_path(path, "items"),
            depth + 1,
        )?)),
        None => None,
    };

    Ok(Contract::Array {
        items,
        min_items: count_keyword(node, "minItems", path)?,
        max_items: count_keyword(node, "maxItems", path)?,
    })
}

fn parse_string(node: &Map<String, Value>, path: &str) -> Result<StringRules, ContractError> {
    let pattern = match node.get("pattern") {
        Some(Value::String(source)) => Some(Regex::new(source).map_err(|e| {
            ContractError::new(path, format!("invalid 'pattern': {e}"))
        })?),
        Some(_) => return Err(ContractError::new(path, "'pattern' must be a string")),
        None => None,
    };

    Ok(StringRules {
        min_length: count_keyword(node, "minLength", path)?,
        max_length: count_keyword(node, "maxLength", path)?,
        pattern,
    })
}

fn parse_number(node: &Map<String, Value>, path: &str) -> Result<NumberRules, ContractError> {
    Ok(NumberRules {
        minimum: number_keyword(node, "minimum", path)?,
        maximum: number_keyword(node, "maximum", path)?,
        exclusive_minimum: number_keyword(node, "exclusiveMinimum", path)?,
        exclusive_maximum: number_keyword(node, "exclusiveMaximum", path)?,
    })
}

fn count_keyword(
    node: &Map<String, Value>,
    keyword: &str,
    path: &str,
) -> Result<Option<usize>, ContractError> {
    match node.get(keyword) {
        None => Ok(None),
        Some(value) => value
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| {
                ContractError::new(
                    path,
                    format!("'{keyword}' must be a non-negative integer"),
                )
            }),
    }
}

fn number_keyword(
    node: &Map<String, Value>,
    keyword: &str,
    path: &str,
) -> Result<Option<f64>, ContractError> {
    match node.get(keyword) {
        None => Ok(None),
        Some(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| ContractError::new(path, format!("'{keyword}' must be a number"))),
    }
}

fn child_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}
