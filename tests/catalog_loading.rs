//! Catalog loading from disk and startup-time rejection of bad catalogs.

use std::io::Write;

use serde_json::{json, Value};
use tempfile::NamedTempFile;

use mcp_tool_server::error::SchemaLoadError;
use mcp_tool_server::schema::{validate, Catalog};

fn write_catalog(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_catalog_from_file() {
    let file = write_catalog(
        r#"{
            "name": "weather",
            "tools": [
                {
                    "name": "get_weather",
                    "description": "Forecast for a location",
                    "inputSchema": {
                        "type": "object",
                        "properties": {
                            "query": { "type": "string" },
                            "units": { "enum": ["metric", "imperial"] }
                        },
                        "required": ["query"]
                    }
                },
                {
                    "name": "search_locations",
                    "description": "Find matching places",
                    "inputSchema": {
                        "type": "object",
                        "properties": { "query": { "type": "string", "minLength": 2 } },
                        "required": ["query"]
                    },
                    "outputSchema": {
                        "type": "object",
                        "properties": {
                            "locations": {
                                "type": "array",
                                "items": {
                                    "type": "object",
                                    "properties": { "name": { "type": "string" } },
                                    "required": ["name"]
                                }
                            }
                        }
                    }
                }
            ]
        }"#,
    );

    let catalog = Catalog::load(file.path()).unwrap();
    assert_eq!(catalog.name(), "weather");

    let names: Vec<&str> = catalog.list().iter().map(|t| t.name()).collect();
    assert_eq!(names, ["get_weather", "search_locations"]);

    let weather = catalog.lookup("get_weather").unwrap();
    assert_eq!(weather.output_schema(), &json!({"type": "object"}));
    assert!(validate(&json!({"query": "Oslo", "units": "metric"}), weather.input()).is_valid());
    assert!(!validate(&json!({"query": "Oslo", "units": "kelvin"}), weather.input()).is_valid());

    let search = catalog.lookup("search_locations").unwrap();
    let result = validate(
        &json!({"locations": [{"name": "Paris"}, {"country": "FR"}]}),
        search.output(),
    );
    let paths: Vec<&str> = result.violations().iter().map(|v| v.path.as_str()).collect();
    assert_eq!(paths, ["locations[1].name"]);
}

#[test]
fn test_missing_file_is_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Catalog::load(&dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, SchemaLoadError::Read { .. }));
}

#[test]
fn test_rejects_invalid_json() {
    let file = write_catalog("{ not json");
    let err = Catalog::load(file.path()).unwrap_err();
    assert!(matches!(err, SchemaLoadError::Parse { .. }));
}

#[test]
fn test_rejects_duplicate_tool_names() {
    let file = write_catalog(
        r#"{"name": "dup", "tools": [
            {"name": "echo", "inputSchema": {"type": "object"}},
            {"name": "echo", "inputSchema": {"type": "object"}}
        ]}"#,
    );
    let err = Catalog::load(file.path()).unwrap_err();
    assert!(matches!(err, SchemaLoadError::DuplicateTool { ref name } if name == "echo"));
}

#[test]
fn test_rejects_unsupported_contracts() {
    let bad_schemas: [Value; 4] = [
        json!({"type": "tuple"}),
        json!({"type": ["string", "null"]}),
        json!({"$ref": "#/definitions/thing"}),
        json!({"type": "string", "pattern": "(unclosed"}),
    ];

    for schema in bad_schemas {
        let document = json!({
            "name": "bad",
            "tools": [{"name": "t", "inputSchema": schema}]
        });
        let file = write_catalog(&document.to_string());
        let err = Catalog::load(file.path()).unwrap_err();
        assert!(
            matches!(err, SchemaLoadError::InvalidContract { field: "inputSchema", .. }),
            "expected InvalidContract for {document}, got {err:?}"
        );
    }
}

#[test]
fn test_bundled_catalog_is_well_formed() {
    let catalog = Catalog::from_json(mcp_tool_server::tools::BUILTIN_CATALOG).unwrap();
    assert_eq!(catalog.len(), 2);
    assert!(catalog.lookup("echo").is_some());
    assert!(catalog.lookup("delay").is_some());
}
