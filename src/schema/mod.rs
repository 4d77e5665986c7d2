//! Protocol schema: model, document parser, and type mapper

pub mod model;
pub mod parser;
pub mod types;

pub use model::{Direction, Event, Field, Protocol};
pub use parser::{parse, parse_file, parse_json_str, parse_yaml_str};
pub use types::{Primitive, ResolvedType, TypeError, TypeExpr, TypeMapper};

use thiserror::Error;

/// Malformed protocol document
///
/// Paths locate the problem inside the document, e.g.
/// `client[0]:join.fields[1]:room`.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Missing required key '{key}' at {path}")]
    MissingKey { path: String, key: String },

    #[error("Invalid direction '{value}' for event '{event}' (expected client_to_server, server_to_client or bidirectional)")]
    InvalidDirection { event: String, value: String },

    #[error("Invalid value at {path}: expected {expected}")]
    InvalidShape { path: String, expected: String },

    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to read protocol file: {0}")]
    Io(#[from] std::io::Error),
}
