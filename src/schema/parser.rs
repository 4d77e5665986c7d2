//! Protocol document parser
//!
//! Builds a [`Protocol`] from a structured document. Three shapes are
//! accepted and tried in this order:
//!
//! 1. **Split**: top-level `client` / `server` sequences of events.
//! 2. **Unified**: a top-level `events` sequence where every event carries
//!    an explicit `direction`.
//! 3. **Features**: a top-level `features` mapping of feature name to a block
//!    with its own `client` / `server` sequences. Feature events are prefixed
//!    with the lowercased feature name and are additive to (1) or (2).
//!
//! ```rust
//! use eventwire::schema::parse_yaml_str;
//!
//! let protocol = parse_yaml_str(r#"
//! name: chat
//! client:
//!   - name: join
//!     fields:
//!       - { name: room, type: string }
//! server:
//!   - name: joined
//! "#).unwrap();
//!
//! assert_eq!(protocol.events.len(), 2);
//! ```

use super::model::{Direction, Event, Field, Protocol};
use super::SchemaError;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Parse an already-deserialized document
pub fn parse(document: &Value) -> Result<Protocol, SchemaError> {
    let root = as_object(document, "$", "a mapping at the document root")?;
    let name = required_string(root, "$", "name")?;

    let mut events = Vec::new();

    if root.contains_key("client") || root.contains_key("server") {
        events.extend(parse_side(root, "client", Direction::ClientToServer, None)?);
        events.extend(parse_side(root, "server", Direction::ServerToClient, None)?);
    } else if let Some(unified) = root.get("events") {
        for (index, event_value) in as_sequence(unified, "events")?.iter().enumerate() {
            events.push(parse_unified_event(
                event_value,
                &format!("events[{index}]"),
            )?);
        }
    }

    let features = match root.get("features") {
        None | Some(Value::Null) => Map::new(),
        Some(value) => as_object(value, "features", "a mapping of feature blocks")?.clone(),
    };

    for (feature_name, block) in &features {
        let path = format!("features.{feature_name}");
        let block = as_object(block, &path, "a feature block mapping")?;
        let feature = FeatureContext {
            name: feature_name,
            prefix: feature_name.to_lowercase(),
        };
        events.extend(parse_side(
            block,
            "client",
            Direction::ClientToServer,
            Some(&feature),
        )?);
        events.extend(parse_side(
            block,
            "server",
            Direction::ServerToClient,
            Some(&feature),
        )?);
    }

    let protocol = Protocol {
        name,
        version: optional_scalar(root, "$", "version")?,
        events,
        description: optional_string(root, "$", "description")?,
        types: parse_types(root.get("types"))?,
        features,
    };

    debug!(
        protocol = %protocol.name,
        events = protocol.events.len(),
        client_to_server = protocol.client_to_server_events().len(),
        server_to_client = protocol.server_to_client_events().len(),
        "Parsed protocol document"
    );
    crate::observability::metrics().record_protocol_parsed();

    Ok(protocol)
}

/// Parse a YAML document
pub fn parse_yaml_str(content: &str) -> Result<Protocol, SchemaError> {
    let document: Value = serde_yaml::from_str(content)?;
    parse(&document)
}

/// Parse a JSON document
pub fn parse_json_str(content: &str) -> Result<Protocol, SchemaError> {
    let document: Value = serde_json::from_str(content)?;
    parse(&document)
}

/// Parse a file; `.json` files are read as JSON, anything else as YAML
pub fn parse_file(path: &Path) -> Result<Protocol, SchemaError> {
    let content = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        parse_json_str(&content)
    } else {
        parse_yaml_str(&content)
    }
}

impl Protocol {
    /// See [`parse`]
    pub fn from_document(document: &Value) -> Result<Self, SchemaError> {
        parse(document)
    }

    /// See [`parse_yaml_str`]
    pub fn from_yaml(content: &str) -> Result<Self, SchemaError> {
        parse_yaml_str(content)
    }
}

struct FeatureContext<'a> {
    name: &'a str,
    prefix: String,
}

fn parse_side(
    container: &Map<String, Value>,
    key: &str,
    direction: Direction,
    feature: Option<&FeatureContext<'_>>,
) -> Result<Vec<Event>, SchemaError> {
    let base_path = match feature {
        Some(feature) => format!("features.{}.{key}", feature.name),
        None => key.to_string(),
    };

    let Some(value) = container.get(key) else {
        return Ok(Vec::new());
    };

    let mut events = Vec::new();
    for (index, event_value) in as_sequence(value, &base_path)?.iter().enumerate() {
        let path = format!("{base_path}[{index}]");
        let mut event = parse_event_body(event_value, &path, direction)?;

        if let Some(feature) = feature {
            event.name = format!("{}.{}", feature.prefix, event.name);
            if event.handler_group.is_none() {
                event.handler_group = Some(feature.prefix.clone());
            }
            event.feature = Some(feature.name.to_string());
        }
        events.push(event);
    }
    Ok(events)
}

fn parse_unified_event(value: &Value, path: &str) -> Result<Event, SchemaError> {
    let object = as_object(value, path, "an event mapping")?;
    let name = required_string(object, path, "name")?;
    let direction_token = required_string(object, &format!("{path}:{name}"), "direction")?;

    let direction =
        direction_token
            .parse::<Direction>()
            .map_err(|_| SchemaError::InvalidDirection {
                event: name.clone(),
                value: direction_token.clone(),
            })?;

    parse_event_body(value, path, direction)
}

fn parse_event_body(value: &Value, path: &str, direction: Direction) -> Result<Event, SchemaError> {
    let object = as_object(value, path, "an event mapping")?;
    let name = required_string(object, path, "name")?;
    let event_path = format!("{path}:{name}");

    let fields = match object.get("fields") {
        None | Some(Value::Null) => Vec::new(),
        Some(fields) => {
            let fields_path = format!("{event_path}.fields");
            as_sequence(fields, &fields_path)?
                .iter()
                .enumerate()
                .map(|(index, field)| parse_field(field, &format!("{fields_path}[{index}]")))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok(Event {
        name,
        direction,
        fields,
        description: optional_string(object, &event_path, "description")?,
        class_name: optional_string(object, &event_path, "class_name")?,
        handler_group: optional_string(object, &event_path, "handler_group")?,
        feature: None,
    })
}

fn parse_field(value: &Value, path: &str) -> Result<Field, SchemaError> {
    let object = as_object(value, path, "a field mapping")?;
    let name = required_string(object, path, "name")?;
    let field_path = format!("{path}:{name}");
    let type_name = required_string(object, &field_path, "type")?;

    let required = match object.get("required") {
        None | Some(Value::Null) => true,
        Some(Value::Bool(flag)) => *flag,
        Some(_) => {
            return Err(SchemaError::InvalidShape {
                path: format!("{field_path}.required"),
                expected: "a boolean".to_string(),
            })
        }
    };

    let default = match object.get("default") {
        None | Some(Value::Null) => None,
        Some(value) => Some(value.clone()),
    };

    Ok(Field {
        name,
        type_name,
        required,
        default,
        description: optional_string(object, &field_path, "description")?,
        alias: optional_string(object, &field_path, "alias")?,
    })
}

fn parse_types(value: Option<&Value>) -> Result<BTreeMap<String, Vec<String>>, SchemaError> {
    let mut types = BTreeMap::new();
    let Some(value) = value else {
        return Ok(types);
    };
    if value.is_null() {
        return Ok(types);
    }

    for (type_name, values) in as_object(value, "types", "a mapping of enumerations")? {
        let path = format!("types.{type_name}");
        let mut allowed: Vec<String> = Vec::new();
        for entry in as_sequence(values, &path)? {
            let entry = scalar_to_string(entry).ok_or_else(|| SchemaError::InvalidShape {
                path: path.clone(),
                expected: "a sequence of scalar values".to_string(),
            })?;
            if !allowed.contains(&entry) {
                allowed.push(entry);
            }
        }
        types.insert(type_name.clone(), allowed);
    }
    Ok(types)
}

fn as_object<'a>(
    value: &'a Value,
    path: &str,
    expected: &str,
) -> Result<&'a Map<String, Value>, SchemaError> {
    value.as_object().ok_or_else(|| SchemaError::InvalidShape {
        path: path.to_string(),
        expected: expected.to_string(),
    })
}

fn as_sequence<'a>(value: &'a Value, path: &str) -> Result<&'a [Value], SchemaError> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(&[]),
        _ => Err(SchemaError::InvalidShape {
            path: path.to_string(),
            expected: "a sequence".to_string(),
        }),
    }
}

fn required_string(
    object: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<String, SchemaError> {
    match object.get(key) {
        None | Some(Value::Null) => Err(SchemaError::MissingKey {
            path: path.to_string(),
            key: key.to_string(),
        }),
        Some(value) => scalar_to_string(value).ok_or_else(|| SchemaError::InvalidShape {
            path: format!("{path}.{key}"),
            expected: "a string".to_string(),
        }),
    }
}

fn optional_string(
    object: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<Option<String>, SchemaError> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(SchemaError::InvalidShape {
            path: format!("{path}.{key}"),
            expected: "a string".to_string(),
        }),
    }
}

/// Like [`optional_string`] but accepts numbers, since YAML reads `version: 1.0` as a float
fn optional_scalar(
    object: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<Option<String>, SchemaError> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar_to_string(value)
            .map(Some)
            .ok_or_else(|| SchemaError::InvalidShape {
                path: format!("{path}.{key}"),
                expected: "a scalar".to_string(),
            }),
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
