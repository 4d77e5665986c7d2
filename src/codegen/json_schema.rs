//! JSON Schema for individual events
//!
//! The same document is embedded into generated Rust unions and used by
//! [`crate::dispatch::ProtocolUnion`] at runtime, so both validate identically.

use crate::schema::{Event, Field, Primitive, TypeError, TypeExpr, TypeMapper};
use serde_json::{json, Map, Value};

/// Schema of one event's wire object, discriminator included
pub fn event_schema(
    event: &Event,
    mapper: &TypeMapper<'_>,
    discriminator: &str,
) -> Result<Value, TypeError> {
    let mut properties = Map::new();
    let mut required = vec![Value::String(discriminator.to_string())];

    properties.insert(discriminator.to_string(), json!({ "const": event.name }));

    for field in &event.fields {
        properties.insert(field.wire_name().to_string(), field_schema(field, mapper)?);
        if field.required {
            required.push(Value::String(field.wire_name().to_string()));
        }
    }

    Ok(json!({
        "title": event.class_name(),
        "type": "object",
        "properties": properties,
        "required": required,
    }))
}

fn field_schema(field: &Field, mapper: &TypeMapper<'_>) -> Result<Value, TypeError> {
    let resolved = mapper.resolve(field)?;
    let mut schema = type_schema(&resolved.expr, mapper);

    if resolved.nullable {
        schema = json!({ "anyOf": [schema, { "type": "null" }] });
    }
    if let (Some(description), Value::Object(object)) = (&field.description, &mut schema) {
        object.insert("description".to_string(), json!(description));
    }
    if let (Some(default), Value::Object(object)) = (&field.default, &mut schema) {
        if !field.required {
            object.insert("default".to_string(), default.clone());
        }
    }
    Ok(schema)
}

fn type_schema(expr: &TypeExpr, mapper: &TypeMapper<'_>) -> Value {
    match expr {
        TypeExpr::Primitive(Primitive::String) => json!({ "type": "string" }),
        TypeExpr::Primitive(Primitive::Integer) => json!({ "type": "integer" }),
        TypeExpr::Primitive(Primitive::Float) => json!({ "type": "number" }),
        TypeExpr::Primitive(Primitive::Bool) => json!({ "type": "boolean" }),
        TypeExpr::Primitive(Primitive::Unit) => json!({ "type": "null" }),
        TypeExpr::Primitive(Primitive::Any) => json!({}),
        TypeExpr::Enum(name) => {
            let values = mapper.enum_values(name).unwrap_or_default();
            json!({ "type": "string", "enum": values })
        }
        TypeExpr::List(item) => json!({ "type": "array", "items": type_schema(item, mapper) }),
        TypeExpr::Map(key, value) => {
            let mut schema =
                json!({ "type": "object", "additionalProperties": type_schema(value, mapper) });
            let names = match key.as_ref() {
                TypeExpr::Primitive(Primitive::Integer) => Some(json!({ "pattern": "^-?[0-9]+$" })),
                TypeExpr::Enum(name) => {
                    Some(json!({ "enum": mapper.enum_values(name).unwrap_or_default() }))
                }
                _ => None,
            };
            if let (Some(names), Value::Object(object)) = (names, &mut schema) {
                object.insert("propertyNames".to_string(), names);
            }
            schema
        }
        // Types authored directly in the schema are opaque here
        TypeExpr::Raw(_) => json!({}),
    }
}
