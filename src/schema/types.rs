//! Type mapper: abstract field type tokens to target-neutral type expressions
//!
//! Resolution order for a token:
//! 1. primitive aliases (`string`, `integer`, `number`, `boolean`, `any`, `null`, ...)
//! 2. custom enumerations declared under the protocol's `types`
//! 3. structural composites (`list[T]`, `T[]`, `dict[K, V]`)
//! 4. anything else passes through unchanged
//!
//! The nullable flag is applied afterwards: optional fields without a default
//! always resolve to a nullable type.

use super::model::{Field, Protocol};
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    String,
    Integer,
    Float,
    Bool,
    /// Any JSON value
    Any,
    /// Only `null`
    Unit,
}

impl Primitive {
    pub fn from_alias(token: &str) -> Option<Self> {
        match token.to_lowercase().as_str() {
            "str" | "string" => Some(Primitive::String),
            "int" | "integer" => Some(Primitive::Integer),
            "float" | "number" => Some(Primitive::Float),
            "bool" | "boolean" => Some(Primitive::Bool),
            "any" => Some(Primitive::Any),
            "none" | "null" => Some(Primitive::Unit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Primitive(Primitive),
    /// Custom enumeration, by its protocol type name
    Enum(String),
    List(Box<TypeExpr>),
    /// JSON object; keys are strings on the wire and may be read as
    /// integers or enumeration values
    Map(Box<TypeExpr>, Box<TypeExpr>),
    /// Authored verbatim in the schema, emitted unchanged
    Raw(String),
}

/// Outcome of resolving a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedType {
    pub expr: TypeExpr,
    pub nullable: bool,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot resolve type '{token}': {reason}")]
pub struct TypeError {
    pub token: String,
    pub reason: String,
}

impl TypeError {
    fn new(token: &str, reason: &str) -> Self {
        Self {
            token: token.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Resolves type tokens against one protocol's custom types
#[derive(Debug, Clone, Copy)]
pub struct TypeMapper<'a> {
    custom_types: &'a BTreeMap<String, Vec<String>>,
}

impl<'a> TypeMapper<'a> {
    pub fn new(protocol: &'a Protocol) -> Self {
        Self {
            custom_types: &protocol.types,
        }
    }

    pub fn with_types(custom_types: &'a BTreeMap<String, Vec<String>>) -> Self {
        Self { custom_types }
    }

    /// Allowed values of a custom enumeration
    pub fn enum_values(&self, name: &str) -> Option<&'a [String]> {
        self.custom_types.get(name).map(Vec::as_slice)
    }

    /// Resolve a field, applying the nullable rule
    pub fn resolve(&self, field: &Field) -> Result<ResolvedType, TypeError> {
        Ok(ResolvedType {
            expr: self.resolve_token(&field.type_name)?,
            nullable: field.is_nullable(),
        })
    }

    /// Resolve a bare type token
    pub fn resolve_token(&self, token: &str) -> Result<TypeExpr, TypeError> {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(TypeError::new(token, "empty type"));
        }
        if !brackets_balanced(trimmed) {
            return Err(TypeError::new(token, "unbalanced brackets"));
        }

        if let Some(primitive) = Primitive::from_alias(trimmed) {
            return Ok(TypeExpr::Primitive(primitive));
        }
        if self.custom_types.contains_key(trimmed) {
            return Ok(TypeExpr::Enum(trimmed.to_string()));
        }
        if let Some(inner) = trimmed.strip_suffix("[]") {
            return Ok(TypeExpr::List(Box::new(self.resolve_token(inner)?)));
        }
        if let Some((head, args)) = split_generic(trimmed) {
            match head.to_lowercase().as_str() {
                "list" | "array" | "sequence" => {
                    let [item] = args.as_slice() else {
                        return Err(TypeError::new(
                            token,
                            "list takes exactly one type argument",
                        ));
                    };
                    return Ok(TypeExpr::List(Box::new(self.resolve_token(item)?)));
                }
                "dict" | "map" | "mapping" => {
                    return match args.as_slice() {
                        [value] => Ok(TypeExpr::Map(
                            Box::new(TypeExpr::Primitive(Primitive::String)),
                            Box::new(self.resolve_token(value)?),
                        )),
                        [key, value] => {
                            let key = self.resolve_token(key)?;
                            if !matches!(
                                key,
                                TypeExpr::Primitive(Primitive::String | Primitive::Integer)
                                    | TypeExpr::Enum(_)
                            ) {
                                return Err(TypeError::new(
                                    token,
                                    "mapping keys must be strings, integers or enumerations",
                                ));
                            }
                            Ok(TypeExpr::Map(
                                Box::new(key),
                                Box::new(self.resolve_token(value)?),
                            ))
                        }
                        _ => Err(TypeError::new(
                            token,
                            "mapping takes one or two type arguments",
                        )),
                    };
                }
                _ => {}
            }
        }

        Ok(TypeExpr::Raw(trimmed.to_string()))
    }

    /// Whether `value` is an instance of `expr`
    ///
    /// Raw pass-through types are opaque and accept nothing.
    pub fn accepts(&self, expr: &TypeExpr, value: &Value) -> bool {
        match (expr, value) {
            (TypeExpr::Primitive(Primitive::Any), _) => true,
            (TypeExpr::Primitive(Primitive::String), Value::String(_)) => true,
            (TypeExpr::Primitive(Primitive::Integer), Value::Number(n)) => n.is_i64(),
            (TypeExpr::Primitive(Primitive::Float), Value::Number(_)) => true,
            (TypeExpr::Primitive(Primitive::Bool), Value::Bool(_)) => true,
            (TypeExpr::Primitive(Primitive::Unit), Value::Null) => true,
            (TypeExpr::Enum(name), Value::String(s)) => self.is_enum_value(name, s),
            (TypeExpr::List(item), Value::Array(items)) => {
                items.iter().all(|v| self.accepts(item, v))
            }
            (TypeExpr::Map(key, item), Value::Object(entries)) => entries
                .iter()
                .all(|(k, v)| self.accepts_key(key, k) && self.accepts(item, v)),
            _ => false,
        }
    }

    /// Whether the object key `key` can be read as `expr`
    pub fn accepts_key(&self, expr: &TypeExpr, key: &str) -> bool {
        match expr {
            TypeExpr::Primitive(Primitive::String) => true,
            TypeExpr::Primitive(Primitive::Integer) => key.parse::<i64>().is_ok(),
            TypeExpr::Enum(name) => self.is_enum_value(name, key),
            _ => false,
        }
    }

    fn is_enum_value(&self, name: &str, value: &str) -> bool {
        self.enum_values(name)
            .is_some_and(|values| values.iter().any(|v| v == value))
    }
}

fn brackets_balanced(token: &str) -> bool {
    let mut stack = Vec::new();
    for ch in token.chars() {
        match ch {
            '[' | '<' | '(' => stack.push(ch),
            ']' | '>' | ')' => {
                let expected = match ch {
                    ']' => '[',
                    '>' => '<',
                    _ => '(',
                };
                if stack.pop() != Some(expected) {
                    return false;
                }
            }
            _ => {}
        }
    }
    stack.is_empty()
}

/// `list[str]` -> (`list`, [`str`]); `dict<str, int>` -> (`dict`, [`str`, `int`])
fn split_generic(token: &str) -> Option<(&str, Vec<&str>)> {
    let open = token.find(['[', '<'])?;
    let close = match token.as_bytes()[open] {
        b'[' => ']',
        _ => '>',
    };
    if !token.ends_with(close) || open == 0 {
        return None;
    }

    let head = token[..open].trim();
    let inner = &token[open + 1..token.len() - 1];

    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (index, ch) in inner.char_indices() {
        match ch {
            '[' | '<' | '(' => depth += 1,
            ']' | '>' | ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                args.push(inner[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
    }
    args.push(inner[start..].trim());

    if args.iter().any(|arg| arg.is_empty()) {
        return None;
    }
    Some((head, args))
}
