//! Discriminated unions the dispatcher validates against
//!
//! A union is a closed set of message kinds, each with a JSON Schema for its
//! wire object. [`TypedUnion`] wraps a generated Rust enum; [`ProtocolUnion`]
//! is built at runtime straight from a [`Protocol`] and yields
//! [`DynamicMessage`] values.

use super::error::{describe, DispatchError, FieldError};
use crate::codegen::json_schema::event_schema;
use crate::codegen::Side;
use crate::schema::{Protocol, TypeMapper};
use jsonschema::error::ValidationErrorKind;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// Raw input accepted by the dispatchers
#[derive(Debug, Clone)]
pub enum Incoming {
    Text(String),
    Bytes(Vec<u8>),
    Decoded(Value),
}

impl From<&str> for Incoming {
    fn from(text: &str) -> Self {
        Incoming::Text(text.to_string())
    }
}

impl From<String> for Incoming {
    fn from(text: String) -> Self {
        Incoming::Text(text)
    }
}

impl From<&[u8]> for Incoming {
    fn from(bytes: &[u8]) -> Self {
        Incoming::Bytes(bytes.to_vec())
    }
}

impl From<Vec<u8>> for Incoming {
    fn from(bytes: Vec<u8>) -> Self {
        Incoming::Bytes(bytes)
    }
}

impl From<Value> for Incoming {
    fn from(value: Value) -> Self {
        Incoming::Decoded(value)
    }
}

impl Incoming {
    /// Decode into a structured value
    pub fn decode(self) -> Result<Value, DispatchError> {
        let parse_error = |e: serde_json::Error| DispatchError::Parse {
            message: e.to_string(),
        };
        match self {
            Incoming::Text(text) => serde_json::from_str(&text).map_err(parse_error),
            Incoming::Bytes(bytes) => serde_json::from_slice(&bytes).map_err(parse_error),
            Incoming::Decoded(value) => Ok(value),
        }
    }
}

/// Compiled member schemas of a union, in declaration order
pub struct UnionSchema {
    discriminator: String,
    kinds: Vec<String>,
    validators: HashMap<String, jsonschema::Validator>,
}

impl UnionSchema {
    /// Compile one schema per member; duplicate kinds are rejected
    pub fn new<I>(discriminator: impl Into<String>, members: I) -> Result<Self, DispatchError>
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut kinds = Vec::new();
        let mut validators = HashMap::new();

        for (kind, schema) in members {
            if validators.contains_key(&kind) {
                return Err(DispatchError::Schema {
                    message: format!("duplicate discriminator value '{kind}'"),
                });
            }
            let validator =
                jsonschema::validator_for(&schema).map_err(|e| DispatchError::Schema {
                    message: format!("schema for '{kind}' does not compile: {e}"),
                })?;
            kinds.push(kind.clone());
            validators.insert(kind, validator);
        }

        Ok(Self {
            discriminator: discriminator.into(),
            kinds,
            validators,
        })
    }

    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }

    pub fn kinds(&self) -> &[String] {
        &self.kinds
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.validators.contains_key(kind)
    }

    /// Check `value` against the member schema for `kind`
    pub fn validate(&self, kind: &str, value: &Value) -> Result<(), Vec<FieldError>> {
        let Some(validator) = self.validators.get(kind) else {
            return Err(vec![FieldError::new(
                format!("/{}", self.discriminator),
                format!("one of {:?}", self.kinds),
                describe(&Value::String(kind.to_string())),
            )]);
        };

        let errors: Vec<FieldError> = validator
            .iter_errors(value)
            .map(|e| match &e.kind {
                ValidationErrorKind::Required { property } => {
                    let name = property
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| property.to_string());
                    FieldError::new(
                        format!("{}/{}", e.instance_path, name),
                        "required field",
                        "missing",
                    )
                }
                _ => FieldError::new(
                    e.instance_path.to_string(),
                    e.to_string(),
                    describe(&e.instance),
                ),
            })
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl fmt::Debug for UnionSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnionSchema")
            .field("discriminator", &self.discriminator)
            .field("kinds", &self.kinds)
            .finish()
    }
}

/// A closed set of message kinds the dispatcher can decode
pub trait MessageUnion: Send + Sync {
    type Message: Send + 'static;

    fn schema(&self) -> &UnionSchema;

    /// Turn a validated wire object into a message
    fn decode(&self, kind: &str, value: Value) -> Result<Self::Message, DispatchError>;
}

/// A generated union enum
///
/// Implemented by the `ClientMessage`/`ServerMessage` enums the generator
/// emits; hand-written enums work the same way.
pub trait TaggedMessage: DeserializeOwned + Send + 'static {
    /// Every discriminator value, in declaration order
    fn kinds() -> &'static [&'static str];

    fn kind(&self) -> &str;

    /// JSON Schema of the wire object for `kind`
    fn member_schema(kind: &str) -> Option<Value>;

    fn discriminator() -> &'static str {
        "type"
    }
}

/// Union backed by a [`TaggedMessage`] enum
pub struct TypedUnion<M> {
    schema: UnionSchema,
    _message: PhantomData<fn() -> M>,
}

impl<M: TaggedMessage> TypedUnion<M> {
    pub fn new() -> Result<Self, DispatchError> {
        let members = M::kinds().iter().map(|kind| {
            let schema = M::member_schema(kind).unwrap_or_else(|| Value::Object(Map::new()));
            (kind.to_string(), schema)
        });
        Ok(Self {
            schema: UnionSchema::new(M::discriminator(), members)?,
            _message: PhantomData,
        })
    }
}

impl<M: TaggedMessage> MessageUnion for TypedUnion<M> {
    type Message = M;

    fn schema(&self) -> &UnionSchema {
        &self.schema
    }

    fn decode(&self, kind: &str, value: Value) -> Result<M, DispatchError> {
        serde_json::from_value(value).map_err(|e| {
            DispatchError::validation(
                format!("'{kind}' does not decode: {e}"),
                vec![FieldError::new(
                    "",
                    std::any::type_name::<M>(),
                    e.to_string(),
                )],
            )
        })
    }
}

/// Message decoded through a [`ProtocolUnion`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DynamicMessage {
    pub kind: String,
    /// The whole wire object, defaults filled in
    pub payload: Map<String, Value>,
}

impl DynamicMessage {
    /// Field by wire name
    pub fn get(&self, wire_name: &str) -> Option<&Value> {
        self.payload.get(wire_name)
    }

    pub fn get_str(&self, wire_name: &str) -> Option<&str> {
        self.get(wire_name).and_then(Value::as_str)
    }
}

/// Union built at runtime from the events one side receives
#[derive(Debug)]
pub struct ProtocolUnion {
    schema: UnionSchema,
    defaults: HashMap<String, Vec<(String, Value)>>,
}

impl ProtocolUnion {
    /// Union of everything `side` receives, discriminated by `type`
    pub fn new(protocol: &Protocol, side: Side) -> Result<Self, DispatchError> {
        Self::with_discriminator(protocol, side, "type")
    }

    pub fn with_discriminator(
        protocol: &Protocol,
        side: Side,
        discriminator: &str,
    ) -> Result<Self, DispatchError> {
        let events = match side {
            Side::Server => protocol.client_to_server_events(),
            Side::Client => protocol.server_to_client_events(),
        };
        let mapper = TypeMapper::new(protocol);

        let mut members = Vec::with_capacity(events.len());
        let mut defaults = HashMap::new();
        for event in events {
            let schema =
                event_schema(event, &mapper, discriminator).map_err(|e| DispatchError::Schema {
                    message: format!("event '{}': {e}", event.name),
                })?;
            members.push((event.name.clone(), schema));

            let mut filled = Vec::new();
            for field in event.fields.iter().filter(|f| !f.required) {
                let Some(default) = &field.default else {
                    continue;
                };
                let fits = mapper
                    .resolve(field)
                    .is_ok_and(|resolved| mapper.accepts(&resolved.expr, default));
                if !fits {
                    return Err(DispatchError::Schema {
                        message: format!(
                            "event '{}' field '{}': default {default} does not match type '{}'",
                            event.name, field.name, field.type_name
                        ),
                    });
                }
                filled.push((field.wire_name().to_string(), default.clone()));
            }
            defaults.insert(event.name.clone(), filled);
        }

        Ok(Self {
            schema: UnionSchema::new(discriminator, members)?,
            defaults,
        })
    }
}

impl MessageUnion for ProtocolUnion {
    type Message = DynamicMessage;

    fn schema(&self) -> &UnionSchema {
        &self.schema
    }

    fn decode(&self, kind: &str, value: Value) -> Result<DynamicMessage, DispatchError> {
        let Value::Object(mut payload) = value else {
            return Err(DispatchError::validation(
                "expected a JSON object",
                vec![FieldError::new("", "object", describe(&value))],
            ));
        };
        for (name, default) in self.defaults.get(kind).into_iter().flatten() {
            if !payload.contains_key(name) {
                payload.insert(name.clone(), default.clone());
            }
        }
        Ok(DynamicMessage {
            kind: kind.to_string(),
            payload,
        })
    }
}
