//! In-memory protocol model
//!
//! A [`Protocol`] owns its events and every event owns its fields. The model
//! is built once (by the parser or the builder methods below) and is treated
//! as read-only afterwards, so it can be shared freely between threads.

use crate::codegen::naming;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::SchemaError;

/// Which party may originate an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    ClientToServer,
    ServerToClient,
    Bidirectional,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::ClientToServer => "client_to_server",
            Direction::ServerToClient => "server_to_client",
            Direction::Bidirectional => "bidirectional",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "client_to_server" => Ok(Direction::ClientToServer),
            "server_to_client" => Ok(Direction::ServerToClient),
            "bidirectional" => Ok(Direction::Bidirectional),
            _ => Err(SchemaError::InvalidDirection {
                event: String::new(),
                value: s.to_string(),
            }),
        }
    }
}

/// One field of an event payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// In-code field name
    pub name: String,
    /// Abstract type token, resolved by [`super::TypeMapper`]
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default = "default_required")]
    pub required: bool,
    /// Only meaningful when `required` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Wire name override, e.g. `from` for a field named `sender`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

fn default_required() -> bool {
    true
}

impl Field {
    /// Required field of the given type
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            required: true,
            default: None,
            description: None,
            alias: None,
        }
    }

    /// Optional field without a default (resolves to a nullable type)
    pub fn optional(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::new(name, type_name)
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.required = false;
        self.default = if default.is_null() {
            None
        } else {
            Some(default)
        };
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Name used on the wire
    pub fn wire_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Optional with no default: the resolved type must accept null
    pub fn is_nullable(&self) -> bool {
        !self.required && self.default.is_none()
    }
}

/// One named message kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Discriminator value, unique across the protocol (e.g. `chat.message`)
    pub name: String,
    pub direction: Direction,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler_group: Option<String>,
    /// Feature block this event was declared in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
}

impl Event {
    pub fn new(name: impl Into<String>, direction: Direction) -> Self {
        Self {
            name: name.into(),
            direction,
            fields: Vec::new(),
            description: None,
            class_name: None,
            handler_group: None,
            feature: None,
        }
    }

    pub fn with_fields(mut self, fields: Vec<Field>) -> Self {
        self.fields = fields;
        self
    }

    /// Type name for generated code: the override, or PascalCase of the name
    ///
    /// `user_joined` becomes `UserJoined`, `chat.message` becomes `ChatMessage`.
    pub fn class_name(&self) -> String {
        match &self.class_name {
            Some(name) => name.clone(),
            None => naming::pascal_case(&self.name),
        }
    }

    /// Name of the handler slot for this event, e.g. `on_chat_message`
    pub fn handler_slot(&self) -> String {
        naming::handler_slot(&self.name)
    }

    pub fn is_client_to_server(&self) -> bool {
        matches!(
            self.direction,
            Direction::ClientToServer | Direction::Bidirectional
        )
    }

    pub fn is_server_to_client(&self) -> bool {
        matches!(
            self.direction,
            Direction::ServerToClient | Direction::Bidirectional
        )
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A complete protocol definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Protocol {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Custom enumerations: type name -> allowed string values
    #[serde(default)]
    pub types: BTreeMap<String, Vec<String>>,
    /// Raw feature blocks in declaration order
    #[serde(default)]
    pub features: Map<String, Value>,
}

impl Protocol {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            events: Vec::new(),
            description: None,
            types: BTreeMap::new(),
            features: Map::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declare a custom enumeration
    pub fn with_type<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut allowed: Vec<String> = Vec::new();
        for value in values {
            let value = value.into();
            if !allowed.contains(&value) {
                allowed.push(value);
            }
        }
        self.types.insert(name.into(), allowed);
        self
    }

    /// Append an event (builder style)
    pub fn add_event(
        mut self,
        name: impl Into<String>,
        direction: Direction,
        fields: Vec<Field>,
    ) -> Self {
        self.events
            .push(Event::new(name, direction).with_fields(fields));
        self
    }

    /// Append a fully built event
    pub fn push_event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    pub fn event(&self, name: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.name == name)
    }

    /// Events the client may send, in authored order
    pub fn client_to_server_events(&self) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.is_client_to_server())
            .collect()
    }

    /// Events the server may send, in authored order
    pub fn server_to_client_events(&self) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.is_server_to_client())
            .collect()
    }

    /// Handler group an event belongs to; ungrouped events use the protocol name
    pub fn group_of<'a>(&'a self, event: &'a Event) -> &'a str {
        event.handler_group.as_deref().unwrap_or(&self.name)
    }

    /// Distinct handler groups of the given events, in first-appearance order
    pub fn handler_groups<'a>(&'a self, events: &[&'a Event]) -> Vec<&'a str> {
        let mut groups: Vec<&str> = Vec::new();
        for event in events {
            let group = self.group_of(event);
            if !groups.contains(&group) {
                groups.push(group);
            }
        }
        groups
    }
}
