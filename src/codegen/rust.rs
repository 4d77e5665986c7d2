//! Rust artifact emitter
//!
//! Message structs are plain serde types; unions are internally tagged enums
//! implementing [`crate::dispatch::TaggedMessage`] so they plug straight into a
//! [`crate::dispatch::TypedUnion`]. Handler traits use `async_trait` with no-op
//! default slots, and each group gets a `register_*` function that fills an
//! [`crate::registry::EventRegistry`].

use super::json_schema::event_schema;
use super::naming::{self, quoted};
use super::writer::{rust_raw_string, SourceWriter};
use super::{Generator, Side};
use crate::schema::{Event, Field, Primitive, Protocol, ResolvedType, TypeExpr, TypeMapper};
use serde_json::Value;

pub struct RustEmitter<'g> {
    protocol: &'g Protocol,
    mapper: TypeMapper<'g>,
    discriminator: &'g str,
}

impl<'g> RustEmitter<'g> {
    pub fn new(generator: &'g Generator<'_>) -> Self {
        let protocol = generator.protocol();
        Self {
            protocol,
            mapper: TypeMapper::new(protocol),
            discriminator: generator.discriminator(),
        }
    }

    /// Everything in one module: types, unions, and both sides' handlers
    pub fn combined(&self) -> String {
        let mut w = SourceWriter::new("    ");
        self.header(&mut w);
        w.comment(
            "//!",
            &format!(
                "Protocol `{}`: messages, unions, and handler slots.",
                self.protocol.name
            ),
        );
        w.blank();

        if self.has_message_types() {
            w.line("use serde::{Deserialize, Serialize};");
        }
        if !self.side_events(Side::Server).is_empty() || !self.side_events(Side::Client).is_empty()
        {
            w.line("use async_trait::async_trait;");
            w.line("use eventwire::registry::{EventRegistry, HandlerType};");
        }
        w.blank();

        self.message_items(&mut w);
        for side in [Side::Server, Side::Client] {
            self.handler_items(&mut w, side);
        }
        w.finish()
    }

    /// `mod.rs` of one artifact group
    pub fn module_root(&self, side: Side) -> String {
        let mut w = SourceWriter::new("    ");
        self.header(&mut w);
        let role = match side {
            Side::Server => "Server-side",
            Side::Client => "Client-side",
        };
        w.comment(
            "//!",
            &format!("{role} artifacts for protocol `{}`.", self.protocol.name),
        );
        w.blank();
        w.line("pub mod handlers;");
        w.line("pub mod messages;");
        w.blank();
        w.line("pub use handlers::*;");
        w.line("pub use messages::*;");
        w.finish()
    }

    /// `messages.rs`: enums, message structs, and unions
    pub fn messages(&self) -> String {
        let mut w = SourceWriter::new("    ");
        self.header(&mut w);
        if self.has_message_types() {
            w.line("use serde::{Deserialize, Serialize};");
            w.blank();
        }
        self.message_items(&mut w);
        w.finish()
    }

    /// `handlers.rs`: handler traits and registration helpers for one side
    pub fn handlers_module(&self, side: Side) -> String {
        let mut w = SourceWriter::new("    ");
        self.header(&mut w);
        if self.side_events(side).is_empty() {
            w.line(format!(
                "// Protocol `{}` defines no events for this side.",
                self.protocol.name
            ));
            return w.finish();
        }
        w.line("use super::messages::*;");
        w.line("use async_trait::async_trait;");
        w.line("use eventwire::registry::{EventRegistry, HandlerType};");
        w.blank();
        self.handler_items(&mut w, side);
        w.finish()
    }

    fn header(&self, w: &mut SourceWriter) {
        let version = match &self.protocol.version {
            Some(version) => format!(" (version {version})"),
            None => String::new(),
        };
        w.line(format!(
            "// @generated by eventwire from protocol `{}`{version}. Do not edit by hand.",
            self.protocol.name
        ));
        w.blank();
    }

    fn has_message_types(&self) -> bool {
        !self.protocol.types.is_empty() || !self.protocol.events.is_empty()
    }

    fn side_events(&self, side: Side) -> Vec<&'g Event> {
        match side {
            Side::Server => self.protocol.client_to_server_events(),
            Side::Client => self.protocol.server_to_client_events(),
        }
    }

    fn message_items(&self, w: &mut SourceWriter) {
        for (name, values) in &self.protocol.types {
            self.enum_item(w, name, values);
        }
        for event in &self.protocol.events {
            self.struct_item(w, event);
        }
        self.union_item(
            w,
            "ClientMessage",
            "Messages the client may send.",
            Side::Server,
        );
        self.union_item(
            w,
            "ServerMessage",
            "Messages the server may send.",
            Side::Client,
        );
    }

    fn enum_item(&self, w: &mut SourceWriter, name: &str, values: &[String]) {
        let type_name = naming::pascal_case(name);
        w.line(format!("/// Allowed values of `{name}`."));
        w.line("#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]");
        w.open(format!("pub enum {type_name} {{"));
        for value in values {
            w.line(format!("#[serde(rename = {})]", quoted(value)));
            w.line(format!("{},", naming::pascal_case(value)));
        }
        w.close("}");
        w.blank();

        if values.is_empty() {
            return;
        }
        w.open(format!("impl {type_name} {{"));
        let listed: Vec<String> = values.iter().map(|v| quoted(v)).collect();
        w.line(format!(
            "pub const VALUES: &'static [&'static str] = &[{}];",
            listed.join(", ")
        ));
        w.blank();
        w.open("pub fn as_str(&self) -> &'static str {");
        w.open("match self {");
        for value in values {
            w.line(format!(
                "{type_name}::{} => {},",
                naming::pascal_case(value),
                quoted(value)
            ));
        }
        w.close("}");
        w.close("}");
        w.close("}");
        w.blank();
    }

    fn struct_item(&self, w: &mut SourceWriter, event: &Event) {
        let class_name = event.class_name();

        if let Some(description) = &event.description {
            w.comment("///", description);
            w.line("///");
        }
        w.line(format!(
            "/// Wire discriminator: `{}` ({}).",
            event.name, event.direction
        ));
        w.line("#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]");
        w.open(format!("pub struct {class_name} {{"));
        for field in &event.fields {
            self.struct_field(w, &class_name, field);
        }
        w.close("}");
        w.blank();

        w.open(format!("impl {class_name} {{"));
        w.line(format!(
            "pub const {}: &'static str = {};",
            self.discriminator.to_uppercase().replace(['-', '.'], "_"),
            quoted(&event.name)
        ));
        for field in &event.fields {
            if let Some(body) = self.default_body(field) {
                w.blank();
                w.open(format!(
                    "fn {}() -> {} {{",
                    default_fn(field),
                    self.rust_type(&self.resolved(field))
                ));
                w.line(body);
                w.close("}");
            }
        }
        w.close("}");
        w.blank();
    }

    fn struct_field(&self, w: &mut SourceWriter, class_name: &str, field: &Field) {
        let ident = naming::rust_field_ident(&field.name);
        let resolved = self.resolved(field);

        if let Some(description) = &field.description {
            w.comment("///", description);
        }

        let mut attrs = Vec::new();
        if ident.trim_start_matches("r#") != field.wire_name() {
            attrs.push(format!("rename = {}", quoted(field.wire_name())));
        }
        if resolved.nullable {
            attrs.push("default".to_string());
            attrs.push("skip_serializing_if = \"Option::is_none\"".to_string());
        } else if self.default_body(field).is_some() {
            attrs.push(format!("default = \"{class_name}::{}\"", default_fn(field)));
        }
        if !attrs.is_empty() {
            w.line(format!("#[serde({})]", attrs.join(", ")));
        }
        w.line(format!("pub {ident}: {},", self.rust_type(&resolved)));
    }

    fn union_item(&self, w: &mut SourceWriter, union: &str, doc: &str, side: Side) {
        let events = self.side_events(side);
        if events.is_empty() {
            return;
        }

        w.line(format!("/// {doc}"));
        w.line("#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]");
        w.line(format!("#[serde(tag = {})]", quoted(self.discriminator)));
        w.open(format!("pub enum {union} {{"));
        for event in &events {
            w.line(format!("#[serde(rename = {})]", quoted(&event.name)));
            w.line(format!("{}({}),", event.class_name(), event.class_name()));
        }
        w.close("}");
        w.blank();

        let kinds: Vec<String> = events.iter().map(|e| quoted(&e.name)).collect();
        w.open(format!("impl {union} {{"));
        w.line(format!(
            "pub const KINDS: &'static [&'static str] = &[{}];",
            kinds.join(", ")
        ));
        w.close("}");
        w.blank();

        for event in &events {
            let class_name = event.class_name();
            w.open(format!("impl From<{class_name}> for {union} {{"));
            w.open(format!("fn from(message: {class_name}) -> Self {{"));
            w.line(format!("{union}::{class_name}(message)"));
            w.close("}");
            w.close("}");
            w.blank();
        }

        w.open(format!(
            "impl eventwire::dispatch::TaggedMessage for {union} {{"
        ));
        if self.discriminator != "type" {
            w.open("fn discriminator() -> &'static str {");
            w.line(quoted(self.discriminator));
            w.close("}");
            w.blank();
        }
        w.open("fn kinds() -> &'static [&'static str] {");
        w.line("Self::KINDS");
        w.close("}");
        w.blank();
        w.open("fn kind(&self) -> &str {");
        w.open("match self {");
        for event in &events {
            w.line(format!(
                "{union}::{}(_) => {},",
                event.class_name(),
                quoted(&event.name)
            ));
        }
        w.close("}");
        w.close("}");
        w.blank();
        w.open("fn member_schema(kind: &str) -> Option<serde_json::Value> {");
        w.open("let schema = match kind {");
        for event in &events {
            w.line(format!(
                "{} => {},",
                quoted(&event.name),
                rust_raw_string(&self.schema_text(event))
            ));
        }
        w.line("_ => return None,");
        w.close("};");
        w.line("serde_json::from_str(schema).ok()");
        w.close("}");
        w.close("}");
        w.blank();
    }

    fn handler_items(&self, w: &mut SourceWriter, side: Side) {
        let events = self.side_events(side);
        if events.is_empty() {
            return;
        }
        let union = side.inbound_union();

        for group in self.protocol.handler_groups(&events) {
            let group_events: Vec<&Event> = events
                .iter()
                .copied()
                .filter(|e| self.protocol.group_of(e) == group)
                .collect();
            let trait_name = handler_trait_name(group, side);
            let register_fn = register_fn_name(group, side);

            w.line(format!("/// Handler slots for the `{group}` group."));
            w.line("///");
            w.line("/// Every slot defaults to a no-op. Implement the ones you need and");
            w.line(format!("/// wire the type up with [`{register_fn}`]."));
            w.line("#[async_trait]");
            w.open(format!("pub trait {trait_name}: Send + Sync + 'static {{"));
            for (index, event) in group_events.iter().enumerate() {
                if index > 0 {
                    w.blank();
                }
                w.line(format!("/// Handle `{}`.", event.name));
                if let Some(description) = &event.description {
                    w.line("///");
                    w.comment("///", description);
                }
                w.open(format!(
                    "async fn {}(&self, message: {}) {{",
                    event.handler_slot(),
                    event.class_name()
                ));
                w.line("let _ = message;");
                w.close("}");
            }
            w.close("}");
            w.blank();

            w.line(format!(
                "/// Register every `{group}` slot of `H` in its registry."
            ));
            w.line("#[allow(unreachable_patterns)]");
            w.line(format!(
                "pub fn {register_fn}<H>(registry: &mut EventRegistry<H>)"
            ));
            w.line("where");
            w.line(format!(
                "    H: {trait_name} + HandlerType<Message = {union}, Output = ()>,"
            ));
            w.open("{");
            for event in &group_events {
                w.open(format!(
                    "registry.register({}, |handler, message| match message {{",
                    quoted(&event.name)
                ));
                w.line(format!(
                    "{union}::{}(message) => handler.{}(message),",
                    event.class_name(),
                    event.handler_slot()
                ));
                w.line("_ => Box::pin(async {}),");
                w.close("});");
            }
            w.close("}");
            w.blank();
        }
    }

    /// Type checks already passed; an error here only means a raw token
    fn resolved(&self, field: &Field) -> ResolvedType {
        self.mapper.resolve(field).unwrap_or_else(|_| ResolvedType {
            expr: TypeExpr::Raw(field.type_name.clone()),
            nullable: field.is_nullable(),
        })
    }

    fn rust_type(&self, resolved: &ResolvedType) -> String {
        let base = rust_expr(&resolved.expr);
        if resolved.nullable {
            format!("Option<{base}>")
        } else {
            base
        }
    }

    fn schema_text(&self, event: &Event) -> String {
        event_schema(event, &self.mapper, self.discriminator)
            .map(|schema| schema.to_string())
            .unwrap_or_else(|_| "{}".to_string())
    }

    /// Body of the default-value function, if the field has a default
    fn default_body(&self, field: &Field) -> Option<String> {
        if field.required {
            return None;
        }
        let value = field.default.as_ref()?;
        self.value_literal(&self.resolved(field).expr, value)
    }

    /// Rust expression of type `expr` evaluating to `value`
    ///
    /// `None` when the value does not fit the type; `Generator::check` rejects
    /// such defaults before anything is emitted.
    fn value_literal(&self, expr: &TypeExpr, value: &Value) -> Option<String> {
        if !self.mapper.accepts(expr, value) {
            return None;
        }
        let literal = match (expr, value) {
            (TypeExpr::Primitive(Primitive::Any), value) => json_literal(value),
            (TypeExpr::Primitive(Primitive::String), Value::String(s)) => {
                format!("{}.to_string()", quoted(s))
            }
            (TypeExpr::Primitive(Primitive::Integer), Value::Number(n)) => n.as_i64()?.to_string(),
            (TypeExpr::Primitive(Primitive::Float), Value::Number(n)) => {
                format!("{:?}", n.as_f64()?)
            }
            (TypeExpr::Primitive(Primitive::Bool), Value::Bool(b)) => b.to_string(),
            (TypeExpr::Primitive(Primitive::Unit), Value::Null) => "()".to_string(),
            (TypeExpr::Enum(name), Value::String(s)) => enum_variant(name, s),
            (TypeExpr::List(_), Value::Array(items)) if items.is_empty() => {
                "Vec::new()".to_string()
            }
            (TypeExpr::List(item), Value::Array(items)) => {
                let items = items
                    .iter()
                    .map(|v| self.value_literal(item, v))
                    .collect::<Option<Vec<_>>>()?;
                format!("vec![{}]", items.join(", "))
            }
            (TypeExpr::Map(..), Value::Object(entries)) if entries.is_empty() => {
                "std::collections::BTreeMap::new()".to_string()
            }
            (TypeExpr::Map(key, item), Value::Object(entries)) => {
                let entries = entries
                    .iter()
                    .map(|(k, v)| {
                        Some(format!(
                            "({}, {})",
                            key_literal(key, k)?,
                            self.value_literal(item, v)?
                        ))
                    })
                    .collect::<Option<Vec<_>>>()?;
                format!("std::collections::BTreeMap::from([{}])", entries.join(", "))
            }
            _ => return None,
        };
        Some(literal)
    }
}

fn enum_variant(name: &str, value: &str) -> String {
    format!(
        "{}::{}",
        naming::pascal_case(name),
        naming::pascal_case(value)
    )
}

fn key_literal(key: &TypeExpr, value: &str) -> Option<String> {
    match key {
        TypeExpr::Primitive(Primitive::String) => Some(format!("{}.to_string()", quoted(value))),
        TypeExpr::Primitive(Primitive::Integer) => value.parse::<i64>().ok().map(|n| n.to_string()),
        TypeExpr::Enum(name) => Some(enum_variant(name, value)),
        _ => None,
    }
}

/// `serde_json::Value` expression for an arbitrary JSON value
fn json_literal(value: &Value) -> String {
    match value {
        Value::Null => "serde_json::Value::Null".to_string(),
        Value::Bool(b) => format!("serde_json::Value::Bool({b})"),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => format!("serde_json::Value::from({i}i64)"),
            (None, Some(u), _) => format!("serde_json::Value::from({u}u64)"),
            (None, None, Some(f)) => format!("serde_json::Value::from({f:?})"),
            _ => "serde_json::Value::Null".to_string(),
        },
        Value::String(s) => format!("serde_json::Value::String({}.to_string())", quoted(s)),
        Value::Array(items) if items.is_empty() => {
            "serde_json::Value::Array(Vec::new())".to_string()
        }
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(json_literal).collect();
            format!("serde_json::Value::Array(vec![{}])", items.join(", "))
        }
        Value::Object(entries) if entries.is_empty() => {
            "serde_json::Value::Object(serde_json::Map::new())".to_string()
        }
        Value::Object(entries) => {
            let entries: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("({}.to_string(), {})", quoted(k), json_literal(v)))
                .collect();
            format!(
                "serde_json::Value::Object([{}].into_iter().collect())",
                entries.join(", ")
            )
        }
    }
}

fn rust_expr(expr: &TypeExpr) -> String {
    match expr {
        TypeExpr::Primitive(Primitive::String) => "String".to_string(),
        TypeExpr::Primitive(Primitive::Integer) => "i64".to_string(),
        TypeExpr::Primitive(Primitive::Float) => "f64".to_string(),
        TypeExpr::Primitive(Primitive::Bool) => "bool".to_string(),
        TypeExpr::Primitive(Primitive::Any) => "serde_json::Value".to_string(),
        TypeExpr::Primitive(Primitive::Unit) => "()".to_string(),
        TypeExpr::Enum(name) => naming::pascal_case(name),
        TypeExpr::List(item) => format!("Vec<{}>", rust_expr(item)),
        TypeExpr::Map(key, value) => format!(
            "std::collections::BTreeMap<{}, {}>",
            rust_expr(key),
            rust_expr(value)
        ),
        TypeExpr::Raw(token) => token.clone(),
    }
}

fn default_fn(field: &Field) -> String {
    format!(
        "default_{}",
        naming::rust_field_ident(&field.name).trim_start_matches("r#")
    )
}

/// `chat` on the server side -> `ChatServerHandler`
pub fn handler_trait_name(group: &str, side: Side) -> String {
    format!("{}{}Handler", naming::pascal_case(group), side.suffix())
}

/// `chat` on the server side -> `register_chat_server_handler`
pub fn register_fn_name(group: &str, side: Side) -> String {
    format!(
        "register_{}_{}_handler",
        naming::snake_case(group),
        side.suffix().to_lowercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Direction, Event, Field};
    use serde_json::json;

    fn chat_protocol() -> Protocol {
        let mut send = Event::new("chat.send", Direction::ClientToServer).with_fields(vec![
            Field::new("text", "string").with_description("Message body"),
            Field::new("sender", "string").with_alias("from"),
        ]);
        send.handler_group = Some("chat".to_string());
        send.description = Some("Post a message to the room".to_string());

        Protocol::new("lobby")
            .with_version("1.0")
            .with_type("Status", ["online", "away"])
            .add_event(
                "join",
                Direction::ClientToServer,
                vec![
                    Field::new("room", "string"),
                    Field::optional("topic", "string"),
                    Field::optional("limit", "integer").with_default(json!(25)),
                    Field::optional("status", "Status").with_default(json!("away")),
                    Field::new("userId", "string"),
                ],
            )
            .push_event(send)
            .add_event(
                "joined",
                Direction::ServerToClient,
                vec![Field::new("room", "string")],
            )
            .add_event("ping", Direction::Bidirectional, vec![])
    }

    fn combined(protocol: &Protocol) -> String {
        Generator::new(protocol).generate().unwrap()
    }

    #[test]
    fn test_header_names_protocol_and_version() {
        let source = combined(&chat_protocol());
        assert!(source.starts_with(
            "// @generated by eventwire from protocol `lobby` (version 1.0). Do not edit by hand."
        ));
    }

    #[test]
    fn test_message_struct_fields() {
        let source = combined(&chat_protocol());

        assert!(source.contains("pub struct Join {"));
        assert!(source.contains("    pub room: String,"));
        assert!(source.contains(
            "    #[serde(default, skip_serializing_if = \"Option::is_none\")]\n    pub topic: Option<String>,"
        ));
        assert!(
            source.contains("    #[serde(default = \"Join::default_limit\")]\n    pub limit: i64,")
        );
        assert!(source.contains("    fn default_limit() -> i64 {\n        25\n    }"));
        assert!(source.contains("    fn default_status() -> Status {\n        Status::Away\n    }"));
        assert!(source.contains("    #[serde(rename = \"userId\")]\n    pub user_id: String,"));
        assert!(source.contains("    pub const TYPE: &'static str = \"join\";"));
    }

    #[test]
    fn test_alias_and_description() {
        let source = combined(&chat_protocol());

        assert!(source
            .contains("/// Post a message to the room\n///\n/// Wire discriminator: `chat.send`"));
        assert!(source.contains("    /// Message body\n    pub text: String,"));
        assert!(source.contains("    #[serde(rename = \"from\")]\n    pub sender: String,"));
    }

    #[test]
    fn test_custom_enum() {
        let source = combined(&chat_protocol());

        assert!(source.contains("pub enum Status {"));
        assert!(source.contains("    #[serde(rename = \"online\")]\n    Online,"));
        assert!(
            source.contains("pub const VALUES: &'static [&'static str] = &[\"online\", \"away\"];")
        );
    }

    #[test]
    fn test_unions_follow_direction() {
        let source = combined(&chat_protocol());

        assert!(source.contains("#[serde(tag = \"type\")]\npub enum ClientMessage {"));
        assert!(source.contains(
            "pub const KINDS: &'static [&'static str] = &[\"join\", \"chat.send\", \"ping\"];"
        ));
        assert!(
            source.contains("pub const KINDS: &'static [&'static str] = &[\"joined\", \"ping\"];")
        );
        assert!(source.contains("    #[serde(rename = \"chat.send\")]\n    ChatSend(ChatSend),"));
        assert!(source.contains("impl eventwire::dispatch::TaggedMessage for ServerMessage {"));
    }

    #[test]
    fn test_union_omitted_for_empty_direction() {
        let protocol = Protocol::new("one").add_event("hello", Direction::ClientToServer, vec![]);
        let source = combined(&protocol);

        assert!(source.contains("pub enum ClientMessage"));
        assert!(!source.contains("pub enum ServerMessage"));
        assert!(!source.contains("ClientHandler"));
    }

    #[test]
    fn test_handler_groups_and_slots() {
        let source = combined(&chat_protocol());

        // Ungrouped events fall back to the protocol name
        assert!(source.contains("pub trait LobbyServerHandler: Send + Sync + 'static {"));
        assert!(source.contains("pub trait ChatServerHandler: Send + Sync + 'static {"));
        assert!(source.contains("pub trait LobbyClientHandler: Send + Sync + 'static {"));
        assert!(source.contains("    async fn on_chat_send(&self, message: ChatSend) {"));
        assert!(source.contains("    async fn on_ping(&self, message: Ping) {"));
        assert!(source
            .contains("pub fn register_chat_server_handler<H>(registry: &mut EventRegistry<H>)"));
        assert!(source.contains(
            "    H: ChatServerHandler + HandlerType<Message = ClientMessage, Output = ()>,"
        ));
        assert!(source.contains(
            "        ClientMessage::ChatSend(message) => handler.on_chat_send(message),"
        ));
    }

    #[test]
    fn test_custom_discriminator() {
        let protocol = Protocol::new("p").add_event("hello", Direction::ClientToServer, vec![]);
        let source = Generator::new(&protocol)
            .with_discriminator("event")
            .generate()
            .unwrap();

        assert!(source.contains("#[serde(tag = \"event\")]"));
        assert!(source.contains("pub const EVENT: &'static str = \"hello\";"));
        assert!(
            source.contains("    fn discriminator() -> &'static str {\n        \"event\"\n    }")
        );
    }

    #[test]
    fn test_embedded_member_schema_is_valid_json() {
        let protocol = chat_protocol();
        let generator = Generator::new(&protocol);
        let emitter = RustEmitter::new(&generator);

        let text = emitter.schema_text(&protocol.events[0]);
        let schema: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(schema["properties"]["type"]["const"], "join");
    }

    #[test]
    fn test_split_modules() {
        let protocol = chat_protocol();
        let generator = Generator::new(&protocol);
        let emitter = RustEmitter::new(&generator);

        let root = emitter.module_root(Side::Client);
        assert!(root.contains("pub mod handlers;\npub mod messages;"));

        let handlers = emitter.handlers_module(Side::Client);
        assert!(handlers.contains("use super::messages::*;"));
        assert!(handlers.contains("pub trait LobbyClientHandler"));
        assert!(!handlers.contains("ServerHandler"));

        let messages = emitter.messages();
        assert!(messages.contains("use serde::{Deserialize, Serialize};"));
        assert!(!messages.contains("async_trait"));
    }

    #[test]
    fn test_handlers_module_for_side_without_events() {
        let protocol = Protocol::new("quiet").add_event("hello", Direction::ClientToServer, vec![]);
        let generator = Generator::new(&protocol);
        let handlers = RustEmitter::new(&generator).handlers_module(Side::Client);

        assert!(handlers.contains("defines no events for this side"));
        assert!(!handlers.contains("use "));
    }

    #[test]
    fn test_defaults_render_as_typed_literals() {
        let protocol = Protocol::new("p")
            .with_type("Status", ["online", "away"])
            .add_event(
                "tune",
                Direction::ClientToServer,
                vec![
                    Field::optional("statuses", "Status[]").with_default(json!(["away"])),
                    Field::optional("empty", "list[string]").with_default(json!([])),
                    Field::optional("weights", "map[string, number]").with_default(json!({"a": 2})),
                    Field::optional("ranks", "map[int, Status]")
                        .with_default(json!({"1": "online"})),
                    Field::optional("extra", "any").with_default(json!({"k": [1, "x", null]})),
                    Field::optional("loud", "boolean").with_default(json!(true)),
                ],
            );
        let source = combined(&protocol);

        assert!(source
            .contains("fn default_statuses() -> Vec<Status> {\n        vec![Status::Away]\n    }"));
        assert!(source.contains("fn default_empty() -> Vec<String> {\n        Vec::new()\n    }"));
        assert!(source.contains("std::collections::BTreeMap::from([(\"a\".to_string(), 2.0)])"));
        assert!(source.contains("std::collections::BTreeMap::from([(1, Status::Online)])"));
        assert!(source.contains(
            "serde_json::Value::Object([(\"k\".to_string(), serde_json::Value::Array(vec![\
             serde_json::Value::from(1i64), serde_json::Value::String(\"x\".to_string()), \
             serde_json::Value::Null]))].into_iter().collect())"
        ));
        assert!(source.contains("fn default_loud() -> bool {\n        true\n    }"));
        assert!(!source.contains("unwrap_or_default"));
    }

    #[test]
    fn test_enums_are_ordered_for_map_keys() {
        let source = combined(&chat_protocol());
        assert!(source.contains(
            "#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]\npub enum Status {"
        ));
    }

    #[test]
    fn test_list_and_map_types() {
        let protocol = Protocol::new("p").add_event(
            "bulk",
            Direction::ClientToServer,
            vec![
                Field::new("ids", "list[integer]"),
                Field::new("scores", "dict[string, number]"),
                Field::optional("extra", "any"),
            ],
        );
        let source = combined(&protocol);

        assert!(source.contains("pub ids: Vec<i64>,"));
        assert!(source.contains("pub scores: std::collections::BTreeMap<String, f64>,"));
        assert!(source.contains("pub extra: Option<serde_json::Value>,"));
    }
}
