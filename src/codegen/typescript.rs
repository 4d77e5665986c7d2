//! Browser-side TypeScript emitter
//!
//! One self-contained `protocol.ts`: string-literal unions for custom types, an
//! interface per event, the two message unions, and a small client class that
//! serializes outgoing events and routes incoming ones to overridable slots.

use super::naming::{self, quoted};
use super::writer::SourceWriter;
use super::Generator;
use crate::schema::{Event, Field, Primitive, Protocol, TypeExpr, TypeMapper};

pub struct TypeScriptEmitter<'g> {
    protocol: &'g Protocol,
    mapper: TypeMapper<'g>,
    discriminator: &'g str,
}

impl<'g> TypeScriptEmitter<'g> {
    pub fn new(generator: &'g Generator<'_>) -> Self {
        let protocol = generator.protocol();
        Self {
            protocol,
            mapper: TypeMapper::new(protocol),
            discriminator: generator.discriminator(),
        }
    }

    pub fn module(&self) -> String {
        let mut w = SourceWriter::new("  ");
        let version = match &self.protocol.version {
            Some(version) => format!(" (version {version})"),
            None => String::new(),
        };
        w.line(format!(
            "// @generated by eventwire from protocol `{}`{version}. Do not edit by hand.",
            self.protocol.name
        ));
        w.blank();

        for (name, values) in &self.protocol.types {
            let literals: Vec<String> = values.iter().map(|v| quoted(v)).collect();
            let body = if literals.is_empty() {
                "never".to_string()
            } else {
                literals.join(" | ")
            };
            w.line(format!(
                "export type {} = {body};",
                naming::pascal_case(name)
            ));
            w.blank();
        }

        for event in &self.protocol.events {
            self.interface(&mut w, event);
        }

        let outgoing = self.protocol.client_to_server_events();
        let incoming = self.protocol.server_to_client_events();

        w.line(format!(
            "export type ClientMessage = {};",
            union_body(&outgoing)
        ));
        w.line(format!(
            "export type ServerMessage = {};",
            union_body(&incoming)
        ));
        w.blank();
        w.line(format!(
            "export const CLIENT_EVENTS = {} as const;",
            name_list(&outgoing)
        ));
        w.line(format!(
            "export const SERVER_EVENTS = {} as const;",
            name_list(&incoming)
        ));
        w.blank();

        self.client_class(&mut w, &outgoing, &incoming);
        w.finish()
    }

    fn interface(&self, w: &mut SourceWriter, event: &Event) {
        if let Some(description) = &event.description {
            w.line("/**");
            w.comment(" *", description);
            w.line(" */");
        }
        w.open(format!("export interface {} {{", event.class_name()));
        w.line(format!(
            "{}: {};",
            property_key(self.discriminator),
            quoted(&event.name)
        ));
        for field in &event.fields {
            if let Some(description) = &field.description {
                w.line(format!("/** {} */", description.replace('\n', " ")));
            }
            let optional = if field.required { "" } else { "?" };
            w.line(format!(
                "{}{optional}: {};",
                property_key(field.wire_name()),
                self.field_type(field)
            ));
        }
        w.close("}");
        w.blank();
    }

    fn client_class(&self, w: &mut SourceWriter, outgoing: &[&Event], incoming: &[&Event]) {
        let class_name = format!("{}Client", naming::pascal_case(&self.protocol.name));
        let disc = quoted(self.discriminator);

        w.line(format!(
            "/** Browser client for protocol `{}`. Override the `on_*` slots you need. */",
            self.protocol.name
        ));
        w.open(format!("export class {class_name} {{"));
        w.line("constructor(private readonly send: (data: string) => void) {}");

        for event in outgoing {
            let name = event.class_name();
            w.blank();
            w.open(format!(
                "{}(payload: Omit<{name}, {disc}>): void {{",
                naming::ts_method("send", &name)
            ));
            w.line(format!(
                "this.send(JSON.stringify({{ {}: {}, ...payload }}));",
                property_key(self.discriminator),
                quoted(&event.name)
            ));
            w.close("}");
        }

        for event in incoming {
            w.blank();
            w.open(format!(
                "{}(message: {}): void {{",
                event.handler_slot(),
                event.class_name()
            ));
            w.line("void message;");
            w.close("}");
        }

        w.blank();
        if incoming.is_empty() {
            w.line("dispatch(_raw: string): void {}");
        } else {
            w.open("dispatch(raw: string): void {");
            w.line("const message = JSON.parse(raw) as ServerMessage;");
            w.open(format!("switch (message[{disc}]) {{"));
            for event in incoming {
                w.open(format!("case {}:", quoted(&event.name)));
                w.line(format!("this.{}(message);", event.handler_slot()));
                w.line("break;");
                w.dedent();
            }
            w.open("default:");
            w.line("break;");
            w.dedent();
            w.close("}");
            w.close("}");
        }
        w.close("}");
    }

    fn field_type(&self, field: &Field) -> String {
        let expr = match self.mapper.resolve(field) {
            Ok(resolved) => resolved.expr,
            Err(_) => TypeExpr::Raw(field.type_name.clone()),
        };
        let base = ts_expr(&expr);
        if field.is_nullable() {
            format!("{base} | null")
        } else {
            base
        }
    }
}

fn ts_expr(expr: &TypeExpr) -> String {
    match expr {
        TypeExpr::Primitive(Primitive::String) => "string".to_string(),
        TypeExpr::Primitive(Primitive::Integer | Primitive::Float) => "number".to_string(),
        TypeExpr::Primitive(Primitive::Bool) => "boolean".to_string(),
        TypeExpr::Primitive(Primitive::Any) => "unknown".to_string(),
        TypeExpr::Primitive(Primitive::Unit) => "null".to_string(),
        TypeExpr::Enum(name) => naming::pascal_case(name),
        TypeExpr::List(item) => format!("Array<{}>", ts_expr(item)),
        TypeExpr::Map(key, value) => {
            let key = match key.as_ref() {
                TypeExpr::Primitive(Primitive::Integer | Primitive::Float) => "number",
                _ => "string",
            };
            format!("Record<{key}, {}>", ts_expr(value))
        }
        // Host-language types have no browser counterpart
        TypeExpr::Raw(_) => "unknown".to_string(),
    }
}

fn property_key(name: &str) -> String {
    if naming::is_identifier(name) {
        name.to_string()
    } else {
        quoted(name)
    }
}

fn union_body(events: &[&Event]) -> String {
    if events.is_empty() {
        return "never".to_string();
    }
    events
        .iter()
        .map(|e| e.class_name())
        .collect::<Vec<_>>()
        .join(" | ")
}

fn name_list(events: &[&Event]) -> String {
    let names: Vec<String> = events.iter().map(|e| quoted(&e.name)).collect();
    format!("[{}]", names.join(", "))
}
