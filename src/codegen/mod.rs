//! Code generation from a [`Protocol`]
//!
//! The generator emits three artifact groups:
//!
//! - `server/`: Rust message types, both unions, and handler traits for the
//!   events the server receives (client -> server)
//! - `client/`: the same message types and unions, with handler traits for the
//!   events the client receives (server -> client)
//! - `webclient/protocol.ts`: a browser-side TypeScript variant
//!
//! Each Rust group carries its own copy of the message types so any subset of
//! groups builds on its own. Output is a pure function of the protocol: events
//! appear in authored order, custom types in name order, and nothing depends
//! on hash iteration.
//!
//! Generated Rust depends on `serde`, `serde_json`, `async-trait` and this crate.

pub mod json_schema;
pub mod naming;
pub mod rust;
pub mod typescript;
mod writer;

use crate::observability::metrics;
use crate::schema::{Event, Protocol, TypeMapper};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Union names reserved by the generator
pub const RESERVED_TYPE_NAMES: &[&str] = &["ClientMessage", "ServerMessage"];

/// Generation failures; any of these aborts the whole artifact set
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("Event '{event}' field '{field}': cannot resolve type '{token}': {reason}")]
    UnresolvableType {
        event: String,
        field: String,
        token: String,
        reason: String,
    },

    #[error("Duplicate discriminator value '{name}': event names must be unique")]
    DuplicateDiscriminator { name: String },

    #[error("Event '{event}' declares field '{field}' more than once")]
    DuplicateField { event: String, field: String },

    #[error("Event '{event}' field '{field}' uses the discriminator name on the wire")]
    ReservedField { event: String, field: String },

    #[error("Generated name '{name}' is used more than once")]
    NameCollision { name: String },

    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Event '{event}' field '{field}': default {value} does not match type '{token}'")]
    InvalidDefault {
        event: String,
        field: String,
        token: String,
        value: String,
    },

    #[error("Failed to write generated files: {0}")]
    Io(#[from] std::io::Error),
}

/// Which artifact groups to emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorOptions {
    pub include_server: bool,
    pub include_client: bool,
    pub include_webclient: bool,
    /// Place the browser artifact under `client/` instead of `webclient/`
    pub integrate_webclient: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            include_server: true,
            include_client: true,
            include_webclient: true,
            integrate_webclient: false,
        }
    }
}

/// One emitted file, path relative to the output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub contents: String,
}

impl GeneratedFile {
    fn new(path: impl Into<PathBuf>, contents: String) -> Self {
        Self {
            path: path.into(),
            contents,
        }
    }
}

/// Receiving side of a handler artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Handles client -> server events
    Server,
    /// Handles server -> client events
    Client,
}

impl Side {
    pub fn dir(&self) -> &'static str {
        match self {
            Side::Server => "server",
            Side::Client => "client",
        }
    }

    /// Union of the messages this side receives
    pub fn inbound_union(&self) -> &'static str {
        match self {
            Side::Server => "ClientMessage",
            Side::Client => "ServerMessage",
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Side::Server => "Server",
            Side::Client => "Client",
        }
    }

    /// Events this side receives, in authored order
    pub fn inbound_events<'p>(&self, protocol: &'p Protocol) -> Vec<&'p Event> {
        match self {
            Side::Server => protocol.client_to_server_events(),
            Side::Client => protocol.server_to_client_events(),
        }
    }
}

/// Code generator bound to one protocol
pub struct Generator<'a> {
    protocol: &'a Protocol,
    discriminator: String,
}

impl<'a> Generator<'a> {
    pub fn new(protocol: &'a Protocol) -> Self {
        Self {
            protocol,
            discriminator: "type".to_string(),
        }
    }

    /// Use a discriminator field other than `type`
    pub fn with_discriminator(mut self, discriminator: impl Into<String>) -> Self {
        self.discriminator = discriminator.into();
        self
    }

    pub fn protocol(&self) -> &Protocol {
        self.protocol
    }

    pub fn discriminator(&self) -> &str {
        &self.discriminator
    }

    /// Validate everything the emitters rely on
    pub fn check(&self) -> Result<(), GenerateError> {
        let protocol = self.protocol;
        let mapper = TypeMapper::new(protocol);

        let mut event_names = HashSet::new();
        let mut type_names: HashSet<String> =
            RESERVED_TYPE_NAMES.iter().map(|s| s.to_string()).collect();

        for type_name in protocol.types.keys() {
            claim(&mut type_names, naming::pascal_case(type_name))?;
            let mut variants = HashSet::new();
            for value in &protocol.types[type_name] {
                claim(&mut variants, naming::pascal_case(value))?;
            }
        }

        for event in &protocol.events {
            if !event_names.insert(event.name.as_str()) {
                return Err(GenerateError::DuplicateDiscriminator {
                    name: event.name.clone(),
                });
            }

            let class_name = event.class_name();
            if !naming::is_identifier(&class_name) {
                return Err(GenerateError::InvalidName {
                    name: class_name,
                    reason: "class names must be identifiers".to_string(),
                });
            }
            claim(&mut type_names, class_name)?;

            let mut field_idents = HashSet::new();
            let mut wire_names = HashSet::new();
            for field in &event.fields {
                let duplicate = || GenerateError::DuplicateField {
                    event: event.name.clone(),
                    field: field.name.clone(),
                };
                if !field_idents.insert(naming::rust_field_ident(&field.name)) {
                    return Err(duplicate());
                }
                if !wire_names.insert(field.wire_name()) {
                    return Err(duplicate());
                }
                if field.wire_name() == self.discriminator {
                    return Err(GenerateError::ReservedField {
                        event: event.name.clone(),
                        field: field.name.clone(),
                    });
                }
                let resolved =
                    mapper
                        .resolve(field)
                        .map_err(|e| GenerateError::UnresolvableType {
                            event: event.name.clone(),
                            field: field.name.clone(),
                            token: e.token,
                            reason: e.reason,
                        })?;
                if let Some(default) = field.default.as_ref().filter(|_| !field.required) {
                    if !mapper.accepts(&resolved.expr, default) {
                        return Err(GenerateError::InvalidDefault {
                            event: event.name.clone(),
                            field: field.name.clone(),
                            token: field.type_name.clone(),
                            value: default.to_string(),
                        });
                    }
                }
            }
        }

        self.check_handler_names(&mut type_names)?;

        debug!(
            protocol = %protocol.name,
            events = protocol.events.len(),
            "Protocol passed generation checks"
        );
        Ok(())
    }

    /// Handler traits, registration functions and slots must not clash
    ///
    /// Rust slots are methods of one trait per (side, group); the browser
    /// client holds every server -> client slot in a single class.
    fn check_handler_names(&self, type_names: &mut HashSet<String>) -> Result<(), GenerateError> {
        let protocol = self.protocol;
        let mut functions = HashSet::new();
        claim(
            type_names,
            format!("{}Client", naming::pascal_case(&protocol.name)),
        )?;

        for side in [Side::Server, Side::Client] {
            let events = side.inbound_events(protocol);
            let mut class_slots = HashSet::new();

            for group in protocol.handler_groups(&events) {
                claim(type_names, rust::handler_trait_name(group, side))?;
                claim(&mut functions, rust::register_fn_name(group, side))?;

                let mut trait_slots = HashSet::new();
                for event in events.iter().filter(|e| protocol.group_of(e) == group) {
                    let slot = event.handler_slot();
                    if !naming::is_identifier(&slot) {
                        return Err(GenerateError::InvalidName {
                            name: slot,
                            reason: format!("handler slot of event '{}'", event.name),
                        });
                    }
                    claim(&mut trait_slots, slot.clone())?;
                    if side == Side::Client {
                        claim(&mut class_slots, slot)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Single combined Rust source with every artifact
    pub fn generate(&self) -> Result<String, GenerateError> {
        self.check()?;
        let span = crate::generate_span!(protocol = %self.protocol.name, mode = "combined");
        let _guard = span.enter();

        let source = rust::RustEmitter::new(self).combined();
        metrics().record_generation(1);
        Ok(source)
    }

    /// Render the artifact set selected by `options` without touching disk
    pub fn render(&self, options: &GeneratorOptions) -> Result<Vec<GeneratedFile>, GenerateError> {
        self.check()?;
        let rust = rust::RustEmitter::new(self);
        let mut files = Vec::new();

        for (enabled, side) in [
            (options.include_server, Side::Server),
            (options.include_client, Side::Client),
        ] {
            if !enabled {
                continue;
            }
            let dir = Path::new(side.dir());
            files.push(GeneratedFile::new(
                dir.join("mod.rs"),
                rust.module_root(side),
            ));
            files.push(GeneratedFile::new(dir.join("messages.rs"), rust.messages()));
            files.push(GeneratedFile::new(
                dir.join("handlers.rs"),
                rust.handlers_module(side),
            ));
        }

        if options.include_webclient {
            let dir = if options.integrate_webclient {
                "client"
            } else {
                "webclient"
            };
            files.push(GeneratedFile::new(
                Path::new(dir).join("protocol.ts"),
                typescript::TypeScriptEmitter::new(self).module(),
            ));
        }

        Ok(files)
    }

    /// Render, then write every file under `target`
    ///
    /// Nothing is written unless the whole set renders successfully.
    pub fn write_all(
        &self,
        target: &Path,
        options: &GeneratorOptions,
    ) -> Result<Vec<PathBuf>, GenerateError> {
        let span =
            crate::generate_span!(protocol = %self.protocol.name, target = %target.display());
        let _guard = span.enter();

        let files = self.render(options)?;
        let mut written = Vec::with_capacity(files.len());

        for file in files {
            let path = target.join(&file.path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, file.contents)?;
            debug!(path = %path.display(), "Wrote generated file");
            written.push(path);
        }

        metrics().record_generation(written.len() as u64);
        info!(
            protocol = %self.protocol.name,
            files = written.len(),
            target = %target.display(),
            "Generated protocol artifacts"
        );
        Ok(written)
    }
}

fn claim(names: &mut HashSet<String>, name: String) -> Result<(), GenerateError> {
    if names.insert(name.clone()) {
        Ok(())
    } else {
        Err(GenerateError::NameCollision { name })
    }
}
