//! eventwire - schema-first event protocols
//!
//! A protocol document (YAML or JSON) declares named events, the direction
//! each one travels, and typed fields. From that single definition this crate
//! produces:
//!
//! - Rust message types, tagged unions, and async handler traits for the
//!   server and client sides
//! - a TypeScript module for browser clients
//! - JSON Schemas used at runtime to validate incoming messages
//!
//! At runtime a [`Dispatcher`] decodes raw text or bytes, reads the
//! discriminator field, validates the payload against the matching union
//! member, and routes it to the handler registered for that event kind.
//! [`MultiDispatcher`] does the same across several handlers selected by
//! event-name prefix or predicate.
//!
//! # Quick Start
//!
//! ```rust
//! use eventwire::dispatch::{Dispatcher, ProtocolUnion};
//! use eventwire::codegen::Side;
//! use eventwire::registry::FnHandler;
//! use eventwire::schema::Protocol;
//! use std::sync::Arc;
//!
//! let protocol = Protocol::from_yaml(r#"
//! name: chat
//! client:
//!   - name: join
//!     fields:
//!       - { name: room, type: string }
//! "#).unwrap();
//!
//! // Generated source for both sides, as one file
//! let source = eventwire::codegen::Generator::new(&protocol).generate().unwrap();
//! assert!(source.contains("pub struct Join"));
//!
//! // Dispatch against the protocol directly, without generated types
//! let union = ProtocolUnion::new(&protocol, Side::Server).unwrap();
//! let handler = FnHandler::builder()
//!     .on_sync("join", |message: eventwire::dispatch::DynamicMessage| {
//!         message.get_str("room").map(str::to_string)
//!     })
//!     .build();
//! let dispatcher = Dispatcher::new(union, Arc::new(handler));
//!
//! let room = dispatcher
//!     .dispatch_sync(r#"{"type": "join", "room": "lobby"}"#)
//!     .unwrap();
//! assert_eq!(room.as_deref(), Some("lobby"));
//! ```

pub mod codegen;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod observability;
pub mod registry;
pub mod schema;
pub mod server;

pub use codegen::{GenerateError, GeneratedFile, Generator, GeneratorOptions, Side};
pub use config::{ConfigError, ServiceConfig};
pub use dispatch::{
    DispatchError, Dispatcher, DispatcherConfig, FieldError, MultiDispatcher, TaggedMessage,
};
pub use error::{Error, Result};
pub use registry::{registry_for, EventHandler, EventRegistry, FnHandler, HandlerType};
pub use schema::{Direction, Event, Field, Protocol, SchemaError, TypeMapper};
pub use server::GenerationService;
