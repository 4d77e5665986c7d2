// @generated by eventwire from protocol `chat` (version 2). Do not edit by hand.

//! Protocol `chat`: messages, unions, and handler slots.

use serde::{Deserialize, Serialize};
use async_trait::async_trait;
use eventwire::registry::{EventRegistry, HandlerType};

/// Allowed values of `Status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "online")]
    Online,
    #[serde(rename = "away")]
    Away,
}

impl Status {
    pub const VALUES: &'static [&'static str] = &["online", "away"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Online => "online",
            Status::Away => "away",
        }
    }
}

/// Wire discriminator: `join` (client_to_server).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub room: String,
    #[serde(rename = "from")]
    pub sender: String,
    #[serde(default = "Join::default_status")]
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl Join {
    pub const TYPE: &'static str = "join";

    fn default_status() -> Status {
        Status::Online
    }
}

/// Wire discriminator: `joined` (server_to_client).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Joined {
    pub room: String,
    pub members: Vec<String>,
}

impl Joined {
    pub const TYPE: &'static str = "joined";
}

/// Wire discriminator: `ping` (bidirectional).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ping {
}

impl Ping {
    pub const TYPE: &'static str = "ping";
}

/// Wire discriminator: `typing.start` (client_to_server).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypingStart {
}

impl TypingStart {
    pub const TYPE: &'static str = "typing.start";
}

/// Messages the client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "join")]
    Join(Join),
    #[serde(rename = "ping")]
    Ping(Ping),
    #[serde(rename = "typing.start")]
    TypingStart(TypingStart),
}

impl ClientMessage {
    pub const KINDS: &'static [&'static str] = &["join", "ping", "typing.start"];
}

impl From<Join> for ClientMessage {
    fn from(message: Join) -> Self {
        ClientMessage::Join(message)
    }
}

impl From<Ping> for ClientMessage {
    fn from(message: Ping) -> Self {
        ClientMessage::Ping(message)
    }
}

impl From<TypingStart> for ClientMessage {
    fn from(message: TypingStart) -> Self {
        ClientMessage::TypingStart(message)
    }
}

impl eventwire::dispatch::TaggedMessage for ClientMessage {
    fn kinds() -> &'static [&'static str] {
        Self::KINDS
    }

    fn kind(&self) -> &str {
        match self {
            ClientMessage::Join(_) => "join",
            ClientMessage::Ping(_) => "ping",
            ClientMessage::TypingStart(_) => "typing.start",
        }
    }

    fn member_schema(kind: &str) -> Option<serde_json::Value> {
        let schema = match kind {
            "join" => r#"{"title":"Join","type":"object","properties":{"type":{"const":"join"},"room":{"type":"string"},"from":{"type":"string"},"status":{"type":"string","enum":["online","away"],"default":"online"},"topic":{"anyOf":[{"type":"string"},{"type":"null"}]}},"required":["type","room","from"]}"#,
            "ping" => r#"{"title":"Ping","type":"object","properties":{"type":{"const":"ping"}},"required":["type"]}"#,
            "typing.start" => r#"{"title":"TypingStart","type":"object","properties":{"type":{"const":"typing.start"}},"required":["type"]}"#,
            _ => return None,
        };
        serde_json::from_str(schema).ok()
    }
}

/// Messages the server may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "joined")]
    Joined(Joined),
    #[serde(rename = "ping")]
    Ping(Ping),
}

impl ServerMessage {
    pub const KINDS: &'static [&'static str] = &["joined", "ping"];
}

impl From<Joined> for ServerMessage {
    fn from(message: Joined) -> Self {
        ServerMessage::Joined(message)
    }
}

impl From<Ping> for ServerMessage {
    fn from(message: Ping) -> Self {
        ServerMessage::Ping(message)
    }
}

impl eventwire::dispatch::TaggedMessage for ServerMessage {
    fn kinds() -> &'static [&'static str] {
        Self::KINDS
    }

    fn kind(&self) -> &str {
        match self {
            ServerMessage::Joined(_) => "joined",
            ServerMessage::Ping(_) => "ping",
        }
    }

    fn member_schema(kind: &str) -> Option<serde_json::Value> {
        let schema = match kind {
            "joined" => r#"{"title":"Joined","type":"object","properties":{"type":{"const":"joined"},"room":{"type":"string"},"members":{"type":"array","items":{"type":"string"}}},"required":["type","room","members"]}"#,
            "ping" => r#"{"title":"Ping","type":"object","properties":{"type":{"const":"ping"}},"required":["type"]}"#,
            _ => return None,
        };
        serde_json::from_str(schema).ok()
    }
}

/// Handler slots for the `chat` group.
///
/// Every slot defaults to a no-op. Implement the ones you need and
/// wire the type up with [`register_chat_server_handler`].
#[async_trait]
pub trait ChatServerHandler: Send + Sync + 'static {
    /// Handle `join`.
    async fn on_join(&self, message: Join) {
        let _ = message;
    }

    /// Handle `ping`.
    async fn on_ping(&self, message: Ping) {
        let _ = message;
    }
}

/// Register every `chat` slot of `H` in its registry.
#[allow(unreachable_patterns)]
pub fn register_chat_server_handler<H>(registry: &mut EventRegistry<H>)
where
    H: ChatServerHandler + HandlerType<Message = ClientMessage, Output = ()>,
{
    registry.register("join", |handler, message| match message {
        ClientMessage::Join(message) => handler.on_join(message),
        _ => Box::pin(async {}),
    });
    registry.register("ping", |handler, message| match message {
        ClientMessage::Ping(message) => handler.on_ping(message),
        _ => Box::pin(async {}),
    });
}

/// Handler slots for the `typing` group.
///
/// Every slot defaults to a no-op. Implement the ones you need and
/// wire the type up with [`register_typing_server_handler`].
#[async_trait]
pub trait TypingServerHandler: Send + Sync + 'static {
    /// Handle `typing.start`.
    async fn on_typing_start(&self, message: TypingStart) {
        let _ = message;
    }
}

/// Register every `typing` slot of `H` in its registry.
#[allow(unreachable_patterns)]
pub fn register_typing_server_handler<H>(registry: &mut EventRegistry<H>)
where
    H: TypingServerHandler + HandlerType<Message = ClientMessage, Output = ()>,
{
    registry.register("typing.start", |handler, message| match message {
        ClientMessage::TypingStart(message) => handler.on_typing_start(message),
        _ => Box::pin(async {}),
    });
}

/// Handler slots for the `chat` group.
///
/// Every slot defaults to a no-op. Implement the ones you need and
/// wire the type up with [`register_chat_client_handler`].
#[async_trait]
pub trait ChatClientHandler: Send + Sync + 'static {
    /// Handle `joined`.
    async fn on_joined(&self, message: Joined) {
        let _ = message;
    }

    /// Handle `ping`.
    async fn on_ping(&self, message: Ping) {
        let _ = message;
    }
}

/// Register every `chat` slot of `H` in its registry.
#[allow(unreachable_patterns)]
pub fn register_chat_client_handler<H>(registry: &mut EventRegistry<H>)
where
    H: ChatClientHandler + HandlerType<Message = ServerMessage, Output = ()>,
{
    registry.register("joined", |handler, message| match message {
        ServerMessage::Joined(message) => handler.on_joined(message),
        _ => Box::pin(async {}),
    });
    registry.register("ping", |handler, message| match message {
        ServerMessage::Ping(message) => handler.on_ping(message),
        _ => Box::pin(async {}),
    });
}
