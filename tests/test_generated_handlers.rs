//! Generated handler wiring against the live registry and dispatcher
//!
//! `generated/chat.rs` is checked-in output of `eventwire generate` for
//! `generated/chat.yaml`. It is compiled here as an ordinary module, and
//! `test_checked_in_module_matches_generator` keeps it identical to what the
//! generator emits today. Set `EVENTWIRE_UPDATE_GENERATED=1` to rewrite it.

use eventwire::codegen::Generator;
use eventwire::dispatch::{DispatchError, Dispatcher, TaggedMessage, TypedUnion};
use eventwire::registry::{EventRegistry, HandlerType};
use eventwire::schema::Protocol;
use std::sync::{Arc, Mutex};

#[allow(dead_code)]
#[path = "generated/chat.rs"]
mod chat;

const CHAT_YAML: &str = include_str!("generated/chat.yaml");
const CHAT_RS: &str = include_str!("generated/chat.rs");

/// Implements `on_join` and `on_typing_start`; `ping` falls through to the no-op default
#[derive(Default)]
struct Lobby {
    joins: Mutex<Vec<(String, String, chat::Status)>>,
    typing: Mutex<usize>,
}

#[async_trait::async_trait]
impl chat::ChatServerHandler for Lobby {
    async fn on_join(&self, message: chat::Join) {
        self.joins
            .lock()
            .unwrap()
            .push((message.room, message.sender, message.status));
    }
}

#[async_trait::async_trait]
impl chat::TypingServerHandler for Lobby {
    async fn on_typing_start(&self, _message: chat::TypingStart) {
        *self.typing.lock().unwrap() += 1;
    }
}

impl HandlerType for Lobby {
    type Message = chat::ClientMessage;
    type Output = ();

    fn declare(registry: &mut EventRegistry<Self>) {
        chat::register_chat_server_handler(registry);
        chat::register_typing_server_handler(registry);
    }
}

/// Client side of the same protocol; counts pings from the server
#[derive(Default)]
struct Member {
    pings: Mutex<usize>,
}

#[async_trait::async_trait]
impl chat::ChatClientHandler for Member {
    async fn on_ping(&self, _message: chat::Ping) {
        *self.pings.lock().unwrap() += 1;
    }
}

impl HandlerType for Member {
    type Message = chat::ServerMessage;
    type Output = ();

    fn declare(registry: &mut EventRegistry<Self>) {
        chat::register_chat_client_handler(registry);
    }
}

fn dispatcher() -> Dispatcher<TypedUnion<chat::ClientMessage>, Lobby> {
    Dispatcher::new(TypedUnion::new().unwrap(), Arc::new(Lobby::default()))
}

#[test]
fn test_checked_in_module_matches_generator() {
    let protocol = Protocol::from_yaml(CHAT_YAML).unwrap();
    let source = Generator::new(&protocol).generate().unwrap();

    if std::env::var_os("EVENTWIRE_UPDATE_GENERATED").is_some() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/generated/chat.rs");
        std::fs::write(path, &source).unwrap();
        return;
    }

    assert_eq!(source, CHAT_RS);
}

#[tokio::test]
async fn test_overridden_slot_receives_typed_message() {
    let dispatcher = dispatcher();

    dispatcher
        .dispatch(r#"{"type": "join", "room": "lobby", "from": "ann"}"#)
        .await
        .unwrap();
    dispatcher
        .dispatch(r#"{"type": "join", "room": "den", "from": "bo", "status": "away"}"#)
        .await
        .unwrap();
    dispatcher.dispatch(r#"{"type": "ping"}"#).await.unwrap();

    assert_eq!(
        *dispatcher.handler().joins.lock().unwrap(),
        vec![
            ("lobby".to_string(), "ann".to_string(), chat::Status::Online),
            ("den".to_string(), "bo".to_string(), chat::Status::Away),
        ]
    );
}

#[tokio::test]
async fn test_feature_group_slot_is_registered() {
    let dispatcher = dispatcher();

    dispatcher
        .dispatch(r#"{"type": "typing.start"}"#)
        .await
        .unwrap();

    assert_eq!(*dispatcher.handler().typing.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_bidirectional_event_reaches_client_side() {
    let dispatcher = Dispatcher::new(
        TypedUnion::<chat::ServerMessage>::new().unwrap(),
        Arc::new(Member::default()),
    );

    dispatcher.dispatch(r#"{"type": "ping"}"#).await.unwrap();
    dispatcher
        .dispatch(r#"{"type": "joined", "room": "lobby", "members": ["ann"]}"#)
        .await
        .unwrap();

    assert_eq!(*dispatcher.handler().pings.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_invalid_message_never_reaches_slot() {
    let dispatcher = dispatcher();

    let err = dispatcher
        .dispatch(r#"{"type": "join", "room": 7, "from": "ann"}"#)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Validation { .. }));
    assert_eq!(err.field_errors()[0].path, "/room");

    let err = dispatcher
        .dispatch(r#"{"type": "join", "room": "lobby", "from": "ann", "status": "busy"}"#)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::Validation { .. }));
    assert_eq!(err.field_errors()[0].path, "/status");

    assert!(dispatcher.handler().joins.lock().unwrap().is_empty());
}

#[test]
fn test_tagged_message_uses_wire_names() {
    let message = chat::ClientMessage::from(chat::Join {
        room: "den".to_string(),
        sender: "ann".to_string(),
        status: chat::Status::Away,
        topic: None,
    });

    assert_eq!(message.kind(), "join");
    assert_eq!(
        serde_json::to_value(&message).unwrap(),
        serde_json::json!({"type": "join", "room": "den", "from": "ann", "status": "away"})
    );
    assert_eq!(
        chat::ClientMessage::kinds(),
        &["join", "ping", "typing.start"]
    );
    assert_eq!(chat::ServerMessage::kinds(), &["joined", "ping"]);

    let decoded: chat::ClientMessage =
        serde_json::from_str(r#"{"type": "join", "room": "den", "from": "ann"}"#).unwrap();
    let chat::ClientMessage::Join(join) = decoded else {
        panic!("expected a join message");
    };
    assert_eq!(join.status, chat::Status::Online);
    assert_eq!(chat::Status::VALUES, &["online", "away"]);
}
