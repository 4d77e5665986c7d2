//! Handler registries
//!
//! A handler type declares, once, which event kinds it handles and which
//! callback runs for each. The declaration is captured in an [`EventRegistry`]
//! that is built lazily the first time the type is used and then shared by
//! every instance.
//!
//! Overriding works by composition: a type that wraps another handler calls
//! [`EventRegistry::inherit`] to copy the wrapped type's entries, then
//! registers its own. Later registrations replace earlier ones for the same
//! kind, so the most derived declaration wins.

use once_cell::sync::Lazy;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, RwLock};
use tracing::{debug, trace};

/// Boxed, sendable future returned by every handler callback
pub use futures::future::BoxFuture;

/// Callback stored for one event kind
pub type HandlerFn<H> = Arc<
    dyn for<'a> Fn(&'a H, <H as HandlerType>::Message) -> BoxFuture<'a, <H as HandlerType>::Output>
        + Send
        + Sync,
>;

/// A type whose event callbacks are declared once for all instances
pub trait HandlerType: Send + Sync + Sized + 'static {
    /// Decoded message passed to every callback
    type Message: Send + 'static;
    type Output: Send + 'static;

    /// Fill the registry for this type. Called at most a few times per
    /// process; the result is cached by [`registry_for`].
    fn declare(registry: &mut EventRegistry<Self>);
}

/// Event kind -> callback, in declaration order
pub struct EventRegistry<H: HandlerType> {
    order: Vec<String>,
    callbacks: HashMap<String, HandlerFn<H>>,
}

impl<H: HandlerType> EventRegistry<H> {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            callbacks: HashMap::new(),
        }
    }

    /// Register the callback for `kind`, replacing any earlier one
    ///
    /// A replaced kind keeps its original position in [`Self::event_kinds`].
    pub fn register<F>(&mut self, kind: impl Into<String>, callback: F) -> &mut Self
    where
        F: for<'a> Fn(&'a H, H::Message) -> BoxFuture<'a, H::Output> + Send + Sync + 'static,
    {
        let kind = kind.into();
        if self
            .callbacks
            .insert(kind.clone(), Arc::new(callback))
            .is_some()
        {
            debug!(
                event_kind = %kind,
                handler = std::any::type_name::<H>(),
                "Handler overridden"
            );
        } else {
            self.order.push(kind);
        }
        self
    }

    /// Copy every entry declared by `B`, reaching it through `project`
    pub fn inherit<B>(&mut self, project: fn(&H) -> &B) -> &mut Self
    where
        B: HandlerType<Message = H::Message, Output = H::Output>,
    {
        let base = registry_for::<B>();
        for kind in &base.order {
            if let Some(callback) = base.callbacks.get(kind) {
                let callback = Arc::clone(callback);
                self.register(kind.clone(), move |handler, message| {
                    callback(project(handler), message)
                });
            }
        }
        self
    }

    pub fn get_handler(&self, kind: &str) -> Option<HandlerFn<H>> {
        self.callbacks.get(kind).cloned()
    }

    pub fn has_handler(&self, kind: &str) -> bool {
        self.callbacks.contains_key(kind)
    }

    /// Registered kinds in declaration order
    pub fn event_kinds(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl<H: HandlerType> Default for EventRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: HandlerType> Clone for EventRegistry<H> {
    fn clone(&self) -> Self {
        Self {
            order: self.order.clone(),
            callbacks: self.callbacks.clone(),
        }
    }
}

impl<H: HandlerType> std::fmt::Debug for EventRegistry<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRegistry")
            .field("handler", &std::any::type_name::<H>())
            .field("event_kinds", &self.order)
            .finish()
    }
}

static REGISTRIES: Lazy<RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// The cached registry for `H`, built from [`HandlerType::declare`] on first use
///
/// Two threads racing on the first use may both build; the first stored
/// registry is kept and returned to both. A type must not inherit from itself.
pub fn registry_for<H: HandlerType>() -> Arc<EventRegistry<H>> {
    let id = TypeId::of::<H>();

    let cached = REGISTRIES
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .get(&id)
        .cloned();
    if let Some(registry) = cached.and_then(|entry| entry.downcast::<EventRegistry<H>>().ok()) {
        return registry;
    }

    let mut registry = EventRegistry::new();
    H::declare(&mut registry);
    trace!(
        handler = std::any::type_name::<H>(),
        kinds = registry.len(),
        "Built handler registry"
    );

    let built: Arc<dyn Any + Send + Sync> = Arc::new(registry);
    let stored = REGISTRIES
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .entry(id)
        .or_insert(built)
        .clone();

    stored
        .downcast::<EventRegistry<H>>()
        .unwrap_or_else(|_| Arc::new(build_uncached::<H>()))
}

fn build_uncached<H: HandlerType>() -> EventRegistry<H> {
    let mut registry = EventRegistry::new();
    H::declare(&mut registry);
    registry
}

/// Anything a dispatcher can route decoded messages to
pub trait EventHandler: Send + Sync {
    type Message: Send + 'static;
    type Output: Send + 'static;

    fn handles_event(&self, kind: &str) -> bool;

    /// Kinds this handler accepts, in declaration order
    fn handled_events(&self) -> Vec<String>;

    /// Start the callback for `kind`, or `None` when nothing is registered
    fn call<'a>(
        &'a self,
        kind: &str,
        message: Self::Message,
    ) -> Option<BoxFuture<'a, Self::Output>>;
}

impl<H: HandlerType> EventHandler for H {
    type Message = H::Message;
    type Output = H::Output;

    fn handles_event(&self, kind: &str) -> bool {
        registry_for::<H>().has_handler(kind)
    }

    fn handled_events(&self) -> Vec<String> {
        registry_for::<H>()
            .event_kinds()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn call<'a>(&'a self, kind: &str, message: H::Message) -> Option<BoxFuture<'a, H::Output>> {
        let callback = registry_for::<H>().get_handler(kind)?;
        Some(callback(self, message))
    }
}

type FnCallback<M, R> = Arc<dyn Fn(M) -> BoxFuture<'static, R> + Send + Sync>;

/// Handler assembled at runtime from closures, see [`HandlerBuilder`]
pub struct FnHandler<M, R = ()> {
    order: Vec<String>,
    callbacks: HashMap<String, FnCallback<M, R>>,
}

impl<M, R> FnHandler<M, R>
where
    M: Send + 'static,
    R: Send + 'static,
{
    pub fn builder() -> HandlerBuilder<M, R> {
        HandlerBuilder::new()
    }
}

impl<M, R> EventHandler for FnHandler<M, R>
where
    M: Send + 'static,
    R: Send + 'static,
{
    type Message = M;
    type Output = R;

    fn handles_event(&self, kind: &str) -> bool {
        self.callbacks.contains_key(kind)
    }

    fn handled_events(&self) -> Vec<String> {
        self.order.clone()
    }

    fn call<'a>(&'a self, kind: &str, message: M) -> Option<BoxFuture<'a, R>> {
        self.callbacks.get(kind).map(|callback| callback(message))
    }
}

/// Builds a [`FnHandler`] from a mapping of event kind to closure
pub struct HandlerBuilder<M, R = ()> {
    handler: FnHandler<M, R>,
}

impl<M, R> HandlerBuilder<M, R>
where
    M: Send + 'static,
    R: Send + 'static,
{
    pub fn new() -> Self {
        Self {
            handler: FnHandler {
                order: Vec::new(),
                callbacks: HashMap::new(),
            },
        }
    }

    /// Async callback for `kind`; a second call for the same kind replaces it
    pub fn on<F, Fut>(mut self, kind: impl Into<String>, callback: F) -> Self
    where
        F: Fn(M) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        let callback: FnCallback<M, R> =
            Arc::new(move |message: M| -> BoxFuture<'static, R> { Box::pin(callback(message)) });
        self.insert(kind.into(), callback);
        self
    }

    /// Synchronous callback for `kind`
    pub fn on_sync<F>(mut self, kind: impl Into<String>, callback: F) -> Self
    where
        F: Fn(M) -> R + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        let wrapped: FnCallback<M, R> = Arc::new(move |message: M| -> BoxFuture<'static, R> {
            let callback = Arc::clone(&callback);
            Box::pin(async move { callback(message) })
        });
        self.insert(kind.into(), wrapped);
        self
    }

    fn insert(&mut self, kind: String, callback: FnCallback<M, R>) {
        if self
            .handler
            .callbacks
            .insert(kind.clone(), callback)
            .is_none()
        {
            self.handler.order.push(kind);
        }
    }

    pub fn build(self) -> FnHandler<M, R> {
        self.handler
    }
}

impl<M, R> Default for HandlerBuilder<M, R>
where
    M: Send + 'static,
    R: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Base;

    impl HandlerType for Base {
        type Message = String;
        type Output = String;

        fn declare(registry: &mut EventRegistry<Self>) {
            registry
                .register("ping", |_, message| {
                    Box::pin(async move { format!("base ping {message}") })
                })
                .register("pong", |_, message| {
                    Box::pin(async move { format!("base pong {message}") })
                });
        }
    }

    struct Derived {
        base: Base,
        pongs: AtomicUsize,
    }

    impl HandlerType for Derived {
        type Message = String;
        type Output = String;

        fn declare(registry: &mut EventRegistry<Self>) {
            registry.inherit::<Base>(|derived| &derived.base);
            registry.register("pong", |derived, message| {
                Box::pin(async move {
                    derived.pongs.fetch_add(1, Ordering::SeqCst);
                    format!("derived pong {message}")
                })
            });
        }
    }

    fn derived() -> Derived {
        Derived {
            base: Base,
            pongs: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn test_override_keeps_inherited_handlers() {
        let handler = derived();

        let ping = handler.call("ping", "1".to_string()).unwrap().await;
        let pong = handler.call("pong", "2".to_string()).unwrap().await;

        assert_eq!(ping, "base ping 1");
        assert_eq!(pong, "derived pong 2");
        assert_eq!(handler.pongs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_base_unaffected_by_override() {
        let pong = Base.call("pong", "3".to_string()).unwrap().await;
        assert_eq!(pong, "base pong 3");
    }

    #[test]
    fn test_overridden_kind_keeps_position() {
        assert_eq!(derived().handled_events(), vec!["ping", "pong"]);
        assert_eq!(registry_for::<Derived>().len(), 2);
    }

    #[test]
    fn test_registry_is_cached_per_type() {
        let first = registry_for::<Base>();
        let second = registry_for::<Base>();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_unknown_kind() {
        assert!(!Base.handles_event("ghost"));
        assert!(Base.call("ghost", String::new()).is_none());
        assert!(registry_for::<Base>().get_handler("ghost").is_none());
    }

    #[tokio::test]
    async fn test_builder_handler() {
        let handler = HandlerBuilder::new()
            .on(
                "join",
                |room: String| async move { format!("joined {room}") },
            )
            .on_sync("leave", |room: String| format!("left {room}"))
            .build();

        assert!(handler.handles_event("join"));
        assert_eq!(handler.handled_events(), vec!["join", "leave"]);
        assert_eq!(
            handler.call("leave", "lobby".to_string()).unwrap().await,
            "left lobby"
        );
        assert_eq!(
            handler.call("join", "lobby".to_string()).unwrap().await,
            "joined lobby"
        );
        assert!(handler.call("ghost", String::new()).is_none());
    }

    #[tokio::test]
    async fn test_handlers_usable_as_trait_objects() {
        let handlers: Vec<Arc<dyn EventHandler<Message = String, Output = String>>> = vec![
            Arc::new(derived()),
            Arc::new(
                FnHandler::builder()
                    .on_sync("pong", |m: String| format!("closure pong {m}"))
                    .build(),
            ),
        ];

        let mut outputs = Vec::new();
        for handler in &handlers {
            outputs.push(handler.call("pong", "x".to_string()).unwrap().await);
        }
        assert_eq!(outputs, vec!["derived pong x", "closure pong x"]);
    }
}
