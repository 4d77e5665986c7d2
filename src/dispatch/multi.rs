use super::dispatcher::{
    parse_with, report, run_blocking, DispatcherConfig, ErrorCallback, Parsed,
};
use super::error::DispatchError;
use super::union::{Incoming, MessageUnion};
use crate::observability::metrics;
use crate::registry::EventHandler;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, Instrument};

pub type SharedHandler<M, O> = Arc<dyn EventHandler<Message = M, Output = O>>;

/// Decides whether a route is considered for an event kind
#[derive(Clone)]
pub enum Matcher {
    /// Kind starts with the given prefix, e.g. `chat.`
    Prefix(String),
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl Matcher {
    pub fn matches(&self, kind: &str) -> bool {
        match self {
            Matcher::Prefix(prefix) => kind.starts_with(prefix.as_str()),
            Matcher::Predicate(predicate) => predicate(kind),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Prefix(prefix) => f.debug_tuple("Prefix").field(prefix).finish(),
            Matcher::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Dispatcher that routes to one of several handlers
///
/// A route is taken when its matcher accepts the kind *and* its handler
/// claims the kind. Routes are tried in insertion order, then the default
/// handler under the same rule.
pub struct MultiDispatcher<U: MessageUnion, O> {
    union: U,
    routes: Vec<(Matcher, SharedHandler<U::Message, O>)>,
    default: Option<SharedHandler<U::Message, O>>,
    config: DispatcherConfig,
    on_error: Option<ErrorCallback>,
}

impl<U, O> MultiDispatcher<U, O>
where
    U: MessageUnion,
    O: Send + 'static,
{
    pub fn new(union: U) -> Self {
        Self {
            union,
            routes: Vec::new(),
            default: None,
            config: DispatcherConfig::default(),
            on_error: None,
        }
    }

    /// Route kinds starting with `prefix` to `handler`
    pub fn route_prefix<H>(self, prefix: impl Into<String>, handler: Arc<H>) -> Self
    where
        H: EventHandler<Message = U::Message, Output = O> + 'static,
    {
        self.route(Matcher::Prefix(prefix.into()), handler)
    }

    /// Route kinds accepted by `predicate` to `handler`
    pub fn route_when<P, H>(self, predicate: P, handler: Arc<H>) -> Self
    where
        P: Fn(&str) -> bool + Send + Sync + 'static,
        H: EventHandler<Message = U::Message, Output = O> + 'static,
    {
        self.route(Matcher::Predicate(Arc::new(predicate)), handler)
    }

    pub fn route<H>(mut self, matcher: Matcher, handler: Arc<H>) -> Self
    where
        H: EventHandler<Message = U::Message, Output = O> + 'static,
    {
        let handler: SharedHandler<U::Message, O> = handler;
        self.routes.push((matcher, handler));
        self
    }

    pub fn with_default<H>(mut self, handler: Arc<H>) -> Self
    where
        H: EventHandler<Message = U::Message, Output = O> + 'static,
    {
        let handler: SharedHandler<U::Message, O> = handler;
        self.default = Some(handler);
        self
    }

    pub fn with_config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(&DispatchError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(callback));
        self
    }

    /// Handler that would receive `kind`, if any
    pub fn find_handler(&self, kind: &str) -> Option<&SharedHandler<U::Message, O>> {
        self.routes
            .iter()
            .find(|(matcher, handler)| matcher.matches(kind) && handler.handles_event(kind))
            .map(|(_, handler)| handler)
            .or_else(|| {
                self.default
                    .as_ref()
                    .filter(|handler| handler.handles_event(kind))
            })
    }

    pub fn parse(&self, input: impl Into<Incoming>) -> Result<Parsed<U::Message>, DispatchError> {
        parse_with(&self.union, &self.config, input.into())
            .map_err(|e| report(e, self.on_error.as_ref()))
    }

    pub async fn dispatch(&self, input: impl Into<Incoming>) -> Result<O, DispatchError> {
        let Parsed { kind, message } = self.parse(input)?;

        let span = crate::dispatch_span!(event_kind = %kind);
        let pending = self
            .find_handler(&kind)
            .and_then(|handler| handler.call(&kind, message));
        let Some(pending) = pending else {
            let _guard = span.enter();
            return Err(report(
                DispatchError::NoHandler { event_kind: kind },
                self.on_error.as_ref(),
            ));
        };

        let started = Instant::now();
        let output = pending.instrument(span).await;
        debug!(event_kind = %kind, "Dispatched message");
        metrics().record_dispatch_success(&kind, started.elapsed());
        Ok(output)
    }

    pub fn dispatch_sync(&self, input: impl Into<Incoming>) -> Result<O, DispatchError> {
        run_blocking(self.dispatch(input))
            .unwrap_or_else(|e| Err(report(e, self.on_error.as_ref())))
    }
}
