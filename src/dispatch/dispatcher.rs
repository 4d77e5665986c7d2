use super::error::{describe, DispatchError, FieldError};
use super::union::{Incoming, MessageUnion};
use crate::observability::metrics;
use crate::registry::EventHandler;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::{Handle, RuntimeFlavor};
use tracing::{debug, warn, Instrument};

/// Receives every dispatch failure before it is returned to the caller
pub type ErrorCallback = Arc<dyn Fn(&DispatchError) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Report unknown kinds as `UnknownEvent` rather than a validation failure
    pub strict: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self { strict: true }
    }
}

/// A message that made it through decoding and validation
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<M> {
    pub kind: String,
    pub message: M,
}

/// Decode, discriminate, validate and decode into the union's message type
pub(crate) fn parse_with<U: MessageUnion>(
    union: &U,
    config: &DispatcherConfig,
    input: Incoming,
) -> Result<Parsed<U::Message>, DispatchError> {
    let value = input.decode()?;
    let schema = union.schema();
    let discriminator = schema.discriminator();
    let pointer = format!("/{discriminator}");

    let Value::Object(object) = &value else {
        return Err(DispatchError::Parse {
            message: format!("message must be a JSON object, got {}", describe(&value)),
        });
    };

    let kind = match object.get(discriminator) {
        Some(Value::String(kind)) => kind.clone(),
        Some(other) => {
            return Err(DispatchError::validation(
                format!("discriminator field '{discriminator}' is not a string"),
                vec![FieldError::new(pointer, "string", describe(other))],
            ))
        }
        None => {
            return Err(DispatchError::validation(
                format!("missing discriminator field '{discriminator}'"),
                vec![FieldError::new(pointer, "string", "missing")],
            ))
        }
    };

    if !schema.contains(&kind) && config.strict {
        return Err(DispatchError::UnknownEvent { event_kind: kind });
    }

    if let Err(errors) = schema.validate(&kind, &value) {
        return Err(DispatchError::validation(
            format!("'{kind}' failed validation with {} error(s)", errors.len()),
            errors,
        ));
    }

    let message = union.decode(&kind, value)?;
    Ok(Parsed { kind, message })
}

/// Drive `future` to completion from synchronous code
///
/// Inside a multi-threaded tokio runtime the current worker is handed off
/// with `block_in_place`; outside any runtime a current-thread runtime with
/// timers and IO enabled is built for the call. A current-thread runtime
/// cannot be blocked on from within itself, so that case is an error.
pub(crate) fn run_blocking<F: Future>(future: F) -> Result<F::Output, DispatchError> {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            Ok(tokio::task::block_in_place(|| handle.block_on(future)))
        }
        Ok(_) => Err(DispatchError::Runtime {
            message: "cannot block inside a current-thread runtime, await dispatch instead"
                .to_string(),
        }),
        Err(_) => {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| DispatchError::Runtime {
                    message: format!("failed to start runtime: {e}"),
                })?;
            Ok(runtime.block_on(future))
        }
    }
}

/// Log, count and forward a failure, then hand it back
pub(crate) fn report(error: DispatchError, on_error: Option<&ErrorCallback>) -> DispatchError {
    warn!(
        error_kind = error.label(),
        event_kind = error.event_kind().unwrap_or(""),
        error = %error,
        "Dispatch failed"
    );
    metrics().record_dispatch_failure(error.label());
    if let Some(callback) = on_error {
        callback(&error);
    }
    error
}

/// Routes validated messages to a single handler
///
/// Stateless between calls: each `dispatch` is one decode → discriminate →
/// validate → route cycle, and the first failing stage ends it.
pub struct Dispatcher<U, H: ?Sized> {
    union: U,
    handler: Arc<H>,
    config: DispatcherConfig,
    on_error: Option<ErrorCallback>,
}

impl<U, H> Dispatcher<U, H>
where
    U: MessageUnion,
    H: EventHandler<Message = U::Message> + ?Sized,
{
    pub fn new(union: U, handler: Arc<H>) -> Self {
        Self {
            union,
            handler,
            config: DispatcherConfig::default(),
            on_error: None,
        }
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

    pub fn union(&self) -> &U {
        &self.union
    }

    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    /// Run the first three stages only
    pub fn parse(&self, input: impl Into<Incoming>) -> Result<Parsed<U::Message>, DispatchError> {
        parse_with(&self.union, &self.config, input.into())
            .map_err(|e| report(e, self.on_error.as_ref()))
    }

    pub async fn dispatch(&self, input: impl Into<Incoming>) -> Result<H::Output, DispatchError> {
        let Parsed { kind, message } = self.parse(input)?;

        let span = crate::dispatch_span!(event_kind = %kind);
        let Some(pending) = self.handler.call(&kind, message) else {
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

    /// Blocking variant of [`Self::dispatch`], see [`run_blocking`]
    pub fn dispatch_sync(&self, input: impl Into<Incoming>) -> Result<H::Output, DispatchError> {
        run_blocking(self.dispatch(input))
            .unwrap_or_else(|e| Err(report(e, self.on_error.as_ref())))
    }
}
