//! Runtime dispatch of wire messages
//!
//! Each dispatch runs four stages and stops at the first failure:
//!
//! 1. decode text/bytes into a JSON value ([`DispatchError::Parse`])
//! 2. read the discriminator field ([`DispatchError::Validation`] when absent)
//! 3. validate against the union member for that kind
//!    ([`DispatchError::UnknownEvent`] or [`DispatchError::Validation`])
//! 4. route to the handler registered for the kind ([`DispatchError::NoHandler`])
//!
//! Every failure goes through the optional error callback before it is
//! returned.

mod dispatcher;
mod error;
mod multi;
mod union;

pub use dispatcher::{Dispatcher, DispatcherConfig, ErrorCallback, Parsed};
pub use error::{DispatchError, FieldError};
pub use multi::{Matcher, MultiDispatcher, SharedHandler};
pub use union::{
    DynamicMessage, Incoming, MessageUnion, ProtocolUnion, TaggedMessage, TypedUnion, UnionSchema,
};
