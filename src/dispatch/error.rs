use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// One field-level validation problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// JSON pointer to the offending value, e.g. `/room`
    pub path: String,
    /// Constraint that was not met
    pub expected: String,
    /// Short description of what was found
    pub received: String,
}

impl FieldError {
    pub fn new(
        path: impl Into<String>,
        expected: impl Into<String>,
        received: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            expected: expected.into(),
            received: received.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() {
            "/"
        } else {
            &self.path
        };
        write!(
            f,
            "at '{}': expected {}, received {}",
            path, self.expected, self.received
        )
    }
}

/// Every way a dispatch can fail
#[derive(Debug, Clone, Error)]
pub enum DispatchError {
    #[error("Failed to decode message: {message}")]
    Parse { message: String },

    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("Unknown event kind '{event_kind}'")]
    UnknownEvent { event_kind: String },

    #[error("No handler registered for event kind '{event_kind}'")]
    NoHandler { event_kind: String },

    /// The union itself could not be built
    #[error("Invalid message union: {message}")]
    Schema { message: String },

    /// A blocking dispatch could not get a runtime to drive the handler
    #[error("Dispatch runtime unavailable: {message}")]
    Runtime { message: String },
}

impl DispatchError {
    pub fn validation(message: impl Into<String>, errors: Vec<FieldError>) -> Self {
        DispatchError::Validation {
            message: message.into(),
            errors,
        }
    }

    /// Field errors of a validation failure, empty otherwise
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            DispatchError::Validation { errors, .. } => errors,
            _ => &[],
        }
    }

    pub fn event_kind(&self) -> Option<&str> {
        match self {
            DispatchError::UnknownEvent { event_kind }
            | DispatchError::NoHandler { event_kind } => Some(event_kind),
            _ => None,
        }
    }

    /// Stable label used in logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            DispatchError::Parse { .. } => "parse",
            DispatchError::Validation { .. } => "validation",
            DispatchError::UnknownEvent { .. } => "unknown_event",
            DispatchError::NoHandler { .. } => "no_handler",
            DispatchError::Schema { .. } => "schema",
            DispatchError::Runtime { .. } => "runtime",
        }
    }
}

/// `string "lobby"`, `integer 3`, `object with 2 keys`, ...
pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) if n.is_i64() || n.is_u64() => format!("integer {n}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(s) if s.chars().count() > 40 => {
            let head: String = s.chars().take(40).collect();
            format!("string \"{head}...\"")
        }
        Value::String(s) => format!("string {s:?}"),
        Value::Array(items) => format!("array of {} items", items.len()),
        Value::Object(map) => format!("object with {} keys", map.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_describe() {
        assert_eq!(describe(&json!(null)), "null");
        assert_eq!(describe(&json!(3)), "integer 3");
        assert_eq!(describe(&json!(1.5)), "number 1.5");
        assert_eq!(describe(&json!("lobby")), "string \"lobby\"");
        assert_eq!(describe(&json!([1, 2])), "array of 2 items");
        assert_eq!(describe(&json!({"a": 1})), "object with 1 keys");
    }

    #[test]
    fn test_field_error_display() {
        let error = FieldError::new("/room", "type string", "integer 3");
        assert_eq!(
            error.to_string(),
            "at '/room': expected type string, received integer 3"
        );
    }

    #[test]
    fn test_labels_and_kinds() {
        let err = DispatchError::NoHandler {
            event_kind: "join".to_string(),
        };
        assert_eq!(err.label(), "no_handler");
        assert_eq!(err.event_kind(), Some("join"));
        assert!(err.field_errors().is_empty());
        assert_eq!(
            err.to_string(),
            "No handler registered for event kind 'join'"
        );
    }
}
