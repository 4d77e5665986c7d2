//! Crate-level error type
//!
//! Each subsystem has its own error enum; [`Error`] wraps them so callers
//! that drive several stages (the CLI, the demo service) can use `?`
//! throughout.

use crate::codegen::GenerateError;
use crate::config::ConfigError;
use crate::dispatch::DispatchError;
use crate::schema::SchemaError;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

const MAX_PUBLIC_MESSAGE_LEN: usize = 500;

static ABSOLUTE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:/[A-Za-z0-9._-]+){2,}/?").expect("absolute path pattern is valid")
});

/// Main error type for eventwire operations
#[derive(Debug, Error)]
pub enum Error {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Generation error: {0}")]
    Generate(#[from] GenerateError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },
}

impl Error {
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Message safe to hand to remote callers
    pub fn public_message(&self) -> String {
        sanitize_error_message(&self.to_string())
    }
}

/// Redact filesystem paths and bound the length
fn sanitize_error_message(message: &str) -> String {
    let mut sanitized = ABSOLUTE_PATH.replace_all(message, "<path>").to_string();

    if sanitized.len() > MAX_PUBLIC_MESSAGE_LEN {
        let truncate_suffix = "...[truncated]";
        let mut cut = MAX_PUBLIC_MESSAGE_LEN - truncate_suffix.len();
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized = format!("{}{}", &sanitized[..cut], truncate_suffix);
    }

    sanitized
}

/// Result type for eventwire operations
pub type Result<T> = std::result::Result<T, Error>;
