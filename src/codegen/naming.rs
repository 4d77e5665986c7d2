//! Name derivations shared by the emitters
//!
//! Every function here is pure and depends only on its input, which keeps the
//! generated output stable across runs.

use once_cell::sync::Lazy;
use regex::Regex;

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern",
    "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub",
    "ref", "return", "self", "static", "struct", "super", "trait", "true", "type", "unsafe", "use",
    "where", "while", "abstract", "become", "box", "do", "final", "macro", "override", "priv",
    "try", "typeof", "unsized", "virtual", "yield",
];

fn split_words(name: &str) -> impl Iterator<Item = &str> {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
}

/// `chat.message` -> `ChatMessage`, `user_joined` -> `UserJoined`
pub fn pascal_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for part in split_words(name) {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
    }
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// `userId` -> `user_id`, `room-name` -> `room_name`
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut previous_lower = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if ch.is_ascii_uppercase() && previous_lower && !out.ends_with('_') {
                out.push('_');
            }
            previous_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
            out.push(ch.to_ascii_lowercase());
        } else {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            previous_lower = false;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    if out.is_empty() || out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Handler slot name: dots and dashes become underscores, lowercased, `on_` prefix
pub fn handler_slot(event_name: &str) -> String {
    format!("on_{}", event_name.replace(['.', '-'], "_").to_lowercase())
}

/// Rust field identifier, escaped with `r#` when it is a keyword
pub fn rust_field_ident(name: &str) -> String {
    let ident = snake_case(name);
    if is_rust_keyword(&ident) {
        // `self`, `super` and `crate` cannot be raw identifiers
        if matches!(ident.as_str(), "self" | "super" | "crate") {
            format!("{ident}_")
        } else {
            format!("r#{ident}")
        }
    } else {
        ident
    }
}

pub fn is_rust_keyword(ident: &str) -> bool {
    RUST_KEYWORDS.contains(&ident)
}

pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// `send` + `ChatMessage` -> `sendChatMessage`
pub fn ts_method(prefix: &str, class_name: &str) -> String {
    format!("{prefix}{class_name}")
}

/// Quote a string for Rust or TypeScript source
pub fn quoted(value: &str) -> String {
    // Debug escapes (`\n`, `\"`, `\u{1}`) are valid in both targets
    format!("{value:?}")
}
