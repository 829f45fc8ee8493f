//! Identifier validation.
//!
//! Table and column names are structural SQL text and can never be bound as
//! parameters, so every name that reaches a statement must pass one of these
//! checks first.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

fn safe_identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("identifier pattern is valid"))
}

fn safe_qualified_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_:]+$").expect("qualified name pattern is valid"))
}

/// True iff `name` is non-empty and made only of ASCII letters, digits and `_`.
#[must_use]
pub fn is_safe_identifier(name: &str) -> bool {
    safe_identifier_pattern().is_match(name)
}

/// Like [`is_safe_identifier`] but also accepts the `:` path separator, for
/// qualified model names such as `app::models::Post`.
#[must_use]
pub fn is_safe_qualified_name(name: &str) -> bool {
    safe_qualified_name_pattern().is_match(name)
}

/// Fail with an invalid-argument error unless `name` is a safe identifier.
///
/// `what` names the kind of identifier in the message (`"table"`, `"column"`).
pub fn ensure_identifier(what: &str, name: &str) -> Result<()> {
    if is_safe_identifier(name) {
        Ok(())
    } else {
        Err(Error::invalid_argument(format!("Invalid {what} name: {name}")))
    }
}
