//! Identifier checks for SQL that must interpolate names.
//!
//! Table and column names cannot be bound as parameters, so any name taken
//! from an evidence database is validated here before it is quoted into a
//! statement.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref IDENTIFIER: Regex =
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,63}$").expect("identifier pattern must compile");
}

/// Whether `name` is a plain identifier: a letter or underscore followed by
/// up to 63 letters, digits or underscores.
pub fn is_safe_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Double-quote a validated identifier, or `None` if it fails validation.
pub fn quote_identifier(name: &str) -> Option<String> {
    if is_safe_identifier(name) {
        Some(format!("\"{}\"", name))
    } else {
        None
    }
}
