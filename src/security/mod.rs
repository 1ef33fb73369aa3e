//! Security utilities and validation functions.
//!
//! This module provides security-related functionality including:
//! - The read policy (size bound, credential files, carve keywords)
//! - Identifier validation for dynamically built SQL
//! - Path validation to keep collection roots inside the home directory

pub mod identifier;
pub mod path_validator;
pub mod policy;

pub use identifier::{is_safe_identifier, quote_identifier};
pub use path_validator::{resolve_under, validate_db_path, validate_relative_path};
pub use policy::{log_security_event, SecurityEvent, SecurityPolicy};
