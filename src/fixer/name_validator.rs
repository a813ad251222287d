//! Rule-identifier naming validation.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BUILT_IN_NAME: Regex = Regex::new(r"^[a-z][a-z0-9_]*$").unwrap();
    static ref CUSTOM_NAME: Regex = Regex::new(r"^[A-Z][a-zA-Z0-9]*/[a-z][a-z0-9_]*$").unwrap();
}

/// Validates fixer names against the naming convention: built-in fixers use
/// bare `snake_case`, custom fixers are namespaced as `Vendor/snake_case`.
#[derive(Debug, Default, Clone)]
pub struct FixerNameValidator;

impl FixerNameValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn is_valid(&self, name: &str, is_custom: bool) -> bool {
        if is_custom {
            CUSTOM_NAME.is_match(name)
        } else {
            BUILT_IN_NAME.is_match(name)
        }
    }
}
