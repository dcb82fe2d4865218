// Configuration validation

use crate::{ConfigError, Result};
use std::fmt::Display;

/// Trait for validating configuration
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Reusable field checks for [`Validate`] implementations
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(invalid(format!("{} cannot be empty", field)));
        }
        Ok(())
    }

    /// Inclusive range check.
    pub fn in_range<T: PartialOrd + Display>(value: T, min: T, max: T, field: &str) -> Result<()> {
        if value < min || value > max {
            return Err(invalid(format!(
                "{} must be between {} and {}, got {}",
                field, min, max, value
            )));
        }
        Ok(())
    }

    pub fn one_of(value: &str, allowed: &[&str], field: &str) -> Result<()> {
        if !allowed.iter().any(|candidate| candidate.eq_ignore_ascii_case(value)) {
            return Err(invalid(format!(
                "{} must be one of [{}], got '{}'",
                field,
                allowed.join(", "),
                value
            )));
        }
        Ok(())
    }

    /// `[A-Za-z_][A-Za-z0-9_]*`, the shape of method and type names.
    pub fn is_identifier(value: &str, field: &str) -> Result<()> {
        let mut chars = value.chars();
        let valid = chars
            .next()
            .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

        if !valid {
            return Err(invalid(format!("{} must be an identifier, got '{}'", field, value)));
        }
        Ok(())
    }

    /// Identifiers joined by `::`.
    pub fn is_path(value: &str, field: &str) -> Result<()> {
        value
            .split("::")
            .try_for_each(|segment| Self::is_identifier(segment, field))
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::ValidationError(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_empty_validation() {
        assert!(ConfigValidator::not_empty("value", "field").is_ok());
        assert!(ConfigValidator::not_empty("  ", "field").is_err());
    }

    #[test]
    fn test_range_validation() {
        assert!(ConfigValidator::in_range(5, 1, 10, "depth").is_ok());
        assert!(ConfigValidator::in_range(1, 1, 10, "depth").is_ok());

        let err = ConfigValidator::in_range(0, 1, 10, "depth").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: depth must be between 1 and 10, got 0"
        );
    }

    #[test]
    fn test_one_of_validation() {
        let allowed = ["json", "plain"];
        assert!(ConfigValidator::one_of("JSON", &allowed, "format").is_ok());
        assert!(ConfigValidator::one_of("xml", &allowed, "format").is_err());
    }

    #[test]
    fn test_identifier_validation() {
        assert!(ConfigValidator::is_identifier("invoke", "action").is_ok());
        assert!(ConfigValidator::is_identifier("_private2", "action").is_ok());
        assert!(ConfigValidator::is_identifier("2fast", "action").is_err());
        assert!(ConfigValidator::is_identifier("", "action").is_err());
        assert!(ConfigValidator::is_identifier("do-it", "action").is_err());
    }

    #[test]
    fn test_path_validation() {
        assert!(ConfigValidator::is_path("app::controllers", "namespace").is_ok());
        assert!(ConfigValidator::is_path("app", "namespace").is_ok());
        assert!(ConfigValidator::is_path("app::", "namespace").is_err());
    }
}
