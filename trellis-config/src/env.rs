// Environment variable loading

use crate::{ConfigError, Result};
use serde_json::{Map, Value};
use std::env;

/// Separator that nests a variable into a table: `DATABASE__HOST`
/// becomes `{"database": {"host": ..}}`.
pub const NESTING_SEPARATOR: &str = "__";

/// Environment variable loader
///
/// Keys are lowercased, stripped of the prefix and nested on
/// [`NESTING_SEPARATOR`]. Values are typed the same way as `.env` files,
/// see [`scalar_value`].
#[derive(Debug, Clone, Default)]
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self::new(Some(prefix.into()))
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Load the process environment.
    pub fn load(&self) -> Result<Map<String, Value>> {
        Ok(self.collect(env::vars()))
    }

    /// Build a table from `(name, value)` pairs, applying the prefix filter.
    pub fn collect<I>(&self, vars: I) -> Map<String, Value>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut table = Map::new();

        for (name, value) in vars {
            let Some(key) = self.strip_prefix(&name) else {
                continue;
            };
            if key.is_empty() {
                continue;
            }
            insert_nested(&mut table, &key.to_lowercase(), scalar_value(&value));
        }

        table
    }

    /// Load one variable, adding the prefix.
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = match self.prefix {
            Some(ref prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        };

        env::var(&full_key).map_err(ConfigError::EnvError)
    }

    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }

    fn strip_prefix<'a>(&self, name: &'a str) -> Option<&'a str> {
        match self.prefix {
            Some(ref prefix) => name
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('_')),
            None => Some(name),
        }
    }
}

/// Type a raw string the way environment-style sources are read:
/// `true`/`false` become booleans, integers and floats become numbers when
/// they print back exactly as written (so `01234` and `+5` stay strings),
/// anything else stays a string.
pub fn scalar_value(raw: &str) -> Value {
    let raw = raw.trim();

    if raw.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(int) = raw.parse::<i64>()
        && int.to_string() == raw
    {
        return Value::from(int);
    }
    if raw.contains('.')
        && let Ok(float) = raw.parse::<f64>()
        && float.to_string() == raw
        && let Some(number) = serde_json::Number::from_f64(float)
    {
        return Value::Number(number);
    }

    Value::String(raw.to_string())
}

/// Insert `value` at `key`, creating tables for each `__`-separated part.
pub(crate) fn insert_nested(table: &mut Map<String, Value>, key: &str, value: Value) {
    match key.split_once(NESTING_SEPARATOR) {
        Some((head, rest)) if !head.is_empty() && !rest.is_empty() => {
            let entry = table
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(nested) = entry {
                insert_nested(nested, rest, value);
            }
        }
        _ => {
            table.insert(key.to_string(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_prefix_filters_and_strips() {
        let loader = EnvLoader::with_prefix("TRELLIS");
        let table = loader.collect(vars(&[
            ("TRELLIS_MAX_DEPTH", "32"),
            ("TRELLISX_OTHER", "no"),
            ("HOME", "/root"),
        ]));

        assert_eq!(Value::Object(table), json!({"max_depth": 32}));
    }

    #[test]
    fn test_nested_keys() {
        let loader = EnvLoader::with_prefix("APP");
        let table = loader.collect(vars(&[
            ("APP_DEFINITIONS__HOST", "db.local"),
            ("APP_DEFINITIONS__PORT", "5432"),
        ]));

        assert_eq!(
            Value::Object(table),
            json!({"definitions": {"host": "db.local", "port": 5432}})
        );
    }

    #[test]
    fn test_scalar_typing() {
        assert_eq!(scalar_value("TRUE"), json!(true));
        assert_eq!(scalar_value("-7"), json!(-7));
        assert_eq!(scalar_value("0.25"), json!(0.25));
        assert_eq!(scalar_value("v1.2.3"), json!("v1.2.3"));
        assert_eq!(scalar_value(" text "), json!("text"));
    }

    #[test]
    fn test_scalar_typing_keeps_non_canonical_numbers() {
        assert_eq!(scalar_value("01234"), json!("01234"));
        assert_eq!(scalar_value("+5"), json!("+5"));
        assert_eq!(scalar_value("1.50"), json!("1.50"));
        assert_eq!(scalar_value("0"), json!(0));
        assert_eq!(scalar_value("-0.5"), json!(-0.5));
    }

    #[test]
    fn test_missing_var_uses_default() {
        let loader = EnvLoader::new(None);
        assert_eq!(loader.load_var_or("TRELLIS_NONEXISTENT_12345", "fallback"), "fallback");

        let loader = EnvLoader::with_prefix("TRELLIS_TEST");
        assert!(loader.load_var("MISSING_67890").is_err());
    }
}
