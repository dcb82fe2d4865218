// Configuration management for the Trellis framework
//
// Sources are merged in load order: later files and the environment
// override earlier values, nested tables merge key by key.

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use settings::FrameworkSettings;
pub use validation::{ConfigValidator, Validate};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::Path;
use trellis_core::logging::debug;
use trellis_core::{Container, Router, TypeRegistry};

/// Key of the table loaded into containers by [`ConfigManager::apply_definitions`].
pub const DEFINITIONS_KEY: &str = "definitions";

/// Main configuration manager
#[derive(Debug, Clone, Default)]
pub struct ConfigManager {
    values: Map<String, Value>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read environment variables starting with `{prefix}_`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            values: Map::new(),
            env_prefix: Some(prefix.into()),
        }
    }

    /// Merge the process environment.
    pub fn load_env(&mut self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        let vars = loader.load()?;
        debug!(count = vars.len(), "Loaded configuration from environment");
        self.merge_table(vars);
        Ok(())
    }

    /// Export a `.env` file into the process environment, then merge it.
    ///
    /// Without a path, a missing `.env` in the working directory is ignored.
    pub fn load_dotenv(&mut self, path: Option<&Path>) -> Result<()> {
        match path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
            }
            None => {
                dotenvy::dotenv().ok();
            }
        }
        self.load_env()
    }

    /// Merge a file, detecting the format from its name.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let loader = ConfigLoader::auto(path)?;
        self.load_with(&loader, path)
    }

    pub fn load_file_as(&mut self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        self.load_with(&ConfigLoader::new(format), path.as_ref())
    }

    /// Merge a document held in memory.
    pub fn load_str(&mut self, content: &str, format: FileFormat) -> Result<()> {
        let value = ConfigLoader::new(format).parse(content)?;
        if let Value::Object(table) = value {
            self.merge_table(table);
        }
        Ok(())
    }

    fn load_with(&mut self, loader: &ConfigLoader, path: &Path) -> Result<()> {
        let value = loader.load_file(path)?;
        if let Value::Object(table) = value {
            debug!(path = %path.display(), keys = table.len(), "Loaded configuration file");
            self.merge_table(table);
        }
        Ok(())
    }

    pub fn set<T: serde::Serialize>(&mut self, key: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    /// Typed lookup. `key` may address nested tables with dots (`definitions.host`).
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .lookup(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        serde_json::from_value(value.clone())
            .map_err(|e| ConfigError::DeserializationError(format!("{}: {}", key, e)))
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn has(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Top-level keys.
    pub fn keys(&self) -> Vec<String> {
        self.values.keys().cloned().collect()
    }

    /// Merge another manager's values over this one's.
    pub fn merge(&mut self, other: &ConfigManager) {
        self.merge_table(other.values.clone());
    }

    /// Deserialize the whole configuration into `T` and validate it.
    pub fn load_validated<T: DeserializeOwned + Validate>(&self) -> Result<T> {
        let validated: T = serde_json::from_value(Value::Object(self.values.clone()))
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))?;

        validated.validate()?;
        Ok(validated)
    }

    pub fn settings(&self) -> Result<FrameworkSettings> {
        self.load_validated()
    }

    /// Register the `definitions` table in `container`; returns how many
    /// definitions were loaded (zero when the table is absent).
    pub fn apply_definitions(&self, container: &mut Container) -> Result<usize> {
        let Some(definitions) = self.values.get(DEFINITIONS_KEY) else {
            return Ok(0);
        };

        let count = container.load_definitions(definitions)?;
        Ok(count)
    }

    /// A container configured from these settings, with the definitions
    /// table already applied.
    pub fn build_container(&self, registry: impl TypeRegistry + 'static) -> Result<Container> {
        let settings = self.settings()?;
        let mut container =
            Container::with_registry(registry).with_options(settings.container_options());
        self.apply_definitions(&mut container)?;
        Ok(container)
    }

    /// A router over [`build_container`](Self::build_container).
    pub fn build_router(&self, registry: impl TypeRegistry + 'static) -> Result<Router> {
        let settings = self.settings()?;
        let container = self.build_container(registry)?;
        Ok(Router::with_container(container).with_options(settings.router_options()))
    }

    fn lookup(&self, key: &str) -> Option<&Value> {
        if let Some(value) = self.values.get(key) {
            return Some(value);
        }

        let mut parts = key.split('.');
        let first = self.values.get(parts.next()?)?;
        parts.try_fold(first, |value, part| value.get(part))
    }

    fn merge_table(&mut self, table: Map<String, Value>) {
        for (key, value) in table {
            match self.values.get_mut(&key) {
                Some(existing) => merge_value(existing, value),
                None => {
                    self.values.insert(key, value);
                }
            }
        }
    }
}

fn merge_value(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => merge_value(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, source) => *target = source,
    }
}
