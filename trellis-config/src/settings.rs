// Framework settings read from configuration

use crate::validation::{ConfigValidator, Validate};
use crate::Result;
use serde::{Deserialize, Serialize};
use trellis_core::logging::{LogConfig, LogFormat, LogLevel};
use trellis_core::{ContainerOptions, RouterOptions, DEFAULT_ACTION, DEFAULT_MAX_DEPTH};

/// Upper bound accepted for `max_depth`.
pub const MAX_DEPTH_LIMIT: usize = 4096;

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "warning", "error"];
const LOG_FORMATS: [&str; 4] = ["json", "plain", "pretty", "compact"];

/// Top-level settings understood by the framework.
///
/// Unknown keys (including the `definitions` table) are ignored, so the same
/// document can carry settings and definitions side by side:
///
/// ```toml
/// max_depth = 32
/// controller_namespace = "app"
/// log_level = "debug"
///
/// [definitions]
/// greeting = "hello"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkSettings {
    pub max_depth: usize,
    pub controller_namespace: Option<String>,
    pub default_action: String,
    pub log_level: String,
    pub log_format: String,
}

impl Default for FrameworkSettings {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            controller_namespace: None,
            default_action: DEFAULT_ACTION.to_string(),
            log_level: "info".to_string(),
            log_format: "json".to_string(),
        }
    }
}

impl FrameworkSettings {
    pub fn container_options(&self) -> ContainerOptions {
        ContainerOptions {
            max_depth: self.max_depth,
        }
    }

    pub fn router_options(&self) -> RouterOptions {
        RouterOptions {
            controller_namespace: self
                .controller_namespace
                .clone()
                .filter(|namespace| !namespace.is_empty()),
            default_action: self.default_action.clone(),
        }
    }

    /// Logging configuration; names that fail to parse keep the defaults.
    pub fn log_config(&self) -> LogConfig {
        let mut config = LogConfig::new();
        if let Some(level) = LogLevel::parse(&self.log_level) {
            config = config.level(level);
        }
        if let Some(format) = LogFormat::parse(&self.log_format) {
            config = config.format(format);
        }
        config
    }
}

impl Validate for FrameworkSettings {
    fn validate(&self) -> Result<()> {
        ConfigValidator::in_range(self.max_depth, 1, MAX_DEPTH_LIMIT, "max_depth")?;
        ConfigValidator::is_identifier(&self.default_action, "default_action")?;
        if let Some(namespace) = self.controller_namespace.as_deref() {
            if !namespace.is_empty() {
                ConfigValidator::is_path(namespace, "controller_namespace")?;
            }
        }
        ConfigValidator::one_of(&self.log_level, &LOG_LEVELS, "log_level")?;
        ConfigValidator::one_of(&self.log_format, &LOG_FORMATS, "log_format")?;
        Ok(())
    }
}
