//! Configuration for the permission engine.

use crate::error::{ConfigError, ConfigValidationDetail};
use garde::Validate;
use serde::Deserialize;
use std::path::Path;

/// YAML key under which the engine section may be nested.
pub const SECTION: &str = "rbac";

/// Largest accepted `max_depth`.
pub const MAX_DEPTH_LIMIT: usize = 1024;

fn default_max_depth() -> usize { 32 }

/// How a granted wildcard is interpreted when matching a leaf.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WildcardPolicy {
    /// Plain list membership: a granted `*` only satisfies a `*` leaf.
    #[default]
    Literal,
    /// A granted `*` satisfies every leaf, and a granted
    /// `resource.*.action` satisfies `resource.<id>.action` for any id.
    Expand,
}

/// Engine configuration.
///
/// Every field has a default, so an empty document is valid. Unknown keys
/// are rejected.
///
/// ```yaml
/// rbac:
///   wildcard: literal        # or "expand" (default: literal)
///   verbose_denials: false   # default: false
///   strict_leaves: false     # default: false
///   max_depth: 32            # 1..=1024 (default: 32)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Granted wildcard handling. Default: `literal`.
    #[serde(default)]
    #[garde(skip)]
    pub wildcard: WildcardPolicy,
    /// Collect each `or` branch's denial in `Denial::causes`. Default: false.
    #[serde(default)]
    #[garde(skip)]
    pub verbose_denials: bool,
    /// Require every leaf to be a valid permission identifier. Default: false.
    #[serde(default)]
    #[garde(skip)]
    pub strict_leaves: bool,
    /// Maximum query nesting, counting the root as 1. Default: 32.
    #[serde(default = "default_max_depth")]
    #[garde(range(min = 1, max = 1024))]
    pub max_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            wildcard: WildcardPolicy::default(),
            verbose_denials: false,
            strict_leaves: false,
            max_depth: default_max_depth(),
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the wildcard policy.
    pub fn with_wildcard(mut self, policy: WildcardPolicy) -> Self {
        self.wildcard = policy;
        self
    }

    /// Enable or disable per-branch causes on `or` denials.
    pub fn with_verbose_denials(mut self, enabled: bool) -> Self {
        self.verbose_denials = enabled;
        self
    }

    /// Enable or disable strict leaf checking.
    pub fn with_strict_leaves(mut self, enabled: bool) -> Self {
        self.strict_leaves = enabled;
        self
    }

    /// Set the maximum nesting depth.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Check value constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Validate::validate(self).map_err(|report| {
            let details = report
                .iter()
                .map(|(path, error)| ConfigValidationDetail {
                    key: format!("{SECTION}.{path}"),
                    message: error.message().to_string(),
                })
                .collect();
            ConfigError::Validation(details)
        })
    }

    /// Parse a YAML document, either bare or nested under `rbac:`, and validate it.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let yaml: serde_yaml::Value =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Load(e.to_string()))?;
        let section = yaml.get(SECTION).cloned();
        let section = section.unwrap_or(yaml);

        let config = if section.is_null() {
            Self::default()
        } else {
            serde_yaml::from_value(section).map_err(|e| ConfigError::Load(e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML file. See [`from_yaml_str`](Self::from_yaml_str).
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Load(e.to_string()))?;
        Self::from_yaml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert_eq!(config.wildcard, WildcardPolicy::Literal);
        assert_eq!(config.max_depth, 32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_depth_rejected() {
        let err = EngineConfig::new().with_max_depth(0).validate().unwrap_err();
        match err {
            ConfigError::Validation(details) => {
                assert_eq!(details.len(), 1);
                assert_eq!(details[0].key, "rbac.max_depth");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn depth_limit_is_inclusive() {
        assert!(EngineConfig::new().with_max_depth(MAX_DEPTH_LIMIT).validate().is_ok());
        assert!(EngineConfig::new().with_max_depth(MAX_DEPTH_LIMIT + 1).validate().is_err());
    }

    #[test]
    fn misspelled_key_rejected() {
        let err = EngineConfig::from_yaml_str("max_dept: 4\n").unwrap_err();
        match err {
            ConfigError::Load(msg) => assert!(msg.contains("max_dept"), "{msg}"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
