//! Store configuration.

use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Authentication configuration for Elasticsearch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ElasticAuth {
    /// Basic username/password authentication.
    Basic {
        /// The username for basic auth.
        username: String,
        /// The password for basic auth.
        password: String,
    },
    /// Bearer token authentication.
    Bearer {
        /// The bearer token.
        token: String,
    },
}

/// Configuration for the Elasticsearch identity store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Elasticsearch node URL (e.g., `http://localhost:9200`).
    pub endpoint: String,

    /// Name of the index holding the user documents (default: `"users"`).
    /// Must match `[a-z0-9_-]+`.
    #[serde(default = "default_index_name")]
    pub index_name: String,

    /// Logical entity name recorded in the index mapping metadata
    /// (default: `"user"`). Must match `[a-z0-9_-]+`.
    #[serde(default = "default_entity_name")]
    pub entity_name: String,

    /// Delete and rebuild the index on startup (default: false).
    /// For test and seed scenarios only — this destroys all stored users.
    #[serde(default)]
    pub force_recreate: bool,

    /// Request timeout in milliseconds (default: 30000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Optional authentication.
    #[serde(default)]
    pub auth: Option<ElasticAuth>,

    /// Whether to disable certificate validation (default: false).
    /// Only use for development/testing.
    #[serde(default)]
    pub disable_certificate_validation: bool,
}

fn default_index_name() -> String {
    "users".to_string()
}

fn default_entity_name() -> String {
    "user".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9200".to_string(),
            index_name: default_index_name(),
            entity_name: default_entity_name(),
            force_recreate: false,
            request_timeout_ms: default_request_timeout_ms(),
            auth: None,
            disable_certificate_validation: false,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration for the given endpoint with default names.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Validates the configured names.
    ///
    /// Index and entity names end up in request paths and mapping metadata,
    /// so they are restricted to lowercase letters, digits, `-` and `_`.
    pub fn validate(&self) -> StoreResult<()> {
        if self.endpoint.is_empty() {
            return Err(StoreError::InvalidArgument("endpoint"));
        }
        validate_name("index name", &self.index_name)?;
        validate_name("entity name", &self.entity_name)?;
        Ok(())
    }
}

fn validate_name(field: &'static str, value: &str) -> StoreResult<()> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidName {
            field,
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.endpoint, "http://localhost:9200");
        assert_eq!(config.index_name, "users");
        assert_eq!(config.entity_name, "user");
        assert!(!config.force_recreate);
        assert_eq!(config.request_timeout_ms, 30000);
        assert!(config.auth.is_none());
    }

    #[test]
    fn test_config_deserialization_applies_defaults() {
        let config: StoreConfig =
            serde_json::from_str(r#"{ "endpoint": "http://es:9200" }"#).unwrap();
        assert_eq!(config.endpoint, "http://es:9200");
        assert_eq!(config.index_name, "users");
        assert_eq!(config.entity_name, "user");
        assert!(!config.disable_certificate_validation);
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = StoreConfig {
            index_name: "accounts".to_string(),
            force_recreate: true,
            auth: Some(ElasticAuth::Basic {
                username: "elastic".to_string(),
                password: "changeme".to_string(),
            }),
            ..StoreConfig::default()
        };

        let json = serde_json::to_string(&config).unwrap();
        let deserialized: StoreConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.index_name, "accounts");
        assert!(deserialized.force_recreate);
        assert!(matches!(deserialized.auth, Some(ElasticAuth::Basic { .. })));
    }

    #[test]
    fn test_validate_accepts_restricted_charset() {
        for name in ["users", "users_tests", "some-index", "hello2"] {
            let config = StoreConfig {
                index_name: name.to_string(),
                ..StoreConfig::default()
            };
            assert!(config.validate().is_ok(), "expected '{name}' to validate");
        }
    }

    #[test]
    fn test_validate_rejects_bad_names() {
        for name in ["", "Hello", "foo bar", "users!", "Ümlaut"] {
            let config = StoreConfig {
                index_name: name.to_string(),
                ..StoreConfig::default()
            };
            let result = config.validate();
            assert!(
                matches!(result, Err(StoreError::InvalidName { .. })),
                "expected '{name}' to be rejected"
            );
        }
    }

    #[test]
    fn test_validate_rejects_bad_entity_name() {
        let config = StoreConfig {
            entity_name: "User Profile".to_string(),
            ..StoreConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StoreError::InvalidName { field: "entity name", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_empty_endpoint() {
        let config = StoreConfig {
            endpoint: String::new(),
            ..StoreConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StoreError::InvalidArgument("endpoint"))
        ));
    }
}
