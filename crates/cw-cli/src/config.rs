//! Configuration loading for the Checkwise CLI.

use anyhow::{Context, Result};
use cw_core::entitlements::{EntitlementError, Entitlements, TierMatrix};
use cw_core::gateway::RestGatewayConfig;
use cw_core::integrity::IntegrityConfig;
use cw_observability::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

const REDACTED: &str = "***REDACTED***";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend connection settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Check run settings.
    #[serde(default)]
    pub integrity: IntegrityConfig,

    /// Tier name → feature names. Replaces the built-in matrix when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entitlements: Option<BTreeMap<String, Vec<String>>>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Creates a copy with secrets redacted.
    pub fn redact_secrets(&self) -> Self {
        let mut config = self.clone();
        if !config.gateway.api_key.is_empty() {
            config.gateway.api_key = REDACTED.to_string();
        }
        config
    }

    /// Builds the entitlement service, using the configured matrix if any.
    pub fn entitlements(&self) -> Result<Entitlements, EntitlementError> {
        let matrix = match &self.entitlements {
            Some(names) => TierMatrix::from_names(names)?,
            None => TierMatrix::default(),
        };
        Ok(Entitlements::new(matrix))
    }
}

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the backend API.
    #[serde(default)]
    pub base_url: String,

    /// Application identifier.
    #[serde(default)]
    pub app_id: String,

    /// API key. Empty means unauthenticated.
    #[serde(default)]
    pub api_key: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            app_id: String::new(),
            api_key: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

impl GatewayConfig {
    pub fn to_rest(&self) -> RestGatewayConfig {
        let mut rest = RestGatewayConfig::new(&self.base_url, &self.app_id);
        rest.api_key = (!self.api_key.is_empty()).then(|| self.api_key.clone());
        rest.timeout_secs = self.timeout_secs;
        rest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cw_core::integrity::ExecutionWindow;
    use cw_core::{Feature, Tier, User};
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.gateway.timeout_secs, 30);
        assert_eq!(
            config.integrity.execution_window,
            ExecutionWindow::Recent { limit: 1000 }
        );
        assert!(config.entitlements.is_none());
    }

    #[test]
    fn test_redact_secrets() {
        let mut config = AppConfig::default();
        config.gateway.api_key = "secret-key".to_string();

        let redacted = config.redact_secrets();
        assert_eq!(redacted.gateway.api_key, "***REDACTED***");
        assert_eq!(config.gateway.api_key, "secret-key");
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
gateway:
  base_url: https://api.example.com/
  app_id: routines-prod
  api_key: abc123

integrity:
  execution_window:
    mode: full
    page_size: 250

entitlements:
  free: []
  pro: [analytics, audit_logging]
  pro_plus: [analytics, audit_logging, data_integrity]

logging:
  level: debug
  json_format: true
"#;

        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.gateway.app_id, "routines-prod");
        assert_eq!(
            config.integrity.execution_window,
            ExecutionWindow::Full { page_size: 250 }
        );
        assert!(config.logging.json_format);

        let rest = config.gateway.to_rest();
        assert_eq!(rest.base_url, "https://api.example.com");
        assert_eq!(rest.api_key.as_deref(), Some("abc123"));

        let entitlements = config.entitlements().unwrap();
        let pro_user = User::new("u1", "a@x.com").with_tier(Tier::Pro);
        assert!(entitlements.is_allowed(&pro_user, Feature::AuditLogging));
        assert!(!entitlements.is_allowed(&pro_user, Feature::CsvExport));
    }

    #[test]
    fn test_unknown_feature_in_matrix() {
        let mut config = AppConfig::default();
        let mut names = BTreeMap::new();
        names.insert("pro".to_string(), vec!["teleportation".to_string()]);
        config.entitlements = Some(names);

        assert!(config.entitlements().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "gateway:\n  base_url: http://localhost:4000\n  app_id: dev").unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.gateway.base_url, "http://localhost:4000");
        assert!(config.gateway.api_key.is_empty());
    }

    #[test]
    fn test_load_missing_file() {
        let err = AppConfig::load(Path::new("/nonexistent/checkwise.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
