//! Configuration validation for Checkwise.
//!
//! Everything a run needs is checked up front so a bad configuration fails
//! before the first request reaches the backend.

use crate::config::AppConfig;
use colored::Colorize;
use tracing::Level;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Errors that prevent a run.
    pub errors: Vec<String>,
    /// Warnings that should be addressed but don't prevent a run.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Prints the validation result to the console.
    pub fn print(&self) {
        if !self.warnings.is_empty() {
            println!();
            println!("{}", "Configuration Warnings:".yellow().bold());
            for warning in &self.warnings {
                println!("  {} {}", "⚠".yellow(), warning);
            }
        }

        if !self.errors.is_empty() {
            println!();
            println!("{}", "Configuration Errors:".red().bold());
            for error in &self.errors {
                println!("  {} {}", "✗".red(), error);
            }
        }

        if self.errors.is_empty() && self.warnings.is_empty() {
            println!("  {} Configuration OK", "✓".green());
        }
    }
}

/// Validates application configuration before a run.
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &AppConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        Self::validate_gateway(config, &mut result);
        Self::validate_integrity(config, &mut result);
        Self::validate_entitlements(config, &mut result);
        Self::validate_logging(config, &mut result);

        result
    }

    fn validate_gateway(config: &AppConfig, result: &mut ValidationResult) {
        let gateway = &config.gateway;

        if gateway.base_url.is_empty() {
            result.add_error("gateway.base_url is not set");
        } else if let Err(e) = gateway.to_rest().validate() {
            result.add_error(e.to_string());
        } else if gateway.app_id.trim().is_empty() {
            result.add_error("gateway.app_id is not set");
        }

        if gateway.api_key.is_empty() {
            result.add_warning(
                "gateway.api_key is empty. Requests will be sent unauthenticated \
                 (set CHECKWISE_API_KEY or gateway.api_key).",
            );
        }

        if gateway.base_url.starts_with("http://") && !is_local(&gateway.base_url) {
            result.add_warning(format!(
                "gateway.base_url '{}' is not HTTPS; the API key is sent in clear text",
                gateway.base_url
            ));
        }
    }

    fn validate_integrity(config: &AppConfig, result: &mut ValidationResult) {
        if let Err(e) = config.integrity.validate() {
            result.add_error(format!("integrity: {}", e));
        }
    }

    fn validate_entitlements(config: &AppConfig, result: &mut ValidationResult) {
        if let Err(e) = config.entitlements() {
            result.add_error(format!("entitlements: {}", e));
        }
    }

    fn validate_logging(config: &AppConfig, result: &mut ValidationResult) {
        if config.logging.level.parse::<Level>().is_err() {
            result.add_warning(format!(
                "logging.level '{}' is not a valid level; falling back to info",
                config.logging.level
            ));
        }
    }
}

fn is_local(url: &str) -> bool {
    let host = url
        .trim_start_matches("http://")
        .split(['/', ':'])
        .next()
        .unwrap_or_default();
    matches!(host, "localhost" | "127.0.0.1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use cw_core::integrity::ExecutionWindow;
    use std::collections::BTreeMap;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.gateway.base_url = "https://api.example.com".to_string();
        config.gateway.app_id = "routines".to_string();
        config.gateway.api_key = "key".to_string();
        config
    }

    #[test]
    fn test_valid_config() {
        let result = ConfigValidator::validate(&valid_config());
        assert!(!result.has_errors());
        assert!(!result.has_warnings());
    }

    #[test]
    fn test_default_config_has_errors() {
        let result = ConfigValidator::validate(&AppConfig::default());
        assert!(result.has_errors());
        assert!(result.errors.iter().any(|e| e.contains("base_url")));
    }

    #[test]
    fn test_invalid_scheme() {
        let mut config = valid_config();
        config.gateway.base_url = "ftp://api.example.com".to_string();

        let result = ConfigValidator::validate(&config);
        assert!(result.has_errors());
    }

    #[test]
    fn test_missing_app_id() {
        let mut config = valid_config();
        config.gateway.app_id = String::new();

        let result = ConfigValidator::validate(&config);
        assert!(result.has_errors());
    }

    #[test]
    fn test_plain_http_warns_unless_local() {
        let mut config = valid_config();
        config.gateway.base_url = "http://api.example.com".to_string();
        assert!(ConfigValidator::validate(&config).has_warnings());

        config.gateway.base_url = "http://localhost:4000".to_string();
        assert!(!ConfigValidator::validate(&config).has_warnings());
    }

    #[test]
    fn test_zero_page_size() {
        let mut config = valid_config();
        config.integrity.execution_window = ExecutionWindow::Full { page_size: 0 };

        let result = ConfigValidator::validate(&config);
        assert!(result.errors.iter().any(|e| e.starts_with("integrity")));
    }

    #[test]
    fn test_unknown_tier_in_matrix() {
        let mut config = valid_config();
        let mut names = BTreeMap::new();
        names.insert("enterprise".to_string(), vec![]);
        config.entitlements = Some(names);

        let result = ConfigValidator::validate(&config);
        assert!(result.errors.iter().any(|e| e.starts_with("entitlements")));
    }

    #[test]
    fn test_bad_log_level_warns() {
        let mut config = valid_config();
        config.logging.level = "loud".to_string();

        let result = ConfigValidator::validate(&config);
        assert!(!result.has_errors());
        assert!(result.has_warnings());
    }
}
