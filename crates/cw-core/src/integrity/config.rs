//! Integrity run configuration.

use serde::{Deserialize, Serialize};

/// Number of executions scanned by default.
pub const DEFAULT_RECENT_EXECUTIONS: usize = 1000;

/// Page size used when walking the whole execution collection.
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Which executions the execution checker examines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ExecutionWindow {
    /// Only the most recent `limit` executions by `execution_date`.
    Recent { limit: usize },
    /// Every execution, fetched `page_size` records at a time.
    Full { page_size: usize },
}

impl Default for ExecutionWindow {
    fn default() -> Self {
        ExecutionWindow::Recent {
            limit: DEFAULT_RECENT_EXECUTIONS,
        }
    }
}

impl ExecutionWindow {
    /// Full scan with the default page size.
    pub fn full() -> Self {
        ExecutionWindow::Full {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            ExecutionWindow::Recent { limit } => format!("most recent {} executions", limit),
            ExecutionWindow::Full { page_size } => {
                format!("all executions (pages of {})", page_size)
            }
        }
    }
}

/// Settings for check runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrityConfig {
    pub execution_window: ExecutionWindow,
}

impl IntegrityConfig {
    pub fn with_execution_window(mut self, window: ExecutionWindow) -> Self {
        self.execution_window = window;
        self
    }

    /// Rejects windows that could never make progress.
    pub fn validate(&self) -> Result<(), String> {
        match self.execution_window {
            ExecutionWindow::Recent { limit: 0 } => {
                Err("execution_window.limit must be greater than 0".to_string())
            }
            ExecutionWindow::Full { page_size: 0 } => {
                Err("execution_window.page_size must be greater than 0".to_string())
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_window_is_recent_thousand() {
        let config = IntegrityConfig::default();
        assert_eq!(
            config.execution_window,
            ExecutionWindow::Recent { limit: 1000 }
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_window_deserialization() {
        let config: IntegrityConfig = serde_json::from_value(json!({
            "execution_window": { "mode": "full", "page_size": 200 }
        }))
        .unwrap();
        assert_eq!(
            config.execution_window,
            ExecutionWindow::Full { page_size: 200 }
        );

        let config: IntegrityConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config, IntegrityConfig::default());
    }

    #[test]
    fn test_zero_sized_windows_rejected() {
        let config =
            IntegrityConfig::default().with_execution_window(ExecutionWindow::Recent { limit: 0 });
        assert!(config.validate().is_err());

        let config = IntegrityConfig::default()
            .with_execution_window(ExecutionWindow::Full { page_size: 0 });
        assert!(config.validate().is_err());
    }
}
