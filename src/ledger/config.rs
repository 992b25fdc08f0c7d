//! Ledger access configuration

use crate::error::{DocGraphError, DocGraphResult};
use crate::graph::types::Name;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Bounded exponential back-off for transient failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff_ms: 200,
            max_backoff_ms: 5_000,
        }
    }
}

impl RetryConfig {
    /// Delay before retrying after the given failed attempt (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(20);
        let delay = self.initial_backoff_ms.saturating_mul(factor).min(self.max_backoff_ms);
        Duration::from_millis(delay)
    }
}

/// Where the ledger lives and how the client talks to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Chain HTTP API base URL
    pub endpoint: String,
    /// Account holding the `documents` and `edges` tables
    pub contract: Name,
    /// Path receiving unsigned actions for signing and broadcast
    pub push_path: String,
    /// Permission used in action authorizations
    pub permission: Name,
    /// Per-request timeout
    pub timeout_ms: u64,
    /// Rows requested per page of a bulk fetch
    pub page_size: u32,
    /// Row limit of a direction-scoped edge scan
    pub edge_scan_limit: u32,
    pub retry: RetryConfig,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8888".to_string(),
            contract: Name::default(),
            push_path: "/v1/docgraph/push_action".to_string(),
            permission: Name::from_static("active"),
            timeout_ms: 30_000,
            page_size: 1000,
            edge_scan_limit: 1000,
            retry: RetryConfig::default(),
        }
    }
}

impl LedgerConfig {
    pub fn new(endpoint: impl Into<String>, contract: Name) -> Self {
        Self {
            endpoint: endpoint.into(),
            contract,
            ..Default::default()
        }
    }

    pub fn from_yaml_str(yaml: &str) -> DocGraphResult<Self> {
        let config: LedgerConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> DocGraphResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> DocGraphResult<()> {
        if self.contract.is_empty() {
            return Err(DocGraphError::Config("contract account is required".to_string()));
        }
        if self.page_size == 0 {
            return Err(DocGraphError::Config("page_size must be positive".to_string()));
        }
        if self.edge_scan_limit == 0 {
            return Err(DocGraphError::Config("edge_scan_limit must be positive".to_string()));
        }
        if self.retry.max_attempts == 0 {
            return Err(DocGraphError::Config("retry.max_attempts must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn push_url(&self) -> String {
        format!(
            "{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.push_path.trim_start_matches('/')
        )
    }

    pub fn table_url(&self) -> String {
        format!("{}/v1/chain/get_table_rows", self.endpoint.trim_end_matches('/'))
    }
}
