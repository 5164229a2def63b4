// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration for the CloudOS client.

use std::time::Duration;

use crate::error::{Result, SdkError};

/// Default CloudOS deployment.
pub const DEFAULT_BASE_URL: &str = "https://cloudos.lifebit.ai";

/// Configuration for the CloudosClient.
#[derive(Debug, Clone)]
pub struct SdkConfig {
    /// CloudOS base URL, without an API path.
    pub base_url: String,
    /// API key sent with every request.
    pub api_key: String,
    /// Workspace (team) ID every request is scoped to.
    pub workspace_id: String,
    /// Skip TLS certificate verification (development only).
    pub skip_cert_verification: bool,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Request timeout.
    pub request_timeout: Duration,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            workspace_id: String::new(),
            skip_cert_verification: false,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl SdkConfig {
    /// Create a configuration for the default deployment.
    pub fn new(api_key: impl Into<String>, workspace_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            workspace_id: workspace_id.into(),
            ..Self::default()
        }
    }

    /// Create a configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CLOUDOS_APIKEY`: API key (required)
    /// - `CLOUDOS_WORKSPACE_ID`: Workspace ID (required)
    /// - `CLOUDOS_URL`: Base URL (default: "https://cloudos.lifebit.ai")
    /// - `CLOUDOS_SKIP_CERT_VERIFICATION`: Skip TLS verification (default: "false")
    /// - `CLOUDOS_CONNECT_TIMEOUT_MS`: Connection timeout in milliseconds (default: 10000)
    /// - `CLOUDOS_REQUEST_TIMEOUT_MS`: Request timeout in milliseconds (default: 30000)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("CLOUDOS_APIKEY")
            .ok_or_else(|| SdkError::Config("CLOUDOS_APIKEY is required".to_string()))?;

        let workspace_id = lookup("CLOUDOS_WORKSPACE_ID")
            .ok_or_else(|| SdkError::Config("CLOUDOS_WORKSPACE_ID is required".to_string()))?;

        let base_url = lookup("CLOUDOS_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let skip_cert_verification = lookup("CLOUDOS_SKIP_CERT_VERIFICATION")
            .map(|v| v.to_lowercase() == "true" || v == "1")
            .unwrap_or(false);

        let connect_timeout_ms: u64 = lookup("CLOUDOS_CONNECT_TIMEOUT_MS")
            .unwrap_or_else(|| "10000".to_string())
            .parse()
            .map_err(|e| SdkError::Config(format!("invalid CLOUDOS_CONNECT_TIMEOUT_MS: {}", e)))?;

        let request_timeout_ms: u64 = lookup("CLOUDOS_REQUEST_TIMEOUT_MS")
            .unwrap_or_else(|| "30000".to_string())
            .parse()
            .map_err(|e| SdkError::Config(format!("invalid CLOUDOS_REQUEST_TIMEOUT_MS: {}", e)))?;

        Ok(Self {
            base_url,
            api_key,
            workspace_id,
            skip_cert_verification,
            connect_timeout: Duration::from_millis(connect_timeout_ms),
            request_timeout: Duration::from_millis(request_timeout_ms),
        })
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Enable or disable certificate verification skipping.
    pub fn with_skip_cert_verification(mut self, skip: bool) -> Self {
        self.skip_cert_verification = skip;
        self
    }

    /// Set the connection timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Full URL for an API path.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
