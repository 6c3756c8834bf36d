//! Configuration module
//!
//! This module provides configuration structures for the relay server: listener
//! settings, the three external base URLs, per-dependency timeouts, list retry
//! policy, signature processing thresholds and the origins remote signatures
//! may be fetched from.

use std::env;

use crate::error::AppError;

// Common constants
const SERVER_PORT: u16 = 4000;
const GATEWAY_TIMEOUT_SECS: u64 = 30;
const DOWNSTREAM_TIMEOUT_SECS: u64 = 30;
const LIST_MAX_ATTEMPTS: u32 = 3;
const LIST_RETRY_BASE_MS: u64 = 1000;
const TTD_UPPER_THRESHOLD: u8 = 235;
const TTD_LOWER_THRESHOLD: u8 = 35;
const MAX_REQUEST_BODY_MB: usize = 25;
const MAX_ATTACHMENT_SIZE_MB: usize = 5;
const ATTACHMENT_ALLOWED_EXTENSIONS: &str = "jpg,jpeg,png,webp,gif,pdf";

pub const LIST_API_URL: &str = "LIST_API_URL";
pub const SUBMISSION_API_URL: &str = "SUBMISSION_API_URL";
pub const STORAGE_GATEWAY_URL: &str = "STORAGE_GATEWAY_URL";
pub const TTD_SOURCE_ALLOWED_ORIGINS: &str = "TTD_SOURCE_ALLOWED_ORIGINS";

const BYTES_PER_MB: usize = 1024 * 1024;

/// Listener and environment settings
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub max_request_body_bytes: usize,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            server_port: SERVER_PORT,
            cors_origins: vec!["*".to_string()],
            environment: "development".to_string(),
            max_request_body_bytes: MAX_REQUEST_BODY_MB * BYTES_PER_MB,
        }
    }
}

/// Relay configuration: where the external services live and how to talk to them.
///
/// Base URLs are optional at startup. Each request checks the URL it needs and
/// fails with a configuration error instead of calling a placeholder host.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub base: BaseConfig,
    pub list_api_url: Option<String>,
    pub submission_api_url: Option<String>,
    pub storage_gateway_url: Option<String>,
    pub gateway_timeout_secs: u64,
    pub downstream_timeout_secs: u64,
    pub list_max_attempts: u32,
    pub list_retry_base_ms: u64,
    pub ttd_upper_threshold: u8,
    pub ttd_lower_threshold: u8,
    pub max_attachment_size_bytes: usize,
    pub attachment_allowed_extensions: Vec<String>,
    /// Origins (`scheme://host[:port]`) a `ttd_source_url` may point at, in
    /// addition to the storage gateway's own origin.
    pub ttd_source_allowed_origins: Vec<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            base: BaseConfig::default(),
            list_api_url: None,
            submission_api_url: None,
            storage_gateway_url: None,
            gateway_timeout_secs: GATEWAY_TIMEOUT_SECS,
            downstream_timeout_secs: DOWNSTREAM_TIMEOUT_SECS,
            list_max_attempts: LIST_MAX_ATTEMPTS,
            list_retry_base_ms: LIST_RETRY_BASE_MS,
            ttd_upper_threshold: TTD_UPPER_THRESHOLD,
            ttd_lower_threshold: TTD_LOWER_THRESHOLD,
            max_attachment_size_bytes: MAX_ATTACHMENT_SIZE_MB * BYTES_PER_MB,
            attachment_allowed_extensions: split_list(ATTACHMENT_ALLOWED_EXTENSIONS),
            ttd_source_allowed_origins: Vec::new(),
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug, Default)]
pub struct Config(pub Box<RelayConfig>);

impl Config {
    fn as_relay(&self) -> &RelayConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.as_relay().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = RelayConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.as_relay().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.as_relay().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.as_relay().base.environment
    }

    pub fn max_request_body_bytes(&self) -> usize {
        self.as_relay().base.max_request_body_bytes
    }

    pub fn list_api_url(&self) -> Option<&str> {
        self.as_relay().list_api_url.as_deref()
    }

    pub fn submission_api_url(&self) -> Option<&str> {
        self.as_relay().submission_api_url.as_deref()
    }

    pub fn storage_gateway_url(&self) -> Option<&str> {
        self.as_relay().storage_gateway_url.as_deref()
    }

    pub fn gateway_timeout_secs(&self) -> u64 {
        self.as_relay().gateway_timeout_secs
    }

    pub fn downstream_timeout_secs(&self) -> u64 {
        self.as_relay().downstream_timeout_secs
    }

    pub fn list_max_attempts(&self) -> u32 {
        self.as_relay().list_max_attempts
    }

    pub fn list_retry_base_ms(&self) -> u64 {
        self.as_relay().list_retry_base_ms
    }

    pub fn ttd_upper_threshold(&self) -> u8 {
        self.as_relay().ttd_upper_threshold
    }

    pub fn ttd_lower_threshold(&self) -> u8 {
        self.as_relay().ttd_lower_threshold
    }

    pub fn max_attachment_size_bytes(&self) -> usize {
        self.as_relay().max_attachment_size_bytes
    }

    pub fn attachment_allowed_extensions(&self) -> &[String] {
        &self.as_relay().attachment_allowed_extensions
    }

    pub fn ttd_source_allowed_origins(&self) -> &[String] {
        &self.as_relay().ttd_source_allowed_origins
    }

    pub fn require_list_api_url(&self) -> Result<&str, AppError> {
        require(self.list_api_url(), LIST_API_URL)
    }

    pub fn require_submission_api_url(&self) -> Result<&str, AppError> {
        require(self.submission_api_url(), SUBMISSION_API_URL)
    }

    pub fn require_storage_gateway_url(&self) -> Result<&str, AppError> {
        require(self.storage_gateway_url(), STORAGE_GATEWAY_URL)
    }
}

fn require<'a>(value: Option<&'a str>, name: &str) -> Result<&'a str, AppError> {
    value.ok_or_else(|| AppError::Configuration(format!("{} is not configured", name)))
}

/// Reads an env var, treating blank values as unset.
fn non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Reads a size in megabytes and converts it to bytes, rejecting values that
/// do not fit in `usize`.
fn megabytes_env(name: &str, default_mb: usize) -> Result<usize, anyhow::Error> {
    let mb = env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default_mb);
    megabytes_to_bytes(name, mb)
}

fn megabytes_to_bytes(name: &str, mb: usize) -> Result<usize, anyhow::Error> {
    mb.checked_mul(BYTES_PER_MB)
        .ok_or_else(|| anyhow::anyhow!("{} ({} MB) is too large", name, mb))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
            max_request_body_bytes: megabytes_env("MAX_REQUEST_BODY_MB", MAX_REQUEST_BODY_MB)?,
        };

        let config = RelayConfig {
            base,
            list_api_url: non_empty_env(LIST_API_URL),
            submission_api_url: non_empty_env(SUBMISSION_API_URL),
            storage_gateway_url: non_empty_env(STORAGE_GATEWAY_URL),
            gateway_timeout_secs: env::var("GATEWAY_TIMEOUT_SECS")
                .unwrap_or_else(|_| GATEWAY_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(GATEWAY_TIMEOUT_SECS),
            downstream_timeout_secs: env::var("DOWNSTREAM_TIMEOUT_SECS")
                .unwrap_or_else(|_| DOWNSTREAM_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(DOWNSTREAM_TIMEOUT_SECS),
            list_max_attempts: env::var("LIST_MAX_ATTEMPTS")
                .unwrap_or_else(|_| LIST_MAX_ATTEMPTS.to_string())
                .parse()
                .unwrap_or(LIST_MAX_ATTEMPTS),
            list_retry_base_ms: env::var("LIST_RETRY_BASE_MS")
                .unwrap_or_else(|_| LIST_RETRY_BASE_MS.to_string())
                .parse()
                .unwrap_or(LIST_RETRY_BASE_MS),
            ttd_upper_threshold: env::var("TTD_UPPER_THRESHOLD")
                .unwrap_or_else(|_| TTD_UPPER_THRESHOLD.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("TTD_UPPER_THRESHOLD must be between 0 and 255"))?,
            ttd_lower_threshold: env::var("TTD_LOWER_THRESHOLD")
                .unwrap_or_else(|_| TTD_LOWER_THRESHOLD.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("TTD_LOWER_THRESHOLD must be between 0 and 255"))?,
            max_attachment_size_bytes: megabytes_env(
                "MAX_ATTACHMENT_SIZE_MB",
                MAX_ATTACHMENT_SIZE_MB,
            )?,
            attachment_allowed_extensions: split_list(
                &env::var("ATTACHMENT_ALLOWED_EXTENSIONS")
                    .unwrap_or_else(|_| ATTACHMENT_ALLOWED_EXTENSIONS.to_string()),
            ),
            ttd_source_allowed_origins: non_empty_env(TTD_SOURCE_ALLOWED_ORIGINS)
                .map(|raw| split_list(&raw))
                .unwrap_or_default(),
        };

        Ok(config)
    }
}
