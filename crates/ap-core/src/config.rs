//! Configuration types and loading
//!
//! Settings start from their defaults and are overridden by environment
//! variables. Hosts may override individual values afterwards (e.g. from
//! command-line flags).

use serde::{Deserialize, Serialize};

use crate::types::RecordRef;

/// Default allow-list for uploads
pub const DEFAULT_ALLOWED_FILE_TYPES: &str = "jpg,jpeg,png,gif,pdf,docx,xlsx,pptx,txt,mp4";

/// Default upload limit in megabytes
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 10;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Remote record-storage API
    pub webapi: WebApiConfig,

    /// Control options (size limit, allow-list, preview)
    pub control: ControlConfig,

    /// Owning record, when the host supplies it up front
    pub record: RecordConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebApiConfig {
    /// Service root, e.g. `https://org.crm.dynamics.com/api/data/v9.2`
    pub base_url: String,
    /// Bearer token sent with every request
    pub access_token: Option<String>,
}

impl Default for WebApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api/data/v9.2".to_string(),
            access_token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ControlConfig {
    /// Maximum upload size in megabytes
    pub max_file_size_mb: u64,
    /// Comma-separated list of allowed extensions
    pub allowed_file_types: String,
    /// Whether inline preview is offered
    pub show_preview: bool,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE_MB,
            allowed_file_types: DEFAULT_ALLOWED_FILE_TYPES.to_string(),
            show_preview: true,
        }
    }
}

impl ControlConfig {
    /// Allowed extensions, trimmed and lowercased, empty entries dropped
    pub fn allowed_extensions(&self) -> Vec<String> {
        self.allowed_file_types
            .split(',')
            .map(|ext| ext.trim().to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RecordConfig {
    pub entity_name: Option<String>,
    pub record_id: Option<String>,
}

impl RecordConfig {
    /// Build a record reference; missing parts stay empty
    pub fn to_record_ref(&self) -> RecordRef {
        RecordRef::new(
            self.entity_name.clone().unwrap_or_default(),
            self.record_id.clone().unwrap_or_default(),
        )
    }
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable not set: {0}")]
    MissingEnvVar(String),
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // Web API
        if let Some(url) = lookup("DATAVERSE_URL") {
            config.webapi.base_url = url;
        }
        if let Some(token) = lookup("DATAVERSE_TOKEN") {
            config.webapi.access_token = Some(token);
        }

        // Control
        if let Some(size) = lookup("ATTACHMENTS_MAX_FILE_SIZE_MB") {
            config.control.max_file_size_mb =
                size.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: "ATTACHMENTS_MAX_FILE_SIZE_MB".to_string(),
                    message: format!("expected a whole number of megabytes, got {:?}", size),
                })?;
        }
        if let Some(types) = lookup("ATTACHMENTS_ALLOWED_FILE_TYPES") {
            config.control.allowed_file_types = types;
        }
        if let Some(v) = lookup("ATTACHMENTS_SHOW_PREVIEW") {
            config.control.show_preview = parse_bool("ATTACHMENTS_SHOW_PREVIEW", &v)?;
        }

        // Record
        config.record.entity_name = lookup("ATTACHMENTS_ENTITY").filter(|v| !v.is_empty());
        config.record.record_id = lookup("ATTACHMENTS_RECORD_ID").filter(|v| !v.is_empty());

        Ok(config)
    }

    /// Fail when no access token is configured
    pub fn require_access_token(&self) -> Result<&str, ConfigError> {
        self.webapi
            .access_token
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnvVar("DATAVERSE_TOKEN".to_string()))
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got {:?}", other),
        }),
    }
}
