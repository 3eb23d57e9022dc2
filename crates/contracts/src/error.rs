//! Layered error definitions
//!
//! Categorized by source: config / mode / fpn / io

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Rejected mode combination; the previous configuration stays in effect
    #[error("invalid mode configuration: {message}")]
    InvalidModeConfiguration { message: String },

    // ===== FPN Errors =====
    /// FPN table could not be loaded
    #[error("fpn load error for '{path}': {message}")]
    FpnLoad { path: String, message: String },

    /// FPN generation could not be started or finished
    #[error("fpn generation error: {message}")]
    FpnGeneration { message: String },

    // ===== Source Errors =====
    /// Packet source failure
    #[error("packet source '{source_name}' error: {message}")]
    PacketSource {
        source_name: String,
        message: String,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create invalid mode configuration error
    pub fn invalid_mode(message: impl Into<String>) -> Self {
        Self::InvalidModeConfiguration {
            message: message.into(),
        }
    }

    /// Create FPN load error
    pub fn fpn_load(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FpnLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create FPN generation error
    pub fn fpn_generation(message: impl Into<String>) -> Self {
        Self::FpnGeneration {
            message: message.into(),
        }
    }

    /// Create packet source error
    pub fn packet_source(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PacketSource {
            source_name: source_name.into(),
            message: message.into(),
        }
    }
}

/// Result alias for contract-level operations
pub type Result<T> = std::result::Result<T, ContractError>;
