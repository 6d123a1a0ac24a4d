//! Error types for the PSPNet configuration core.
//!
//! Uses `thiserror` for public API error types. Construction-time type
//! mismatches surface as [`ValidationError`]; everything that can go wrong while
//! loading, writing or serializing configuration is wrapped by [`ConfigError`]
//! and the top-level [`PspnetError`].

use std::path::PathBuf;

/// A supplied value could not be coerced to the declared type of a field.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Invalid value for '{field}': expected {expected}, got {value}")]
pub struct ValidationError {
    /// Field name, dotted for nested fields (`dataset.image_size`).
    pub field: String,
    /// Human-readable name of the expected type.
    pub expected: String,
    /// Rendering of the offending value.
    pub value: String,
}

impl ValidationError {
    pub fn new(
        field: impl Into<String>,
        expected: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            value: value.into(),
        }
    }

    /// Prefix the field with the name of the record section it belongs to.
    pub fn in_section(mut self, section: &str) -> Self {
        self.field = format!("{}.{}", section, self.field);
        self
    }
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Configuration file already exists: {path}")]
    AlreadyExists { path: PathBuf },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },

    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
}

/// Top-level error type for the PSPNet core library.
#[derive(Debug, thiserror::Error)]
pub enum PspnetError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),
}

impl From<ValidationError> for PspnetError {
    fn from(err: ValidationError) -> Self {
        Self::Config(ConfigError::Validation(err))
    }
}

/// A type alias for results using the top-level `PspnetError`.
pub type Result<T> = std::result::Result<T, PspnetError>;
