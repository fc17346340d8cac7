// SPDX-License-Identifier: MIT OR Apache-2.0

//! FireSync Core Error Types
//!
//! Error taxonomy for a collection sync pass. Fatal errors (configuration,
//! credentials, token exchange, fetch) abort the current collection;
//! per-document errors are caught by the driver loop and never propagate
//! past the document that raised them.

use thiserror::Error;

/// Result type for FireSync operations
pub type FireSyncResult<T> = Result<T, FireSyncError>;

/// FireSync error types
#[derive(Error, Debug)]
pub enum FireSyncError {
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        config_key: Option<String>,
    },

    #[error("Credential error: {message}")]
    Credential {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Token exchange failed: {message}")]
    TokenExchange { message: String },

    #[error("Fetch failed: {message}")]
    Fetch {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Transformation '{name}' failed on field '{field}': {message}")]
    Transform {
        name: String,
        field: String,
        message: String,
    },

    #[error("Table error: {message}")]
    Table {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

// Custom error creation helpers
impl FireSyncError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            config_key: None,
        }
    }

    /// Create a configuration error with a specific key
    pub fn configuration_with_key(
        message: impl Into<String>,
        config_key: impl Into<String>,
    ) -> Self {
        Self::Configuration {
            message: message.into(),
            config_key: Some(config_key.into()),
        }
    }

    /// Create a credential error
    pub fn credential(message: impl Into<String>) -> Self {
        Self::Credential {
            message: message.into(),
            source: None,
        }
    }

    /// Create a credential error with source
    pub fn credential_with_source(
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Credential {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a token exchange error
    pub fn token_exchange(message: impl Into<String>) -> Self {
        Self::TokenExchange {
            message: message.into(),
        }
    }

    /// Create a fetch error
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch {
            message: message.into(),
            source: None,
        }
    }

    /// Create a fetch error with source
    pub fn fetch_with_source(
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Fetch {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a transformation error
    pub fn transform(
        name: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Transform {
            name: name.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a table error
    pub fn table(message: impl Into<String>) -> Self {
        Self::Table {
            message: message.into(),
            source: None,
        }
    }

    /// Create a table error with source
    pub fn table_with_source(
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Table {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a generic error from a string
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }

    /// `true` for errors that abort the current collection's pass.
    ///
    /// Per-document errors (transformation and table failures) are caught
    /// by the driver loop; everything else is fatal for the collection.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            FireSyncError::Transform { .. } | FireSyncError::Table { .. }
        )
    }
}
