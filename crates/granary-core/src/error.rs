//! Error types for granary-core

use thiserror::Error;

/// Result type alias for granary-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in granary-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Failed to parse YAML configuration
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// A database connection could not be established
    #[error("connection to '{endpoint}' failed: {message}")]
    Connection {
        /// Endpoint the connection was attempted against
        endpoint: String,
        /// Description of the failure
        message: String,
    },

    /// A query failed to execute or its result could not be decoded
    #[error("query failed: {message}")]
    Query {
        /// Description of the failure
        message: String,
    },

    /// A delimited file could not be read or its delimiter inferred
    #[error("failed to parse '{path}': {message}")]
    Parse {
        /// Path of the offending file
        path: String,
        /// Description of the failure
        message: String,
    },

    /// A required column is absent, or a table shape invariant was violated
    #[error("schema validation failed: {message}")]
    Schema {
        /// Description of what's invalid
        message: String,
    },

    /// A value could not be converted to the requested type
    #[error("cannot convert value in column '{column}': {message}")]
    Coercion {
        /// Column the value belongs to
        column: String,
        /// Description of the failed conversion
        message: String,
    },

    /// Persisting rows into a warehouse table failed
    #[error("load into table '{table}' failed: {message}")]
    Load {
        /// Target warehouse table
        table: String,
        /// Description of the failure
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a [`Error::Schema`] about a missing column.
    pub fn missing_column(column: &str) -> Self {
        Self::Schema {
            message: format!("column '{column}' does not exist"),
        }
    }
}
