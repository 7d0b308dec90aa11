//! Centralized error types for the EcoGarden backend.
//!
//! Domain crates (weather, advice, accounts) keep their own error enums and
//! convert into [`AppError`] at the binary boundary. This module provides:
//! - the shared infrastructure errors (database, config)
//! - a user-facing message for each error
//! - the HTTP status an API layer would answer with

use thiserror::Error;

/// Top-level application error type.
///
/// Use `user_message()` to get a message suitable for end users and
/// `http_status()` for the transport-level status code.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Service-level errors (weather, advice, accounts) mapped from domain crates.
    #[error("{message}")]
    Service {
        status: u16,
        message: String,
        user_message: &'static str,
    },

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Build a service error from a domain crate.
    pub fn service(status: u16, message: impl Into<String>, user_message: &'static str) -> Self {
        AppError::Service {
            status,
            message: message.into(),
            user_message,
        }
    }

    /// Returns a user-friendly message.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Database(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Io(_) => "A file operation failed. Please try again.",
            AppError::Service { user_message, .. } => *user_message,
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }

    /// HTTP status code an API layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::Service { status, .. } => *status,
            AppError::Config(_)
            | AppError::Database(_)
            | AppError::Io(_)
            | AppError::Other(_) => 500,
        }
    }
}

/// Database/storage errors (SQLite).
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Data corruption detected: {0}")]
    Corruption(String),

    #[error("Constraint violated: {0}")]
    ConstraintViolation(String),
}

impl DatabaseError {
    pub fn user_message(&self) -> &'static str {
        match self {
            DatabaseError::ConnectionFailed(_) => {
                "Unable to access stored data. Try restarting the service."
            }
            DatabaseError::QueryFailed(_) => "A data operation failed. Please try again.",
            DatabaseError::Corruption(_) => {
                "Stored data may be corrupted. Consider resetting the database."
            }
            DatabaseError::ConstraintViolation(_) => {
                "The data conflicts with an existing record."
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::Invalid(_) => "Invalid configuration. Check your settings.",
            ConfigError::ParseError(_) => "Configuration file is malformed. Check your settings.",
        }
    }
}

/// Extension trait for converting rusqlite errors to our error types.
pub trait RusqliteErrorExt {
    fn into_database_error(self) -> DatabaseError;
}

impl RusqliteErrorExt for rusqlite::Error {
    fn into_database_error(self) -> DatabaseError {
        match &self {
            rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("corrupt") => {
                DatabaseError::Corruption(self.to_string())
            }
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                DatabaseError::ConstraintViolation(self.to_string())
            }
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::CannotOpen =>
            {
                DatabaseError::ConnectionFailed(self.to_string())
            }
            _ => DatabaseError::QueryFailed(self.to_string()),
        }
    }
}
