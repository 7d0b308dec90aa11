//! Advice-specific error types.

use ecogarden_core::{AppError, DatabaseError, RusqliteErrorExt};
use thiserror::Error;

use crate::types::Month;

#[derive(Error, Debug)]
pub enum AdviceError {
    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Advice not found: {0}")]
    NotFound(i64),

    #[error("No advice for month {0}")]
    NoAdviceForMonth(Month),

    #[error("Storage error: {0}")]
    Database(#[from] DatabaseError),
}

impl AdviceError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "Invalid advice data.",
            Self::NotFound(_) => "Advice not found.",
            Self::NoAdviceForMonth(_) => "No advice found for the requested month.",
            Self::Database(e) => e.user_message(),
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::NotFound(_) | Self::NoAdviceForMonth(_) => 404,
            Self::Database(_) => 500,
        }
    }
}

impl From<rusqlite::Error> for AdviceError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.into_database_error())
    }
}

impl From<AdviceError> for AppError {
    fn from(err: AdviceError) -> Self {
        match err {
            AdviceError::Database(e) => AppError::Database(e),
            other => AppError::service(other.http_status(), other.to_string(), other.user_message()),
        }
    }
}
