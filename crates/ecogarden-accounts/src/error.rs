//! Account-specific error types.

use ecogarden_core::{AppError, DatabaseError, RusqliteErrorExt};
use thiserror::Error;

use crate::types::Role;

#[derive(Error, Debug)]
pub enum AccountError {
    #[error("Invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("Email already in use: {0}")]
    EmailTaken(String),

    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Access denied: {} required", .0.as_str())]
    Forbidden(Role),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Storage error: {0}")]
    Database(#[from] DatabaseError),
}

impl AccountError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "Invalid data. Email, password and city are required.",
            Self::EmailTaken(_) => "This email is already in use.",
            Self::NotFound(_) => "User not found.",
            Self::InvalidCredentials => "Access denied, you must be logged in.",
            Self::Forbidden(Role::Admin) => "Access denied, you must be an administrator.",
            Self::Forbidden(Role::User) => "Access denied, you must be logged in.",
            Self::PasswordHash(_) => "Unable to process the password. Please try again.",
            Self::Database(e) => e.user_message(),
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::InvalidCredentials => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::EmailTaken(_) => 409,
            Self::PasswordHash(_) | Self::Database(_) => 500,
        }
    }
}

impl From<rusqlite::Error> for AccountError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.into_database_error())
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Database(e) => AppError::Database(e),
            other => AppError::service(other.http_status(), other.to_string(), other.user_message()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AccountError::validation("email", "missing").http_status(), 400);
        assert_eq!(AccountError::EmailTaken("a@b.c".into()).http_status(), 409);
        assert_eq!(AccountError::NotFound("3".into()).http_status(), 404);
        assert_eq!(AccountError::InvalidCredentials.http_status(), 401);
        assert_eq!(AccountError::Forbidden(Role::Admin).http_status(), 403);
    }

    #[test]
    fn test_forbidden_names_role() {
        let err = AccountError::Forbidden(Role::Admin);
        assert_eq!(err.to_string(), "Access denied: ROLE_ADMIN required");
        assert_eq!(err.user_message(), "Access denied, you must be an administrator.");
    }

    #[test]
    fn test_conflict_into_app_error() {
        let err: AppError = AccountError::EmailTaken("a@b.c".into()).into();
        assert_eq!(err.http_status(), 409);
        assert_eq!(err.user_message(), "This email is already in use.");
    }
}
