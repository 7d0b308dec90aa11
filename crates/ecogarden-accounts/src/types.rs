use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AccountError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ROLE_USER")]
    User,
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "ROLE_USER",
            Role::Admin => "ROLE_ADMIN",
        }
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub roles: Vec<Role>,
    /// Home city used for the user's weather lookup
    pub city: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }

    /// Every account holding any role counts as a `User`; admins hold both.
    pub fn has_role(&self, role: Role) -> bool {
        match role {
            Role::User => !self.roles.is_empty(),
            Role::Admin => self.is_admin(),
        }
    }

    /// Fail with `Forbidden` unless the account holds `role`.
    pub fn require_role(&self, role: Role) -> Result<(), AccountError> {
        if self.has_role(role) {
            Ok(())
        } else {
            tracing::warn!("User {} refused: {} required", self.id, role.as_str());
            Err(AccountError::Forbidden(role))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub city: String,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

/// Trim and lowercase an email, rejecting obviously malformed ones.
pub fn normalize_email(raw: &str) -> Result<String, AccountError> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AccountError::validation("email", format!("{raw:?} is not an email address"))),
    }
}

pub fn require_non_blank(field: &'static str, raw: &str) -> Result<String, AccountError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AccountError::validation(field, "is required"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(" User@EcoGardenAPI.com ").unwrap(), "user@ecogardenapi.com");
        assert!(normalize_email("nope").is_err());
        assert!(normalize_email("@domain").is_err());
        assert!(normalize_email("local@").is_err());
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&vec![Role::User, Role::Admin]).unwrap();
        assert_eq!(json, r#"["ROLE_USER","ROLE_ADMIN"]"#);
    }

    fn user_with(roles: Vec<Role>) -> User {
        User {
            id: 1,
            email: "someone@example.com".into(),
            roles,
            city: "Lyon".into(),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_admin_implies_user_role() {
        let admin = user_with(vec![Role::Admin]);
        assert!(admin.require_role(Role::User).is_ok());
        assert!(admin.require_role(Role::Admin).is_ok());

        let user = user_with(vec![Role::User]);
        assert!(user.require_role(Role::User).is_ok());
        assert!(matches!(
            user.require_role(Role::Admin),
            Err(AccountError::Forbidden(Role::Admin))
        ));
    }

    #[test]
    fn test_account_without_roles_is_refused() {
        let nobody = user_with(Vec::new());
        assert!(nobody.require_role(Role::User).is_err());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: 1,
            email: "user@ecogardenapi.com".into(),
            roles: vec![Role::User],
            city: "Paris".into(),
            password_hash: "salt$hash".into(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("salt$hash"));
        assert!(json.contains("Paris"));
    }
}
