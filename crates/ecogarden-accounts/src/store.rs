//! SQLite-backed user accounts.

use chrono::{DateTime, Utc};
use ecogarden_core::DatabaseError;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::error::AccountError;
use crate::password::{hash_password, verify_password};
use crate::types::{normalize_email, require_non_blank, NewUser, Role, User, UserUpdate};

pub type AccountResult<T> = Result<T, AccountError>;

const USER_COLUMNS: &str = "id, email, roles, city, password_hash, created_at";

/// SQLite user store. Safe to share between threads.
pub struct SqliteUserStore {
    conn: Mutex<Connection>,
}

impl SqliteUserStore {
    pub fn new<P: AsRef<Path>>(path: P) -> AccountResult<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    pub fn in_memory() -> AccountResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> AccountResult<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email TEXT NOT NULL UNIQUE,
                roles TEXT NOT NULL DEFAULT '[]',
                city TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an account with the `User` role.
    pub fn register(&self, input: &NewUser) -> AccountResult<User> {
        self.insert(input, &[Role::User])
    }

    fn insert(&self, input: &NewUser, roles: &[Role]) -> AccountResult<User> {
        let email = normalize_email(&input.email)?;
        let password = require_non_blank("password", &input.password)?;
        let city = require_non_blank("city", &input.city)?;

        let conn = self.conn.lock();
        if Self::find_id_by_email(&conn, &email)?.is_some() {
            return Err(AccountError::EmailTaken(email));
        }

        let now = Utc::now();
        let roles_json = serde_json::to_string(roles)
            .map_err(|e| AccountError::validation("roles", e.to_string()))?;
        let password_hash = hash_password(&password)?;

        conn.execute(
            "INSERT INTO users (email, roles, city, password_hash, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![email, roles_json, city, password_hash, now.to_rfc3339()],
        )?;
        let id = conn.last_insert_rowid();

        tracing::info!("Registered user {} ({})", id, email);
        Ok(User {
            id,
            email,
            roles: roles.to_vec(),
            city,
            password_hash,
            created_at: now,
        })
    }

    pub fn get(&self, id: i64) -> AccountResult<Option<User>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            UserRow::from_row,
        )
        .optional()?
        .map(UserRow::into_user)
        .transpose()
    }

    pub fn find_by_email(&self, email: &str) -> AccountResult<Option<User>> {
        let email = normalize_email(email)?;
        let conn = self.conn.lock();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
            params![email],
            UserRow::from_row,
        )
        .optional()?
        .map(UserRow::into_user)
        .transpose()
    }

    /// Apply a partial update. Changing the email to one owned by another account fails.
    pub fn update(&self, id: i64, changes: &UserUpdate) -> AccountResult<User> {
        let mut user = self
            .get(id)?
            .ok_or_else(|| AccountError::NotFound(id.to_string()))?;

        if let Some(email) = &changes.email {
            user.email = normalize_email(email)?;
        }
        if let Some(city) = &changes.city {
            user.city = require_non_blank("city", city)?;
        }
        if let Some(password) = changes.password.as_deref().filter(|p| !p.is_empty()) {
            user.password_hash = hash_password(password)?;
        }

        let conn = self.conn.lock();
        if let Some(owner) = Self::find_id_by_email(&conn, &user.email)? {
            if owner != id {
                return Err(AccountError::EmailTaken(user.email));
            }
        }

        conn.execute(
            "UPDATE users SET email = ?1, city = ?2, password_hash = ?3 WHERE id = ?4",
            params![user.email, user.city, user.password_hash, id],
        )?;

        tracing::info!("Updated user {}", id);
        Ok(user)
    }

    pub fn delete(&self, id: i64) -> AccountResult<()> {
        let deleted = self
            .conn
            .lock()
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(AccountError::NotFound(id.to_string()));
        }
        tracing::info!("Deleted user {}", id);
        Ok(())
    }

    /// Return the user if `password` matches. Unknown or malformed emails give `None`.
    pub fn verify_credentials(&self, email: &str, password: &str) -> AccountResult<Option<User>> {
        if normalize_email(email).is_err() {
            return Ok(None);
        }
        Ok(self
            .find_by_email(email)?
            .filter(|user| verify_password(password, &user.password_hash)))
    }

    pub fn count(&self) -> AccountResult<usize> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Create the default user and admin accounts when the store is empty.
    pub fn seed_fixtures(&self) -> AccountResult<usize> {
        if self.count()? > 0 {
            return Ok(0);
        }

        self.insert(
            &NewUser {
                email: "user@ecogardenapi.com".to_string(),
                password: "user".to_string(),
                city: "Paris".to_string(),
            },
            &[Role::User],
        )?;
        self.insert(
            &NewUser {
                email: "admin@ecogardenapi.com".to_string(),
                password: "admin".to_string(),
                city: "New-York".to_string(),
            },
            &[Role::Admin],
        )?;
        tracing::info!("Seeded default accounts");
        Ok(2)
    }

    fn find_id_by_email(conn: &Connection, email: &str) -> AccountResult<Option<i64>> {
        conn.query_row(
            "SELECT id FROM users WHERE email = ?1",
            params![email],
            |row| row.get(0),
        )
        .optional()
        .map_err(AccountError::from)
    }
}

/// Raw `users` row before role and timestamp decoding.
struct UserRow {
    id: i64,
    email: String,
    roles: String,
    city: String,
    password_hash: String,
    created_at: String,
}

impl UserRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            email: row.get(1)?,
            roles: row.get(2)?,
            city: row.get(3)?,
            password_hash: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    /// Decode stored roles and timestamp. Unreadable values are corruption, not defaults.
    fn into_user(self) -> AccountResult<User> {
        let roles = serde_json::from_str(&self.roles).map_err(|e| {
            DatabaseError::Corruption(format!("roles of user {}: {}", self.id, e))
        })?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                DatabaseError::Corruption(format!("created_at of user {}: {}", self.id, e))
            })?;

        Ok(User {
            id: self.id,
            email: self.email,
            roles,
            city: self.city,
            password_hash: self.password_hash,
            created_at,
        })
    }
}
