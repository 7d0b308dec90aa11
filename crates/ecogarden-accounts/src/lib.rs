//! User accounts for EcoGarden: registration, roles and home city.

pub mod error;
pub mod password;
pub mod store;
pub mod types;

pub use error::AccountError;
pub use store::{AccountResult, SqliteUserStore};
pub use types::{NewUser, Role, User, UserUpdate};
