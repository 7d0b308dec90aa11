//! Gardening advice tagged by the months it applies to.

pub mod error;
pub mod fixtures;
pub mod store;
pub mod types;

pub use error::AdviceError;
pub use fixtures::{default_advice, seed_fixtures};
pub use store::{AdviceResult, SqliteAdviceStore};
pub use types::{Advice, AdviceUpdate, Month, NewAdvice};
