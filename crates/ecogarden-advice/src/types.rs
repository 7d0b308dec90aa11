use chrono::{DateTime, Datelike, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AdviceError;

/// Month of the year, 1 (January) to 12 (December).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Month(u8);

impl Month {
    pub fn new(value: i64) -> Result<Self, AdviceError> {
        match u8::try_from(value) {
            Ok(m @ 1..=12) => Ok(Self(m)),
            _ => Err(AdviceError::validation(
                "months",
                format!("{value} is not a month between 1 and 12"),
            )),
        }
    }

    /// The current month in local time.
    pub fn current() -> Self {
        // chrono guarantees 1..=12
        Self(Local::now().month() as u8)
    }

    pub fn number(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Month {
    type Error = AdviceError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Month> for u8 {
    fn from(month: Month) -> Self {
        month.0
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A gardening tip and the months it applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advice {
    pub id: i64,
    pub description: String,
    /// Sorted, without duplicates
    pub months: Vec<Month>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Advice {
    pub fn applies_to(&self, month: Month) -> bool {
        self.months.contains(&month)
    }
}

/// Input for creating an advice. Months arrive unvalidated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAdvice {
    pub description: String,
    pub months: Vec<i64>,
}

/// Input for updating an advice.
///
/// `months` replaces every existing month tag; `description` is kept when `None`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdviceUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub months: Vec<i64>,
}

/// Validate a month list: non-empty, each in range. Returns sorted, deduplicated months.
pub fn validate_months(raw: &[i64]) -> Result<Vec<Month>, AdviceError> {
    if raw.is_empty() {
        return Err(AdviceError::validation(
            "months",
            "at least one month is required, e.g. [1,2,3]",
        ));
    }

    let mut months = raw
        .iter()
        .map(|&m| Month::new(m))
        .collect::<Result<Vec<_>, _>>()?;
    months.sort_unstable();
    months.dedup();
    Ok(months)
}

/// Validate and trim a description.
pub fn validate_description(raw: &str) -> Result<String, AdviceError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AdviceError::validation("description", "must not be blank"));
    }
    Ok(trimmed.to_string())
}
