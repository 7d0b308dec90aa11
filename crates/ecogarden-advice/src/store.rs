//! SQLite-backed advice storage.
//!
//! Month tags live in their own table and belong to exactly one advice:
//! deleting an advice deletes its tags, and an update replaces them all.

use chrono::{DateTime, Utc};
use ecogarden_core::DatabaseError;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::error::AdviceError;
use crate::types::{validate_description, validate_months, Advice, AdviceUpdate, Month, NewAdvice};

pub type AdviceResult<T> = Result<T, AdviceError>;

/// SQLite advice store. Safe to share between threads.
pub struct SqliteAdviceStore {
    conn: Mutex<Connection>,
}

impl SqliteAdviceStore {
    /// Open (or create) the store at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> AdviceResult<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory store.
    pub fn in_memory() -> AdviceResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> AdviceResult<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> AdviceResult<()> {
        self.conn.lock().execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS advice (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                description TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS advice_month (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                advice_id INTEGER NOT NULL REFERENCES advice(id) ON DELETE CASCADE,
                month INTEGER NOT NULL CHECK (month BETWEEN 1 AND 12),
                UNIQUE (advice_id, month)
            );

            CREATE INDEX IF NOT EXISTS idx_advice_month_month ON advice_month(month);
            "#,
        )?;
        Ok(())
    }

    pub fn create(&self, input: &NewAdvice) -> AdviceResult<Advice> {
        let description = validate_description(&input.description)?;
        let months = validate_months(&input.months)?;
        let now = Utc::now();

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO advice (description, created_at, updated_at) VALUES (?1, ?2, ?2)",
            params![description, now.to_rfc3339()],
        )?;
        let id = tx.last_insert_rowid();
        Self::insert_months(&tx, id, &months)?;
        tx.commit()?;

        tracing::info!("Created advice {} for months {:?}", id, months);
        Ok(Advice {
            id,
            description,
            months,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get(&self, id: i64) -> AdviceResult<Option<Advice>> {
        let conn = self.conn.lock();
        Self::load(&conn, id)
    }

    /// Replace the months (and optionally the description) of an advice.
    pub fn update(&self, id: i64, input: &AdviceUpdate) -> AdviceResult<Advice> {
        let description = input
            .description
            .as_deref()
            .map(validate_description)
            .transpose()?;
        let months = validate_months(&input.months)?;
        let now = Utc::now();

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        let changed = match &description {
            Some(d) => tx.execute(
                "UPDATE advice SET description = ?1, updated_at = ?2 WHERE id = ?3",
                params![d, now.to_rfc3339(), id],
            )?,
            None => tx.execute(
                "UPDATE advice SET updated_at = ?1 WHERE id = ?2",
                params![now.to_rfc3339(), id],
            )?,
        };
        if changed == 0 {
            return Err(AdviceError::NotFound(id));
        }

        tx.execute("DELETE FROM advice_month WHERE advice_id = ?1", params![id])?;
        Self::insert_months(&tx, id, &months)?;

        let advice = Self::load(&tx, id)?.ok_or(AdviceError::NotFound(id))?;
        tx.commit()?;

        tracing::info!("Updated advice {}", id);
        Ok(advice)
    }

    /// Delete an advice and its month tags.
    pub fn delete(&self, id: i64) -> AdviceResult<()> {
        let deleted = self
            .conn
            .lock()
            .execute("DELETE FROM advice WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(AdviceError::NotFound(id));
        }
        tracing::info!("Deleted advice {}", id);
        Ok(())
    }

    /// All advice tagged with `month`, ordered by id.
    pub fn find_by_month(&self, month: Month) -> AdviceResult<Vec<Advice>> {
        let conn = self.conn.lock();
        let ids = {
            let mut stmt = conn.prepare(
                "SELECT advice_id FROM advice_month WHERE month = ?1 ORDER BY advice_id ASC",
            )?;
            let rows = stmt.query_map(params![month.number()], |row| row.get::<_, i64>(0))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let mut advice = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(a) = Self::load(&conn, id)? {
                advice.push(a);
            }
        }
        Ok(advice)
    }

    /// All advice for the current local month.
    pub fn find_current_month(&self) -> AdviceResult<Vec<Advice>> {
        self.find_by_month(Month::current())
    }

    pub fn list(&self) -> AdviceResult<Vec<Advice>> {
        let conn = self.conn.lock();
        let ids = {
            let mut stmt = conn.prepare("SELECT id FROM advice ORDER BY id ASC")?;
            let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let mut advice = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(a) = Self::load(&conn, id)? {
                advice.push(a);
            }
        }
        Ok(advice)
    }

    pub fn count(&self) -> AdviceResult<usize> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM advice", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Number of month tags across all advice.
    pub fn month_tag_count(&self) -> AdviceResult<usize> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM advice_month", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn insert_months(conn: &Connection, advice_id: i64, months: &[Month]) -> AdviceResult<()> {
        let mut stmt =
            conn.prepare("INSERT INTO advice_month (advice_id, month) VALUES (?1, ?2)")?;
        for month in months {
            stmt.execute(params![advice_id, month.number()])?;
        }
        Ok(())
    }

    fn load(conn: &Connection, id: i64) -> AdviceResult<Option<Advice>> {
        let row = conn
            .query_row(
                "SELECT id, description, created_at, updated_at FROM advice WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, description, created_at, updated_at)) = row else {
            return Ok(None);
        };

        let mut stmt = conn
            .prepare("SELECT month FROM advice_month WHERE advice_id = ?1 ORDER BY month ASC")?;
        let months = stmt
            .query_map(params![id], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(Month::new)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Advice {
            id,
            description,
            months,
            created_at: parse_timestamp(id, &created_at)?,
            updated_at: parse_timestamp(id, &updated_at)?,
        }))
    }
}

fn parse_timestamp(id: i64, raw: &str) -> AdviceResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            DatabaseError::Corruption(format!("timestamp {raw:?} of advice {id}: {e}")).into()
        })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    fn new_advice(description: &str, months: &[i64]) -> NewAdvice {
        NewAdvice {
            description: description.to_string(),
            months: months.to_vec(),
        }
    }

    fn month(n: i64) -> Month {
        Month::new(n).unwrap()
    }

    #[test]
    fn test_create_and_get() {
        let store = SqliteAdviceStore::in_memory().unwrap();
        let created = store.create(&new_advice("Water in the morning", &[3, 1, 2])).unwrap();

        let fetched = store.get(created.id).unwrap().unwrap();
        assert_eq!(fetched.description, "Water in the morning");
        assert_eq!(fetched.months, vec![month(1), month(2), month(3)]);
    }

    #[test]
    fn test_get_missing_returns_none() {
        let store = SqliteAdviceStore::in_memory().unwrap();
        assert!(store.get(42).unwrap().is_none());
    }

    #[test]
    fn test_create_rejects_invalid_month_without_writing() {
        let store = SqliteAdviceStore::in_memory().unwrap();
        let err = store.create(&new_advice("Bad", &[1, 13])).unwrap_err();
        assert!(matches!(err, AdviceError::Validation { field: "months", .. }));
        assert_eq!(store.count().unwrap(), 0);
        assert_eq!(store.month_tag_count().unwrap(), 0);
    }

    #[test]
    fn test_create_rejects_empty_months() {
        let store = SqliteAdviceStore::in_memory().unwrap();
        assert!(store.create(&new_advice("No months", &[])).is_err());
    }

    #[test]
    fn test_find_by_month() {
        let store = SqliteAdviceStore::in_memory().unwrap();
        store.create(&new_advice("Winter", &[1, 2, 3])).unwrap();
        store.create(&new_advice("Spring", &[4, 5, 6])).unwrap();
        store.create(&new_advice("Rotation", &[1, 4, 8, 12])).unwrap();

        let january = store.find_by_month(month(1)).unwrap();
        let names: Vec<_> = january.iter().map(|a| a.description.as_str()).collect();
        assert_eq!(names, vec!["Winter", "Rotation"]);

        assert!(store.find_by_month(month(7)).unwrap().is_empty());
    }

    #[test]
    fn test_update_replaces_months() {
        let store = SqliteAdviceStore::in_memory().unwrap();
        let advice = store.create(&new_advice("Compost", &[5, 7, 10])).unwrap();

        let updated = store
            .update(
                advice.id,
                &AdviceUpdate {
                    description: None,
                    months: vec![11],
                },
            )
            .unwrap();

        assert_eq!(updated.description, "Compost");
        assert_eq!(updated.months, vec![month(11)]);
        assert_eq!(updated.created_at, advice.created_at);
        assert_eq!(store.month_tag_count().unwrap(), 1);
        assert!(store.find_by_month(month(5)).unwrap().is_empty());
    }

    #[test]
    fn test_update_changes_description() {
        let store = SqliteAdviceStore::in_memory().unwrap();
        let advice = store.create(&new_advice("Old", &[1])).unwrap();

        let updated = store
            .update(
                advice.id,
                &AdviceUpdate {
                    description: Some("New".to_string()),
                    months: vec![1, 2],
                },
            )
            .unwrap();
        assert_eq!(updated.description, "New");
        assert!(updated.updated_at >= advice.updated_at);
    }

    #[test]
    fn test_update_invalid_month_keeps_previous_tags() {
        let store = SqliteAdviceStore::in_memory().unwrap();
        let advice = store.create(&new_advice("Keep", &[2, 4])).unwrap();

        let err = store
            .update(
                advice.id,
                &AdviceUpdate {
                    description: None,
                    months: vec![0],
                },
            )
            .unwrap_err();
        assert_eq!(err.http_status(), 400);
        assert_eq!(store.get(advice.id).unwrap().unwrap().months, vec![month(2), month(4)]);
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let store = SqliteAdviceStore::in_memory().unwrap();
        let err = store
            .update(
                7,
                &AdviceUpdate {
                    description: None,
                    months: vec![1],
                },
            )
            .unwrap_err();
        assert!(matches!(err, AdviceError::NotFound(7)));
    }

    #[test]
    fn test_delete_cascades_to_month_tags() {
        let store = SqliteAdviceStore::in_memory().unwrap();
        let keep = store.create(&new_advice("Keep", &[1, 2])).unwrap();
        let removed = store.create(&new_advice("Drop", &[3, 4, 5])).unwrap();
        assert_eq!(store.month_tag_count().unwrap(), 5);

        store.delete(removed.id).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.month_tag_count().unwrap(), 2);
        assert!(store.get(keep.id).unwrap().is_some());
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let store = SqliteAdviceStore::in_memory().unwrap();
        assert!(matches!(store.delete(1), Err(AdviceError::NotFound(1))));
    }

    #[test]
    fn test_corrupt_timestamp_is_reported() {
        let store = SqliteAdviceStore::in_memory().unwrap();
        let advice = store.create(&new_advice("Broken", &[1])).unwrap();
        store
            .conn
            .lock()
            .execute("UPDATE advice SET updated_at = 'soon'", [])
            .unwrap();

        assert!(matches!(
            store.get(advice.id),
            Err(AdviceError::Database(DatabaseError::Corruption(_)))
        ));
    }

    #[test]
    fn test_list_orders_by_id() {
        let store = SqliteAdviceStore::in_memory().unwrap();
        let a = store.create(&new_advice("A", &[1])).unwrap();
        let b = store.create(&new_advice("B", &[2])).unwrap();

        let ids: Vec<i64> = store.list().unwrap().iter().map(|x| x.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }
}
