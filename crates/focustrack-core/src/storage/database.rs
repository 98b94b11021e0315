//! SQLite-based session storage.
//!
//! The local sink for finished sessions. Records are append-only and listed
//! back in insertion order.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};
use tracing::debug;

use super::data_dir;
use super::record::SessionRecord;
use crate::error::StorageError;
use crate::timer::Category;

/// Append-only store of finished sessions.
pub trait SessionStore: Send {
    /// Append one record.
    fn append(&self, record: &SessionRecord) -> Result<(), StorageError>;

    /// All records in insertion order; empty when nothing was saved yet.
    fn list_all(&self) -> Result<Vec<SessionRecord>, StorageError>;

    /// Remove every record.
    fn clear(&self) -> Result<(), StorageError>;
}

/// SQLite database for session storage.
pub struct Database {
    conn: Connection,
}

/// Raw column values before decoding.
struct SessionRow {
    id: String,
    started_at: String,
    ended_at: String,
    duration_min: u64,
    category: String,
    distraction_count: u32,
    completed: bool,
    date: String,
}

impl Database {
    /// Open the database at `<data dir>/focustrack.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the database
    /// cannot be opened or migrated.
    pub fn open() -> Result<Self, StorageError> {
        let path = data_dir().map_err(StorageError::DataDir)?.join("focustrack.db");
        Self::open_at(&path)
    }

    /// Open (or create) a database file at an explicit path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open_at(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|source| StorageError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        debug!(path = %path.display(), "session database opened");
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    ///
    /// # Errors
    /// Returns an error if SQLite cannot allocate the database.
    pub fn open_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), StorageError> {
        super::migrations::migrate(&self.conn)?;
        Ok(())
    }

    /// Number of stored sessions.
    pub fn count(&self) -> Result<u64, StorageError> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get::<_, u64>(0))?;
        Ok(n)
    }

    fn decode(row: SessionRow) -> Result<SessionRecord, StorageError> {
        let corrupt = |message: String| StorageError::CorruptRow {
            id: row.id.clone(),
            message,
        };
        let started_at = parse_instant(&row.started_at).map_err(&corrupt)?;
        let ended_at = parse_instant(&row.ended_at).map_err(&corrupt)?;
        let category = row
            .category
            .parse::<Category>()
            .map_err(|e| corrupt(e.to_string()))?;
        let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d")
            .map_err(|e| corrupt(format!("date '{}': {e}", row.date)))?;

        Ok(SessionRecord {
            id: row.id,
            started_at,
            ended_at,
            duration_min: row.duration_min,
            category,
            distraction_count: row.distraction_count,
            completed: row.completed,
            date,
        })
    }
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("timestamp '{raw}': {e}"))
}

impl SessionStore for Database {
    fn append(&self, record: &SessionRecord) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO sessions
                (id, started_at, ended_at, duration_min, category, distraction_count, completed, date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.id,
                record.started_at.to_rfc3339(),
                record.ended_at.to_rfc3339(),
                record.duration_min,
                record.category.as_str(),
                record.distraction_count,
                record.completed,
                record.date.format("%Y-%m-%d").to_string(),
            ],
        )?;
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<SessionRecord>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, ended_at, duration_min, category, distraction_count, completed, date
             FROM sessions
             ORDER BY seq ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(SessionRow {
                id: row.get(0)?,
                started_at: row.get(1)?,
                ended_at: row.get(2)?,
                duration_min: row.get(3)?,
                category: row.get(4)?,
                distraction_count: row.get(5)?,
                completed: row.get(6)?,
                date: row.get(7)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(Self::decode(row?)?);
        }
        Ok(records)
    }

    fn clear(&self) -> Result<(), StorageError> {
        let removed = self.conn.execute("DELETE FROM sessions", [])?;
        debug!(removed, "session history cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(id: &str, category: Category, minutes: u64) -> SessionRecord {
        let started_at = Utc::now();
        SessionRecord {
            id: id.to_string(),
            started_at,
            ended_at: started_at + Duration::minutes(minutes as i64),
            duration_min: minutes,
            category,
            distraction_count: 1,
            completed: true,
            date: started_at.date_naive(),
        }
    }

    #[test]
    fn empty_store_lists_nothing() {
        let db = Database::open_memory().unwrap();
        assert!(db.list_all().unwrap().is_empty());
        assert_eq!(db.count().unwrap(), 0);
    }

    #[test]
    fn append_and_list_in_insertion_order() {
        let db = Database::open_memory().unwrap();
        // Ids deliberately out of lexical order.
        db.append(&record("zz", Category::Coding, 25)).unwrap();
        db.append(&record("aa", Category::Reading, 10)).unwrap();

        let all = db.list_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, "zz");
        assert_eq!(all[1].id, "aa");
        assert_eq!(all[1].category, Category::Reading);
        assert_eq!(all[0].duration_min, 25);
    }

    #[test]
    fn records_roundtrip_exactly() {
        let db = Database::open_memory().unwrap();
        let original = record("one", Category::Project, 7);
        db.append(&original).unwrap();
        let loaded = db.list_all().unwrap().remove(0);
        assert_eq!(loaded.started_at.timestamp_micros(), original.started_at.timestamp_micros());
        assert_eq!(loaded.date, original.date);
        assert_eq!(loaded.completed, original.completed);
        assert_eq!(loaded.distraction_count, original.distraction_count);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let db = Database::open_memory().unwrap();
        db.append(&record("dup", Category::Study, 5)).unwrap();
        assert!(db.append(&record("dup", Category::Study, 5)).is_err());
        assert_eq!(db.count().unwrap(), 1);
    }

    #[test]
    fn clear_removes_everything() {
        let db = Database::open_memory().unwrap();
        db.append(&record("a", Category::Study, 5)).unwrap();
        db.append(&record("b", Category::Study, 5)).unwrap();
        db.clear().unwrap();
        assert!(db.list_all().unwrap().is_empty());
    }

    #[test]
    fn corrupt_rows_are_reported() {
        let db = Database::open_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO sessions (id, started_at, ended_at, duration_min, category, completed, date)
                 VALUES ('bad', 'yesterday', 'today', 5, 'study', 1, '2026-01-01')",
                [],
            )
            .unwrap();
        match db.list_all() {
            Err(StorageError::CorruptRow { id, .. }) => assert_eq!(id, "bad"),
            other => panic!("expected CorruptRow, got {other:?}"),
        }
    }
}
