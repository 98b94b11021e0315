use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timer::{Category, RunSnapshot};

/// One finished focus session. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Time-ordered UUIDv7.
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Minutes actually counted down, not the configured length.
    pub duration_min: u64,
    pub category: Category,
    pub distraction_count: u32,
    /// True only when the countdown reached zero on its own.
    pub completed: bool,
    /// Local calendar day the session started on.
    pub date: NaiveDate,
}

impl SessionRecord {
    /// Build the record for a terminated run with a fresh id.
    pub fn from_snapshot(snapshot: &RunSnapshot) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            started_at: snapshot.started_at,
            ended_at: snapshot.ended_at,
            duration_min: snapshot.focused_minutes(),
            category: snapshot.category,
            distraction_count: snapshot.distraction_count,
            completed: snapshot.completed,
            date: snapshot.started_at.with_timezone(&Local).date_naive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn snapshot(configured_secs: u64, remaining_secs: u64, completed: bool) -> RunSnapshot {
        let started_at = Utc::now();
        RunSnapshot {
            category: Category::Coding,
            started_at,
            ended_at: started_at + Duration::seconds(600),
            configured_secs,
            remaining_secs,
            distraction_count: 2,
            completed,
        }
    }

    #[test]
    fn duration_is_elapsed_not_configured() {
        let record = SessionRecord::from_snapshot(&snapshot(1500, 1500 - 599, false));
        assert_eq!(record.duration_min, 9);
        assert_eq!(record.distraction_count, 2);
        assert!(!record.completed);
    }

    #[test]
    fn completed_run_records_full_length() {
        let record = SessionRecord::from_snapshot(&snapshot(300, 0, true));
        assert_eq!(record.duration_min, 5);
        assert!(record.completed);
    }

    #[test]
    fn date_follows_local_start_day() {
        let snap = snapshot(60, 0, true);
        let record = SessionRecord::from_snapshot(&snap);
        assert_eq!(record.date, snap.started_at.with_timezone(&Local).date_naive());
    }

    #[test]
    fn ids_are_unique_uuid_v7() {
        let snap = snapshot(60, 0, true);
        let a = SessionRecord::from_snapshot(&snap);
        let b = SessionRecord::from_snapshot(&snap);
        assert_ne!(a.id, b.id);
        assert_eq!(Uuid::parse_str(&a.id).unwrap().get_version_num(), 7);
    }
}
