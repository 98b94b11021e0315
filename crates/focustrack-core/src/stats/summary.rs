//! Aggregate statistics over stored sessions.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::storage::SessionRecord;
use crate::timer::Category;

/// Number of days in the rolling history, today included.
pub const HISTORY_DAYS: u64 = 7;

/// Focused minutes on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTotal {
    pub date: NaiveDate,
    pub duration_min: u64,
}

/// Share of all-time focus spent in one category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub category: Category,
    pub duration_min: u64,
    /// 0.0 to 100.0; 0 when nothing has been recorded.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub today_total_min: u64,
    pub all_time_total_min: u64,
    pub total_distractions: u64,
    pub session_count: usize,
    pub completed_count: usize,
    /// Oldest first, ending with today.
    pub last_7_days: Vec<DayTotal>,
    /// Categories in order of first appearance in the history.
    pub categories: Vec<CategoryShare>,
}

impl SessionStats {
    /// Summarise `records` as seen on `today` (local calendar day).
    pub fn compute(records: &[SessionRecord], today: NaiveDate) -> Self {
        let all_time_total_min: u64 = records.iter().map(|r| r.duration_min).sum();

        let minutes_on = |date: NaiveDate| -> u64 {
            records
                .iter()
                .filter(|r| r.date == date)
                .map(|r| r.duration_min)
                .sum()
        };

        let last_7_days = (0..HISTORY_DAYS)
            .rev()
            .filter_map(|back| today.checked_sub_days(Days::new(back)))
            .map(|date| DayTotal {
                date,
                duration_min: minutes_on(date),
            })
            .collect();

        let mut categories: Vec<CategoryShare> = Vec::new();
        for record in records {
            match categories.iter_mut().find(|c| c.category == record.category) {
                Some(share) => share.duration_min += record.duration_min,
                None => categories.push(CategoryShare {
                    category: record.category,
                    duration_min: record.duration_min,
                    percentage: 0.0,
                }),
            }
        }
        if all_time_total_min > 0 {
            for share in &mut categories {
                share.percentage = share.duration_min as f64 / all_time_total_min as f64 * 100.0;
            }
        }

        Self {
            today_total_min: minutes_on(today),
            all_time_total_min,
            total_distractions: records.iter().map(|r| u64::from(r.distraction_count)).sum(),
            session_count: records.len(),
            completed_count: records.iter().filter(|r| r.completed).count(),
            last_7_days,
            categories,
        }
    }
}
