use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::Category;
use crate::events::Event;

/// Side effect requested by a state transition.
///
/// The machine never performs I/O itself; the driver executes these in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Arm a fresh periodic tick source, first tick one period from now.
    StartTicking,
    /// Tear down the tick source before anything else happens.
    StopTicking,
    /// Ask the notifier for a single reminder.
    ScheduleReminder { after_secs: u64, category: Category },
    /// Drop any reminder that has not fired yet.
    CancelReminders,
    /// The run terminated; turn it into a session record.
    Finalize(RunSnapshot),
    /// Ask the user whether to resume after a distraction.
    PromptResume { distraction_count: u32 },
    /// Forward an event to whoever renders the session.
    Publish(Event),
}

/// Frozen view of a run at the moment it terminated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub category: Category,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub configured_secs: u64,
    pub remaining_secs: u64,
    pub distraction_count: u32,
    pub completed: bool,
}

impl RunSnapshot {
    /// Seconds actually counted down.
    pub fn elapsed_secs(&self) -> u64 {
        self.configured_secs.saturating_sub(self.remaining_secs)
    }

    /// Whole focused minutes, rounded down.
    pub fn focused_minutes(&self) -> u64 {
        self.elapsed_secs() / 60
    }
}
