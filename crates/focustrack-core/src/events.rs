use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::SessionRecord;
use crate::timer::{Category, PauseReason, Phase};

/// Every state change in a focus session produces an Event.
/// The CLI prints them; any other front end subscribes to the same stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        category: Category,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: u64,
        reason: PauseReason,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// The app went to the background while the countdown was running.
    DistractionRecorded {
        distraction_count: u32,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// Back in the foreground after a distraction; waiting for the user to
    /// choose between resuming and staying paused.
    ResumePrompt {
        distraction_count: u32,
        at: DateTime<Utc>,
    },
    TimerCompleted {
        category: Category,
        at: DateTime<Utc>,
    },
    SessionStopped {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// A start was refused; state is unchanged.
    StartRejected {
        message: String,
        at: DateTime<Utc>,
    },
    /// The finished run, as persisted.
    SessionSummary {
        record: SessionRecord,
    },
    StateSnapshot {
        phase: Phase,
        category: Option<Category>,
        remaining_secs: u64,
        configured_secs: u64,
        distraction_count: u32,
        progress_pct: f64,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Stable snake_case name, handy for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::SessionStarted { .. } => "session_started",
            Event::TimerPaused { .. } => "timer_paused",
            Event::TimerResumed { .. } => "timer_resumed",
            Event::DistractionRecorded { .. } => "distraction_recorded",
            Event::ResumePrompt { .. } => "resume_prompt",
            Event::TimerCompleted { .. } => "timer_completed",
            Event::SessionStopped { .. } => "session_stopped",
            Event::TimerReset { .. } => "timer_reset",
            Event::StartRejected { .. } => "start_rejected",
            Event::SessionSummary { .. } => "session_summary",
            Event::StateSnapshot { .. } => "state_snapshot",
        }
    }
}
