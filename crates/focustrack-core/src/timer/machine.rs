//! Focus session state machine.
//!
//! The machine is a pure reducer: every command takes the current instant and
//! returns the [`Effect`]s the caller must execute. It owns no timer and does
//! no I/O, so the whole lifecycle can be exercised in plain unit tests.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!           |           |
//!           v           v
//!       Completed      Idle   (stop)
//! ```
//!
//! `reset()` returns to `Idle` from anywhere without producing a record.
//!
//! ## Usage
//!
//! ```ignore
//! let mut machine = FocusMachine::new(TimerConfig::new(25, Category::Coding));
//! let effects = machine.start(machine.config(), Utc::now())?;
//! // once per second while running:
//! let effects = machine.tick(Utc::now());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::{Category, TimerConfig};
use super::effect::{Effect, RunSnapshot};
use crate::error::ValidationError;
use crate::events::Event;

/// A halfway reminder is only worth scheduling with more than this left.
pub const REMINDER_MIN_REMAINING_SECS: u64 = 60;

/// The halfway reminder lands this long before the countdown ends.
pub const REMINDER_LEAD_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Running,
    Paused,
    Completed,
}

/// Why a session is paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PauseReason {
    /// The user pressed pause.
    Manual,
    /// The app left the foreground mid-run.
    Distraction,
}

/// Mutable state of the live run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    category: Category,
    configured_secs: u64,
    remaining_secs: u64,
    /// Computed once at start from the configured length.
    halfway_secs: u64,
    distraction_count: u32,
    started_at: DateTime<Utc>,
    reminder_requested: bool,
}

impl RunState {
    fn begin(category: Category, configured_secs: u64, now: DateTime<Utc>) -> Self {
        Self {
            category,
            configured_secs,
            remaining_secs: configured_secs,
            halfway_secs: configured_secs / 2,
            distraction_count: 0,
            started_at: now,
            reminder_requested: false,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn configured_secs(&self) -> u64 {
        self.configured_secs
    }

    pub fn distraction_count(&self) -> u32 {
        self.distraction_count
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    fn snapshot(&self, ended_at: DateTime<Utc>, completed: bool) -> RunSnapshot {
        RunSnapshot {
            category: self.category,
            started_at: self.started_at,
            ended_at,
            configured_secs: self.configured_secs,
            remaining_secs: self.remaining_secs,
            distraction_count: self.distraction_count,
            completed,
        }
    }

    /// True the first time the countdown moves from above the midpoint to at
    /// or below it.
    fn crossed_halfway(&self, before: u64) -> bool {
        !self.reminder_requested
            && before > self.halfway_secs
            && self.remaining_secs <= self.halfway_secs
    }
}

/// The single live focus timer.
///
/// Exactly one run exists at a time; it is created by `start` and dropped by
/// `stop`, `reset` or the next `start` after completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusMachine {
    config: TimerConfig,
    phase: Phase,
    #[serde(default)]
    pause_reason: Option<PauseReason>,
    #[serde(default)]
    run: Option<RunState>,
}

impl FocusMachine {
    pub fn new(config: TimerConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
            pause_reason: None,
            run: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> TimerConfig {
        self.config
    }

    pub fn run(&self) -> Option<&RunState> {
        self.run.as_ref()
    }

    /// Set only while `Paused`.
    pub fn pause_reason(&self) -> Option<PauseReason> {
        self.pause_reason
    }

    pub fn remaining_secs(&self) -> u64 {
        self.run
            .as_ref()
            .map(|r| r.remaining_secs)
            .unwrap_or_else(|| self.config.duration_secs())
    }

    pub fn configured_secs(&self) -> u64 {
        self.run
            .as_ref()
            .map(|r| r.configured_secs)
            .unwrap_or_else(|| self.config.duration_secs())
    }

    pub fn distraction_count(&self) -> u32 {
        self.run.as_ref().map(|r| r.distraction_count).unwrap_or(0)
    }

    /// 0.0 .. 100.0 progress through the configured countdown.
    pub fn progress_pct(&self) -> f64 {
        let total = self.configured_secs();
        if total == 0 {
            return 0.0;
        }
        let elapsed = total.saturating_sub(self.remaining_secs());
        (elapsed as f64 / total as f64 * 100.0).min(100.0)
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self, now: DateTime<Utc>) -> Event {
        Event::StateSnapshot {
            phase: self.phase,
            category: self
                .run
                .as_ref()
                .map(|r| r.category)
                .or(self.config.category),
            remaining_secs: self.remaining_secs(),
            configured_secs: self.configured_secs(),
            distraction_count: self.distraction_count(),
            progress_pct: self.progress_pct(),
            at: now,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Replace the session settings. Only honoured while `Idle`.
    ///
    /// Returns `Ok(true)` when the new config was applied.
    ///
    /// # Errors
    /// Rejects a zero-minute duration. A missing category is accepted here and
    /// refused later by `start`.
    pub fn configure(&mut self, config: TimerConfig) -> Result<bool, ValidationError> {
        if self.phase != Phase::Idle {
            return Ok(false);
        }
        if config.duration_min == 0 {
            return Err(ValidationError::ZeroDuration(0));
        }
        self.config = config;
        Ok(true)
    }

    /// Begin a new run from `Idle` or `Completed`.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] when the config has no category or a zero
    /// duration; the machine is left untouched.
    pub fn start(
        &mut self,
        config: TimerConfig,
        now: DateTime<Utc>,
    ) -> Result<Vec<Effect>, ValidationError> {
        if !matches!(self.phase, Phase::Idle | Phase::Completed) {
            return Ok(Vec::new());
        }
        let category = config.validate()?;
        let run = RunState::begin(category, config.duration_secs(), now);
        let duration_secs = run.configured_secs;

        self.config = config;
        self.run = Some(run);
        self.phase = Phase::Running;
        self.pause_reason = None;
        debug!(%category, duration_secs, "focus session started");

        Ok(vec![
            Effect::StartTicking,
            Effect::Publish(Event::SessionStarted {
                category,
                duration_secs,
                at: now,
            }),
        ])
    }

    /// Count down one second. Ignored unless `Running`.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        if self.phase != Phase::Running {
            return Vec::new();
        }
        let Some(run) = self.run.as_mut() else {
            return Vec::new();
        };

        let before = run.remaining_secs;
        run.remaining_secs = before.saturating_sub(1);

        if run.remaining_secs == 0 {
            self.phase = Phase::Completed;
            debug!(category = %run.category, "countdown reached zero");
            return vec![
                Effect::StopTicking,
                Effect::Publish(Event::TimerCompleted {
                    category: run.category,
                    at: now,
                }),
                Effect::Finalize(run.snapshot(now, true)),
            ];
        }

        let mut effects = Vec::new();
        if run.crossed_halfway(before) {
            // The midpoint only comes once per run, whether or not it was
            // worth a reminder.
            run.reminder_requested = true;
            if run.remaining_secs > REMINDER_MIN_REMAINING_SECS {
                effects.push(Effect::ScheduleReminder {
                    after_secs: run.remaining_secs - REMINDER_LEAD_SECS,
                    category: run.category,
                });
            }
        }
        effects
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        self.pause_with(PauseReason::Manual, now)
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        if self.phase != Phase::Paused {
            return Vec::new();
        }
        self.phase = Phase::Running;
        self.pause_reason = None;
        vec![
            Effect::StartTicking,
            Effect::Publish(Event::TimerResumed {
                remaining_secs: self.remaining_secs(),
                at: now,
            }),
        ]
    }

    /// End the run early. The caller is expected to have confirmed with the user.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        if !matches!(self.phase, Phase::Running | Phase::Paused) {
            return Vec::new();
        }
        let Some(run) = self.run.take() else {
            return Vec::new();
        };
        self.phase = Phase::Idle;
        self.pause_reason = None;
        debug!(remaining_secs = run.remaining_secs, "focus session stopped");

        vec![
            Effect::StopTicking,
            Effect::Publish(Event::SessionStopped {
                remaining_secs: run.remaining_secs,
                at: now,
            }),
            Effect::Finalize(run.snapshot(now, false)),
        ]
    }

    /// Drop the run without recording anything. Valid from every phase.
    pub fn reset(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        self.phase = Phase::Idle;
        self.pause_reason = None;
        self.run = None;
        vec![
            Effect::StopTicking,
            Effect::CancelReminders,
            Effect::Publish(Event::TimerReset {
                remaining_secs: self.config.duration_secs(),
                at: now,
            }),
        ]
    }

    /// The app left the foreground mid-run: count it and force a pause.
    pub fn record_distraction(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        if self.phase != Phase::Running {
            return Vec::new();
        }
        let Some(run) = self.run.as_mut() else {
            return Vec::new();
        };
        run.distraction_count += 1;
        let distraction_count = run.distraction_count;
        let remaining_secs = run.remaining_secs;

        let mut effects = self.pause_with(PauseReason::Distraction, now);
        effects.push(Effect::Publish(Event::DistractionRecorded {
            distraction_count,
            remaining_secs,
            at: now,
        }));
        effects
    }

    fn pause_with(&mut self, reason: PauseReason, now: DateTime<Utc>) -> Vec<Effect> {
        if self.phase != Phase::Running {
            return Vec::new();
        }
        self.phase = Phase::Paused;
        self.pause_reason = Some(reason);
        vec![
            Effect::StopTicking,
            Effect::CancelReminders,
            Effect::Publish(Event::TimerPaused {
                remaining_secs: self.remaining_secs(),
                reason,
                at: now,
            }),
        ]
    }
}

impl Default for FocusMachine {
    fn default() -> Self {
        Self::new(TimerConfig::default())
    }
}
