mod config;
mod effect;
mod machine;

pub use config::{Category, TimerConfig, DEFAULT_DURATION_MIN};
pub use effect::{Effect, RunSnapshot};
pub use machine::{
    FocusMachine, PauseReason, Phase, RunState, REMINDER_LEAD_SECS, REMINDER_MIN_REMAINING_SECS,
};
