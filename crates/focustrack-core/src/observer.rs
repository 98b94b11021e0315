//! Foreground/background observer.
//!
//! Turns host visibility changes into distraction events. Leaving the
//! foreground while a session is running counts one distraction and forces a
//! pause; coming back asks the user whether to resume. The question is
//! deferred: the observer emits [`Effect::PromptResume`] and the answer comes
//! back later through [`VisibilityObserver::answer`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::timer::{Effect, FocusMachine, PauseReason, Phase};

/// Application visibility as reported by the host environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Active,
    Inactive,
    Background,
}

impl Visibility {
    fn is_away(self) -> bool {
        !matches!(self, Visibility::Active)
    }
}

/// The user's answer to the resume prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumeChoice {
    Resume,
    StayPaused,
}

#[derive(Debug, Clone)]
pub struct VisibilityObserver {
    previous: Visibility,
    was_backgrounded: bool,
    prompt_pending: bool,
}

impl VisibilityObserver {
    pub fn new() -> Self {
        Self {
            previous: Visibility::Active,
            was_backgrounded: false,
            prompt_pending: false,
        }
    }

    pub fn visibility(&self) -> Visibility {
        self.previous
    }

    pub fn prompt_pending(&self) -> bool {
        self.prompt_pending
    }

    /// Feed one visibility change.
    pub fn on_change(
        &mut self,
        next: Visibility,
        machine: &mut FocusMachine,
        now: DateTime<Utc>,
    ) -> Vec<Effect> {
        self.forget_stale_prompt(machine);
        let previous = std::mem::replace(&mut self.previous, next);

        match (previous.is_away(), next.is_away()) {
            (false, true) if machine.phase() == Phase::Running => {
                self.was_backgrounded = true;
                debug!(?next, "left foreground during a running session");
                machine.record_distraction(now)
            }
            (true, false) if self.was_backgrounded && !self.prompt_pending => {
                if machine.pause_reason() == Some(PauseReason::Distraction) {
                    self.prompt_pending = true;
                    vec![Effect::PromptResume {
                        distraction_count: machine.distraction_count(),
                    }]
                } else {
                    // The run was resumed, stopped or reset while we were away.
                    self.was_backgrounded = false;
                    Vec::new()
                }
            }
            _ => Vec::new(),
        }
    }

    /// Apply the user's answer to an outstanding prompt.
    pub fn answer(
        &mut self,
        choice: ResumeChoice,
        machine: &mut FocusMachine,
        now: DateTime<Utc>,
    ) -> Vec<Effect> {
        self.forget_stale_prompt(machine);
        if !self.prompt_pending {
            return Vec::new();
        }
        self.prompt_pending = false;
        self.was_backgrounded = false;

        match choice {
            ResumeChoice::Resume if machine.pause_reason() == Some(PauseReason::Distraction) => {
                machine.resume(now)
            }
            _ => Vec::new(),
        }
    }
}

impl VisibilityObserver {
    /// A prompt only belongs to a run that is still paused for a distraction.
    /// Once the run was stopped, reset, resumed or replaced, drop it.
    fn forget_stale_prompt(&mut self, machine: &FocusMachine) {
        if machine.pause_reason() != Some(PauseReason::Distraction) {
            if self.prompt_pending {
                debug!("dropping resume prompt for a run that is no longer paused");
            }
            self.prompt_pending = false;
            self.was_backgrounded = false;
        }
    }
}

impl Default for VisibilityObserver {
    fn default() -> Self {
        Self::new()
    }
}
