//! Local notifications: completion alert and the halfway reminder.
//!
//! Notifications are fire-and-forget. Implementations swallow their own
//! failures; when notifications are unavailable `schedule_reminder` returns
//! `None` and the session carries on.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use crate::timer::Category;

/// Identifies one scheduled reminder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReminderHandle(String);

impl ReminderHandle {
    fn fresh() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub trait Notifier: Send + Sync {
    fn notify_completion(&self, category: Category, duration_min: u64);

    /// Returns `None` when notifications are unavailable.
    fn schedule_reminder(&self, after_secs: u64, category: Category) -> Option<ReminderHandle>;

    /// Idempotent.
    fn cancel_all_pending(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Completion,
    Reminder,
}

/// A notification as delivered to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub title: String,
    pub body: String,
    pub at: DateTime<Utc>,
}

impl Alert {
    pub fn completion(category: Category, duration_min: u64) -> Self {
        Self {
            kind: AlertKind::Completion,
            title: "Session complete!".into(),
            body: format!("Your {category} session finished after {duration_min} minutes."),
            at: Utc::now(),
        }
    }

    pub fn reminder(category: Category) -> Self {
        Self {
            kind: AlertKind::Reminder,
            title: "Focus reminder".into(),
            body: format!("Your {category} session is still running. Keep going!"),
            at: Utc::now(),
        }
    }
}

/// Notifications switched off or not permitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNotifier;

impl Notifier for DisabledNotifier {
    fn notify_completion(&self, _category: Category, _duration_min: u64) {}

    fn schedule_reminder(&self, _after_secs: u64, _category: Category) -> Option<ReminderHandle> {
        None
    }

    fn cancel_all_pending(&self) {}
}

/// Delivers alerts into a channel; reminders wait on tokio timers.
pub struct ChannelNotifier {
    alerts: UnboundedSender<Alert>,
    pending: Mutex<Vec<(ReminderHandle, JoinHandle<()>)>>,
}

impl ChannelNotifier {
    pub fn new(alerts: UnboundedSender<Alert>) -> Self {
        Self {
            alerts,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Reminders that have been scheduled and not yet fired or cancelled.
    pub fn pending_count(&self) -> usize {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.retain(|(_, task)| !task.is_finished());
        pending.len()
    }
}

impl Notifier for ChannelNotifier {
    fn notify_completion(&self, category: Category, duration_min: u64) {
        if self.alerts.send(Alert::completion(category, duration_min)).is_err() {
            debug!("alert receiver gone; completion notice dropped");
        }
    }

    fn schedule_reminder(&self, after_secs: u64, category: Category) -> Option<ReminderHandle> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("no async runtime; reminder not scheduled");
            return None;
        };

        let alerts = self.alerts.clone();
        let task = runtime.spawn(async move {
            tokio::time::sleep(Duration::from_secs(after_secs)).await;
            if alerts.send(Alert::reminder(category)).is_err() {
                debug!("alert receiver gone; reminder dropped");
            }
        });

        let handle = ReminderHandle::fresh();
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.retain(|(_, task)| !task.is_finished());
        pending.push((handle.clone(), task));
        debug!(reminder = handle.as_str(), after_secs, "reminder scheduled");
        Some(handle)
    }

    fn cancel_all_pending(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        for (handle, task) in pending.drain(..) {
            task.abort();
            debug!(reminder = handle.as_str(), "reminder cancelled");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn disabled_notifier_never_schedules() {
        let notifier = DisabledNotifier;
        assert!(notifier.schedule_reminder(30, Category::Study).is_none());
        notifier.cancel_all_pending();
    }

    #[test]
    fn reminder_without_runtime_degrades() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let notifier = ChannelNotifier::new(tx);
        assert!(notifier.schedule_reminder(30, Category::Study).is_none());
        assert_eq!(notifier.pending_count(), 0);
    }

    #[test]
    fn completion_is_immediate() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = ChannelNotifier::new(tx);
        notifier.notify_completion(Category::Coding, 25);

        let alert = rx.try_recv().unwrap();
        assert_eq!(alert.kind, AlertKind::Completion);
        assert!(alert.body.contains("Coding"));
        assert!(alert.body.contains("25 minutes"));
    }

    #[tokio::test(start_paused = true)]
    async fn reminder_fires_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = ChannelNotifier::new(tx);
        let handle = notifier.schedule_reminder(120, Category::Reading);
        assert!(handle.is_some());
        assert_eq!(notifier.pending_count(), 1);

        tokio::time::sleep(Duration::from_secs(119)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(2)).await;
        let alert = rx.recv().await.unwrap();
        assert_eq!(alert.kind, AlertKind::Reminder);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_reminder_never_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notifier = ChannelNotifier::new(tx);
        notifier.schedule_reminder(60, Category::Reading);
        notifier.cancel_all_pending();
        notifier.cancel_all_pending();

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(notifier.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reminder_after_receiver_dropped_is_harmless() {
        let (tx, rx) = mpsc::unbounded_channel();
        let notifier = ChannelNotifier::new(tx);
        drop(rx);

        assert!(notifier.schedule_reminder(5, Category::Reading).is_some());
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(notifier.pending_count(), 0);
    }
}
