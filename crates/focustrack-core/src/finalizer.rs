//! Turns a terminated run into a stored session.

use std::sync::Arc;

use tracing::info;

use crate::notify::Notifier;
use crate::storage::{PersistOutcome, SessionRecord, SessionSinks};
use crate::timer::RunSnapshot;

/// Result of finalizing one run.
#[derive(Debug)]
pub struct Finalized {
    pub record: SessionRecord,
    pub persisted: PersistOutcome,
}

pub struct Finalizer {
    sinks: SessionSinks,
    notifier: Arc<dyn Notifier>,
}

impl Finalizer {
    pub fn new(sinks: SessionSinks, notifier: Arc<dyn Notifier>) -> Self {
        Self { sinks, notifier }
    }

    pub fn sinks(&self) -> &SessionSinks {
        &self.sinks
    }

    /// Build the record, hand it to both sinks and wrap up notifications.
    ///
    /// Persistence failures are logged by the sinks and reported in the
    /// returned outcome; they never stop the record from being returned.
    pub fn finalize(&self, snapshot: &RunSnapshot) -> Finalized {
        let record = SessionRecord::from_snapshot(snapshot);
        let persisted = self.sinks.append(&record);

        if record.completed {
            self.notifier
                .notify_completion(record.category, record.duration_min);
        }
        self.notifier.cancel_all_pending();

        info!(
            session_id = %record.id,
            category = %record.category,
            duration_min = record.duration_min,
            distractions = record.distraction_count,
            completed = record.completed,
            "session finalized"
        );
        Finalized { record, persisted }
    }
}
