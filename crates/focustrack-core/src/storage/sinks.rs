//! Dual-write persistence: local store first, then an optional remote mirror.
//!
//! The two sinks fail independently. A local failure is logged at `error`; a
//! remote failure only at `warn`, on its own task, and never affects what the
//! local store holds.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::database::SessionStore;
use super::mirror::RemoteMirror;
use super::record::SessionRecord;
use crate::auth::AuthProvider;
use crate::error::{RemoteError, StorageError};

/// What happened to one appended record.
#[derive(Debug)]
pub struct PersistOutcome {
    pub local: Result<(), StorageError>,
    /// Present when a mirror write was started.
    pub remote: Option<JoinHandle<Result<(), RemoteError>>>,
}

pub struct SessionSinks {
    local: Box<dyn SessionStore>,
    remote: Option<Arc<dyn RemoteMirror>>,
    auth: Arc<dyn AuthProvider>,
}

impl SessionSinks {
    pub fn new(local: Box<dyn SessionStore>, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            local,
            remote: None,
            auth,
        }
    }

    pub fn with_remote(mut self, remote: Arc<dyn RemoteMirror>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Append to the local store, then mirror remotely when a user is signed in.
    ///
    /// The mirror write runs on the current tokio runtime. Outside one it is
    /// skipped with a warning and only the local store is written.
    pub fn append(&self, record: &SessionRecord) -> PersistOutcome {
        let local = self.local.append(record);
        if let Err(err) = &local {
            error!(session_id = %record.id, error = %err, "failed to save session locally");
        }

        let remote = match (&self.remote, self.auth.current_user_id()) {
            (Some(mirror), Some(user_id)) => {
                let Ok(runtime) = Handle::try_current() else {
                    warn!(session_id = %record.id, "no async runtime; skipping remote mirror");
                    return PersistOutcome { local, remote: None };
                };
                let mirror = Arc::clone(mirror);
                let record = record.clone();
                Some(runtime.spawn(async move {
                    let result = mirror.push(&user_id, &record).await;
                    match &result {
                        Ok(()) => debug!(session_id = %record.id, "session mirrored"),
                        Err(err) => {
                            warn!(session_id = %record.id, error = %err, "remote mirror failed")
                        }
                    }
                    result
                }))
            }
            (Some(_), None) => {
                debug!(session_id = %record.id, "not signed in; skipping remote mirror");
                None
            }
            (None, _) => None,
        };

        PersistOutcome { local, remote }
    }

    /// # Errors
    /// Propagates local store failures.
    pub fn list_all(&self) -> Result<Vec<SessionRecord>, StorageError> {
        self.local.list_all()
    }

    /// Clears the local store only; the mirror is never deleted from here.
    ///
    /// # Errors
    /// Propagates local store failures.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.local.clear()
    }
}
