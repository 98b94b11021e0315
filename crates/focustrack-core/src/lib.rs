//! # Focustrack Core Library
//!
//! Core logic for the Focustrack focus timer. Every operation is available
//! through the standalone `focustrack` CLI; any other front end is a thin
//! layer over the same library.
//!
//! ## Architecture
//!
//! - **Timer**: a pure state machine. Commands take the current instant and
//!   return [`Effect`]s; nothing in it touches a clock, a disk or a network.
//! - **Observer**: turns foreground/background changes into distractions.
//! - **Driver**: owns the machine, runs the one-second tick on a tokio task
//!   and executes effects in order.
//! - **Finalizer**: converts a terminated run into a [`SessionRecord`] and
//!   hands it to the local store and the optional remote mirror.
//! - **Storage**: SQLite session history and TOML configuration.
//! - **Stats**: totals, weekly series, category shares, companion progress.
//!
//! ## Key Components
//!
//! - [`FocusMachine`]: timer state machine
//! - [`SessionDriver`]: async event loop around the machine
//! - [`Database`]: local session store
//! - [`Config`]: application configuration

pub mod auth;
pub mod driver;
pub mod error;
pub mod events;
pub mod finalizer;
pub mod notify;
pub mod observer;
pub mod stats;
pub mod storage;
pub mod timer;

pub use auth::{Anonymous, AuthProvider, LocalAccounts};
pub use driver::{Command, Input, SessionDriver};
pub use error::{AuthError, ConfigError, RemoteError, StorageError, ValidationError};
pub use events::Event;
pub use finalizer::{Finalized, Finalizer};
pub use notify::{ChannelNotifier, DisabledNotifier, Notifier};
pub use observer::{ResumeChoice, Visibility, VisibilityObserver};
pub use stats::{Companion, SessionStats};
pub use storage::{Config, Database, SessionRecord, SessionSinks, SessionStore};
pub use timer::{Category, Effect, FocusMachine, Phase, RunSnapshot, TimerConfig};
