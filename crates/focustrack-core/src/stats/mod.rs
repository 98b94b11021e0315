//! Statistics over stored focus sessions.
//!
//! Pure functions of the session history: daily and all-time totals, the
//! rolling week, per-category shares and the companion's progress.

mod companion;
mod summary;

pub use companion::{Companion, Tier};
pub use summary::{CategoryShare, DayTotal, SessionStats, HISTORY_DAYS};
