use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Default session length when nothing else is configured.
pub const DEFAULT_DURATION_MIN: u32 = 25;

/// What a focus session is spent on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Study,
    Coding,
    Project,
    Reading,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Study,
        Category::Coding,
        Category::Project,
        Category::Reading,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Study => "study",
            Category::Coding => "coding",
            Category::Project => "project",
            Category::Reading => "reading",
        }
    }

    /// Human-readable label used in notifications.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Study => "Study",
            Category::Coding => "Coding",
            Category::Project => "Project",
            Category::Reading => "Reading",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| ValidationError::UnknownCategory(s.to_string()))
    }
}

/// User-adjustable session settings.
///
/// The category is optional so that an unselected picker can be represented;
/// [`TimerConfig::validate`] rejects it at start time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    pub duration_min: u32,
    #[serde(default)]
    pub category: Option<Category>,
}

impl TimerConfig {
    pub fn new(duration_min: u32, category: Category) -> Self {
        Self {
            duration_min,
            category: Some(category),
        }
    }

    /// Configured countdown length in seconds.
    pub fn duration_secs(&self) -> u64 {
        u64::from(self.duration_min).saturating_mul(60)
    }

    /// Check the config is startable and return its category.
    ///
    /// # Errors
    /// Returns [`ValidationError::MissingCategory`] when no category is selected
    /// and [`ValidationError::ZeroDuration`] for a zero-length session.
    pub fn validate(&self) -> Result<Category, ValidationError> {
        let category = self.category.ok_or(ValidationError::MissingCategory)?;
        if self.duration_min == 0 {
            return Err(ValidationError::ZeroDuration(self.duration_min));
        }
        Ok(category)
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION_MIN, Category::Study)
    }
}
