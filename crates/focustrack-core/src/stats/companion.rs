//! Companion progress derived from all-time focused minutes.
//!
//! Every hour of focus is one level. The companion grows with the level and
//! changes form at fixed level thresholds.

use serde::{Deserialize, Serialize};

const MINUTES_PER_LEVEL: u64 = 60;
const BASE_SIZE: u64 = 60;
const SIZE_PER_LEVEL: u64 = 20;
const MAX_SIZE: u64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Chick,
    Cat,
    Wolf,
    Lion,
    Dragon,
    Unicorn,
}

impl Tier {
    pub fn for_level(level: u64) -> Self {
        match level {
            12.. => Tier::Unicorn,
            10.. => Tier::Dragon,
            7.. => Tier::Lion,
            5.. => Tier::Wolf,
            3.. => Tier::Cat,
            _ => Tier::Chick,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tier::Chick => "Chick",
            Tier::Cat => "Cat",
            Tier::Wolf => "Wolf",
            Tier::Lion => "Lion",
            Tier::Dragon => "Dragon",
            Tier::Unicorn => "Unicorn",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Companion {
    pub level: u64,
    pub tier: Tier,
    /// Display size in points, capped.
    pub size: u64,
    pub minutes_to_next_level: u64,
    /// Progress through the current level, 0.0 to 100.0.
    pub level_progress_pct: f64,
}

impl Companion {
    pub fn from_minutes(total_min: u64) -> Self {
        let level = total_min / MINUTES_PER_LEVEL + 1;
        Self {
            level,
            tier: Tier::for_level(level),
            size: (BASE_SIZE + (level - 1) * SIZE_PER_LEVEL).min(MAX_SIZE),
            minutes_to_next_level: level * MINUTES_PER_LEVEL - total_min,
            level_progress_pct: (total_min % MINUTES_PER_LEVEL) as f64
                / MINUTES_PER_LEVEL as f64
                * 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_companion() {
        let c = Companion::from_minutes(0);
        assert_eq!(c.level, 1);
        assert_eq!(c.tier, Tier::Chick);
        assert_eq!(c.size, 60);
        assert_eq!(c.minutes_to_next_level, 60);
        assert_eq!(c.level_progress_pct, 0.0);
    }

    #[test]
    fn mid_level_progress() {
        let c = Companion::from_minutes(90);
        assert_eq!(c.level, 2);
        assert_eq!(c.size, 80);
        assert_eq!(c.minutes_to_next_level, 30);
        assert!((c.level_progress_pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn tiers_change_at_thresholds() {
        let tier_at = |level: u64| Companion::from_minutes((level - 1) * 60).tier;
        assert_eq!(tier_at(2), Tier::Chick);
        assert_eq!(tier_at(3), Tier::Cat);
        assert_eq!(tier_at(5), Tier::Wolf);
        assert_eq!(tier_at(7), Tier::Lion);
        assert_eq!(tier_at(10), Tier::Dragon);
        assert_eq!(tier_at(12), Tier::Unicorn);
        assert_eq!(tier_at(40), Tier::Unicorn);
    }

    #[test]
    fn size_is_capped() {
        assert_eq!(Companion::from_minutes(3 * 60).size, 120);
        assert_eq!(Companion::from_minutes(100 * 60).size, 120);
    }
}
