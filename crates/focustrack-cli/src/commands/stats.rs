use chrono::Local;
use clap::Subcommand;
use focustrack_core::stats::{Companion, SessionStats};
use focustrack_core::storage::{Database, SessionStore};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Totals, last 7 days and category breakdown
    Summary,
    /// Companion level earned from all-time focus
    Companion,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let records = db.list_all()?;
    let stats = SessionStats::compute(&records, Local::now().date_naive());

    match action {
        StatsAction::Summary => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        StatsAction::Companion => {
            let companion = Companion::from_minutes(stats.all_time_total_min);
            println!("{}", serde_json::to_string_pretty(&companion)?);
        }
    }
    Ok(())
}
