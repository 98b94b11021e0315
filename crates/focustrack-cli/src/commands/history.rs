use chrono::Local;
use clap::Subcommand;
use focustrack_core::storage::{Database, SessionStore};

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List stored sessions, oldest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete every stored session
    Clear,
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        HistoryAction::List { json } => {
            let records = db.list_all()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(());
            }
            if records.is_empty() {
                println!("No sessions recorded yet.");
                return Ok(());
            }
            for r in &records {
                println!(
                    "{} {}  {:<8} {:>4} min  distractions: {:<3} {}",
                    r.date,
                    r.started_at.with_timezone(&Local).format("%H:%M"),
                    r.category.label(),
                    r.duration_min,
                    r.distraction_count,
                    if r.completed { "completed" } else { "stopped" },
                );
            }
        }
        HistoryAction::Clear => {
            db.clear()?;
            println!("history cleared");
        }
    }
    Ok(())
}
