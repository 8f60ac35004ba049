use clap::Subcommand;
use breakdown_core::storage::Database;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's completed phases
    Today,
    /// All-time totals
    All,
    /// Most recent completed phases
    Recent {
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    match action {
        StatsAction::Today => {
            let stats = db.stats_today()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        StatsAction::All => {
            let stats = db.stats_all()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        StatsAction::Recent { limit } => {
            let phases = db.recent_phases(limit)?;
            println!("{}", serde_json::to_string_pretty(&phases)?);
        }
    }
    Ok(())
}
