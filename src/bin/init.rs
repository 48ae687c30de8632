//! interiord_init - Database initialization tool
//!
//! Creates the users database and optionally seeds accounts from a JSON file.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// interiord database initialization tool
#[derive(Parser, Debug)]
#[command(
    name = "interiord_init",
    version,
    about = "Initialize an interiord database"
)]
struct Args {
    /// Path to SQLite database file (created if missing)
    #[arg(short, long)]
    database: PathBuf,

    /// JSON file with users to seed: [{"username", "gmail", "phone", "password"}]
    #[arg(long)]
    users: Option<PathBuf>,

    /// bcrypt cost for seeded passwords
    #[arg(long, default_value_t = interiord::auth::DEFAULT_HASH_COST)]
    hash_cost: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "interiord=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse CLI arguments
    let args = Args::parse();

    let users = match &args.users {
        Some(path) => {
            if !path.exists() {
                bail!("Users file not found: {}", path.display());
            }
            let json = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
            interiord::init::parse_seed_users(&json)?
        }
        None => Vec::new(),
    };

    interiord::init::init_database(&args.database, &users, args.hash_cost).await?;

    Ok(())
}
