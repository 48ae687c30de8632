//! Database initialization module
//!
//! Creates (or opens) a database file and seeds user accounts for the
//! interiord_init tool. Seeding is idempotent: users whose username or gmail
//! already exists are skipped.

use std::path::Path;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use tracing::info;

use crate::auth::accounts::{AccountService, AuthError, NewUser};
use crate::db::Database;

/// A user to seed
#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub username: String,
    pub gmail: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub password: String,
}

/// What seeding did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub added: usize,
    pub skipped: usize,
}

/// Parse a JSON array of seed users
pub fn parse_seed_users(json: &str) -> Result<Vec<SeedUser>> {
    serde_json::from_str(json).map_err(|e| anyhow!("Invalid seed file: {}", e))
}

/// Create the database at `path` if needed and seed `users`, hashing their
/// passwords with bcrypt at `hash_cost`
///
/// # Errors
/// * Path is not valid UTF-8
/// * A seed user fails validation (bad email, short password)
/// * Database creation fails
pub async fn init_database(
    path: &Path,
    users: &[SeedUser],
    hash_cost: u32,
) -> Result<SeedSummary> {
    let path_str = path
        .to_str()
        .ok_or_else(|| anyhow!("Database path is not valid UTF-8: {}", path.display()))?;

    if path.exists() {
        info!("Opening existing database at {}", path.display());
    } else {
        info!("Creating new database at {}", path.display());
    }

    // Runs migrations
    let db = Database::new(Some(path_str)).await?;
    let service = AccountService::new(db.pool().clone()).with_hash_cost(hash_cost);

    let mut summary = SeedSummary::default();
    for user in users {
        let new_user = NewUser {
            username: &user.username,
            gmail: &user.gmail,
            phone: user.phone.as_deref(),
            password: &user.password,
        };
        match service.signup(&new_user).await {
            Ok(created) => {
                info!("Added user: {} ({})", created.username, created.id);
                summary.added += 1;
            }
            Err(AuthError::UsernameExists) => {
                info!("User {} already exists, skipping", user.username);
                summary.skipped += 1;
            }
            Err(e) => return Err(anyhow!("Failed to add user {}: {}", user.username, e)),
        }
    }

    db.pool().close().await;
    info!(
        "Database initialization complete ({} added, {} skipped)",
        summary.added, summary.skipped
    );
    Ok(summary)
}
