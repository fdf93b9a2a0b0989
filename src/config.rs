use anyhow::Result;
use moka::future::Cache;
use sea_orm::Database;
use std::time::Duration;

use crate::schemas::AppState;

/// Initialize application state against the given database URL
pub async fn initialize_app_state_with_url(database_url: &str) -> Result<AppState> {
    // Load configuration
    dotenvy::dotenv().ok();

    // Connect to database
    tracing::info!("Connecting to database: {}", database_url);
    let db = Database::connect(database_url).await?;

    // The due-soon sweep runs once per day per window, so a small cache
    // with a short TTL covers repeated triggers.
    let cache = Cache::builder()
        .max_capacity(64)
        .time_to_live(Duration::from_secs(300)) // 5 minutes
        .build();

    Ok(AppState { db, cache })
}
