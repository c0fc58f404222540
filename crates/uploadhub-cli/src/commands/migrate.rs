//! Database migration command.

use uploadhub_core::config::database::StoreProvider;
use uploadhub_core::error::AppError;
use uploadhub_database::DatabasePool;

use crate::output;

/// Apply pending migrations to the configured database
pub async fn execute(env: &str) -> Result<(), AppError> {
    let config = super::load_config(env)?;
    if config.database.provider != StoreProvider::Postgres {
        output::print_warning("database.provider is not postgres; nothing to migrate.");
        return Ok(());
    }

    println!("Running database migrations...");
    let pool = DatabasePool::connect(&config.database).await?;
    pool.migrate().await?;
    pool.close().await;
    output::print_success("All migrations applied successfully.");
    Ok(())
}
