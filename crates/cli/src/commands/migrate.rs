//! Database migration command.
//!
//! Applies the migrations in `crates/api/migrations/`.

use super::{CommandError, connect};

/// Run pending migrations.
///
/// # Errors
///
/// Returns `CommandError` when the database is unreachable or a migration
/// fails to apply.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../api/migrations").run(&pool).await?;

    tracing::info!("Migrations complete");
    Ok(())
}
