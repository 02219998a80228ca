//! Embedded schema migrations.
//!
//! Diesel's migration harness is synchronous, so the run happens on a
//! blocking thread with its own short-lived connection.

use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

use crate::domain::ports::RepositoryError;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Apply every pending migration against `database_url`.
///
/// Returns the number of migrations applied.
///
/// # Errors
/// Returns [`RepositoryError::Connection`] when the database is unreachable
/// and [`RepositoryError::Query`] when a migration fails.
pub async fn run_migrations(database_url: &str) -> Result<usize, RepositoryError> {
    let url = database_url.to_owned();
    let applied = tokio::task::spawn_blocking(move || {
        let mut conn = PgConnection::establish(&url)
            .map_err(|err| RepositoryError::connection(err.to_string()))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map(|versions| versions.len())
            .map_err(|err| RepositoryError::query(format!("migration failed: {err}")))
    })
    .await
    .map_err(|err| RepositoryError::query(format!("migration task aborted: {err}")))??;
    info!(applied, "database migrations complete");
    Ok(applied)
}
