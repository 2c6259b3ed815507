//! Database connection utilities.

use crate::DatabaseResult;
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use imagery_error::{DatabaseError, DatabaseErrorKind};

/// Connection pool used by [`crate::PostgresImageRepository`].
pub type ImagePool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Build a connection pool for `database_url`.
///
/// # Errors
///
/// Returns an error if the initial connections cannot be established.
#[tracing::instrument(skip(database_url))]
pub fn establish_pool(database_url: &str) -> DatabaseResult<ImagePool> {
    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder().build(manager)?;
    tracing::info!(max_size = pool.max_size(), "Created database pool");
    Ok(pool)
}

/// Apply any pending schema migrations.
///
/// # Errors
///
/// Returns an error if a migration fails to apply.
#[tracing::instrument(skip(conn))]
pub fn run_migrations(conn: &mut PgConnection) -> DatabaseResult<()> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| DatabaseError::new(DatabaseErrorKind::Migration(e.to_string())))?;

    for version in &applied {
        tracing::info!(%version, "Applied migration");
    }
    Ok(())
}
