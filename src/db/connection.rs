use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::settings::DatabaseSettings;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;
pub type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub fn init_pool(settings: &DatabaseSettings) -> Result<PgPool, r2d2::Error> {
    let manager = ConnectionManager::<PgConnection>::new(settings.url.as_str());
    Pool::builder()
        .max_size(settings.pool_size)
        .connection_timeout(std::time::Duration::from_secs(settings.timeout_seconds))
        .build(manager)
}

pub fn run_migrations(conn: &mut PgConnection) -> anyhow::Result<usize> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| anyhow::anyhow!("failed to run migrations: {e}"))?;
    for version in &applied {
        log::info!("Applied migration {}", version);
    }
    Ok(applied.len())
}
