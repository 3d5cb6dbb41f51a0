pub mod media;
pub mod memory;
pub mod posts;
pub mod sessions;
pub mod users;

use anyhow::anyhow;
use diesel::{Connection, PgConnection};
use diesel_async::pooled_connection::deadpool::{Hook, Pool as DeadPool};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::info;

pub type Pool = DeadPool<AsyncPgConnection>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub fn create_pool(database_url: &str, max_size: usize) -> anyhow::Result<Pool> {
    // create a new connection pool with the default config
    let mgr = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);

    info!(max_size, "Starting DB pool");
    let pool = Pool::builder(mgr)
        .max_size(max_size)
        .post_create(Hook::async_fn(|_conn, metrics| {
            tracing::trace_span!("dbpool::post_create").in_scope(|| {
                tracing::trace!(?metrics, "Post-create");
                Box::pin(std::future::ready(Ok(())))
            })
        }))
        .runtime(deadpool::Runtime::Tokio1)
        .build()?;
    Ok(pool)
}

/// Migrations need a blocking connection, so they run off the async runtime.
pub async fn run_migrations(database_url: &str) -> anyhow::Result<()> {
    let url = database_url.to_owned();
    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        let mut conn = PgConnection::establish(&url)?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| anyhow!("migrations failed: {e}"))?;
        info!(count = applied.len(), "Applied migrations");
        Ok(())
    })
    .await?
}
