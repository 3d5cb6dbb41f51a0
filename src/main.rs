mod background;
mod components;
mod config;
mod error;
mod middleware;
mod models;
mod routes;
mod schema;
mod services;
mod workflow;

use std::sync::Arc;

use tracing::*;

use crate::background::submissions::SubmissionTracker;
use crate::config::{templates, AppCfg, BackendCfg};
use crate::routes::AppState;
use crate::services::media::LocalMediaStore;
use crate::services::memory::MemoryBackend;
use crate::services::posts::PostServiceDb;
use crate::services::sessions::SessionServiceDb;
use crate::services::users::UserServiceDb;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AppCfg::load(AppCfg::figment())?;

    config::tracing::init(&cfg.log_level)?;

    let tera = templates::load(&cfg.templates_dir)?;
    // kept alive for as long as the server runs
    let _watcher = if cfg.watch_templates {
        Some(templates::watch(tera.clone(), &cfg.templates_dir)?)
    } else {
        None
    };

    let state = match &cfg.backend {
        BackendCfg::Memory => {
            warn!("Using the in-memory backend, nothing will be persisted");
            AppState::in_memory(Arc::new(MemoryBackend::new()), tera, cfg.feed_limit)
        }
        BackendCfg::Postgres {
            database_url,
            max_connections,
        } => {
            services::run_migrations(database_url).await?;
            let pool = services::create_pool(database_url, *max_connections)?;
            AppState {
                posts: Arc::new(PostServiceDb::new(pool.clone())),
                users: Arc::new(UserServiceDb::new(pool.clone())),
                sessions: Arc::new(SessionServiceDb::new(pool)),
                media: Arc::new(LocalMediaStore::open(&cfg.media_dir).await?),
                templates: tera,
                submissions: Arc::new(SubmissionTracker::new()),
                feed_limit: cfg.feed_limit,
            }
        }
    };

    let app = routes::app(state, &cfg.assets_dir, cfg.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr).await?;
    info!("starting listening at {}", cfg.listen_addr);
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
