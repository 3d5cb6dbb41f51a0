use std::path::Path;
use std::sync::Arc;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tera::Tera;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

pub type Templates = Arc<RwLock<Tera>>;

pub fn load(dir: &Path) -> anyhow::Result<Templates> {
    let glob = dir.join("**").join("*");
    let tera = Tera::new(&glob.to_string_lossy())?;
    info!(templates = tera.get_template_names().count(), "Loaded templates");
    Ok(Arc::new(RwLock::new(tera)))
}

/// Reloads every template when anything under `dir` changes. Dropping the
/// returned watcher stops it.
pub fn watch(templates: Templates, dir: &Path) -> anyhow::Result<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        match res {
            Ok(event) if event.kind.is_access() || event.kind.is_other() => {}
            Ok(event) => {
                // notify calls back on its own thread, outside the runtime
                let mut tera = templates.blocking_write();
                match tera.full_reload() {
                    Ok(()) => info!(paths = ?event.paths, "Reloaded templates"),
                    Err(e) => error!(%e, "template reload failed"),
                }
            }
            Err(e) => warn!(%e, "template watcher error"),
        }
    })?;
    watcher.watch(dir, RecursiveMode::Recursive)?;
    info!(dir = %dir.display(), "Watching templates");
    Ok(watcher)
}
