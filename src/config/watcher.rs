//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::loader::{load_config, ConfigError};
use crate::inspect::ConfigToggles;

/// Watch `path` and swap reloaded inspection toggles into `toggles`.
///
/// The returned watcher must be kept alive for as long as reloads are wanted.
pub fn watch(
    path: &Path,
    toggles: Arc<ConfigToggles>,
) -> Result<RecommendedWatcher, notify::Error> {
    let watched: PathBuf = path.to_path_buf();

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                if let Err(e) = reload(&watched, &toggles) {
                    tracing::error!(error = %e, "Config reload failed, keeping current toggles");
                }
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Config watch error"),
        },
        Config::default().with_poll_interval(Duration::from_secs(2)),
    )?;

    watcher.watch(path, RecursiveMode::NonRecursive)?;

    tracing::info!(path = ?path, "Config watcher started");
    Ok(watcher)
}

/// Load `path` and apply its inspection section. Invalid files change nothing.
pub fn reload(path: &Path, toggles: &ConfigToggles) -> Result<(), ConfigError> {
    let config = load_config(path)?;
    tracing::info!(
        raw_dump = config.inspection.raw_dump,
        structured_log = config.inspection.structured_log,
        "Inspection toggles reloaded"
    );
    toggles.update(config.inspection);
    Ok(())
}
