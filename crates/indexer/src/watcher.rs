use crate::file_set::canonical_root;
use crate::scanner::{ALWAYS_IGNORED, SOURCE_MAP_EXTENSION, WORKSPACE_EXTENSIONS};
use crate::{IndexerError, Result};
use log::{debug, warn};
use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, Instant};

#[derive(Debug, Clone)]
pub struct WorkspaceWatcherConfig {
    /// Quiet period after the last event before a change is published.
    pub debounce: Duration,
    /// Upper bound on how long a burst of events may delay publication.
    pub max_batch_wait: Duration,
    pub notify_poll_interval: Duration,
}

impl Default for WorkspaceWatcherConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            max_batch_wait: Duration::from_secs(3),
            notify_poll_interval: Duration::from_secs(2),
        }
    }
}

/// A debounced batch of relevant filesystem changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceChange {
    pub paths: Vec<PathBuf>,
    pub source_maps_changed: bool,
}

/// Watches a workspace root and publishes debounced [`WorkspaceChange`]s.
///
/// Must be started inside a Tokio runtime. Dropping the watcher stops the
/// background loop.
pub struct WorkspaceWatcher {
    root: PathBuf,
    updates: broadcast::Sender<WorkspaceChange>,
    shutdown: mpsc::Sender<()>,
    _watcher: RecommendedWatcher,
}

impl WorkspaceWatcher {
    pub fn start(root: impl AsRef<Path>, config: WorkspaceWatcherConfig) -> Result<Self> {
        let root = canonical_root(root.as_ref())?;
        let (event_tx, event_rx) = mpsc::channel(1024);
        let (shutdown, shutdown_rx) = mpsc::channel(1);
        let (updates, _) = broadcast::channel(32);

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = event_tx.blocking_send(res);
            },
            NotifyConfig::default().with_poll_interval(config.notify_poll_interval),
        )
        .map_err(|e| IndexerError::Other(format!("watcher init failed: {e}")))?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        spawn_debounce_loop(root.clone(), config, event_rx, shutdown_rx, updates.clone());

        Ok(Self {
            root,
            updates,
            shutdown,
            _watcher: watcher,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkspaceChange> {
        self.updates.subscribe()
    }
}

impl Drop for WorkspaceWatcher {
    fn drop(&mut self) {
        let _ = self.shutdown.try_send(());
    }
}

fn spawn_debounce_loop(
    root: PathBuf,
    config: WorkspaceWatcherConfig,
    mut event_rx: mpsc::Receiver<notify::Result<Event>>,
    mut shutdown_rx: mpsc::Receiver<()>,
    updates: broadcast::Sender<WorkspaceChange>,
) {
    tokio::spawn(async move {
        let mut pending = PendingBatch::default();

        loop {
            let deadline = pending.deadline(&config);

            tokio::select! {
                event = event_rx.recv() => {
                    let Some(event) = event else { break };
                    match event {
                        Ok(event) => {
                            for path in event.paths {
                                if is_relevant_path(&root, &path) {
                                    pending.record(path);
                                }
                            }
                        }
                        Err(err) => warn!("Watcher error: {err}"),
                    }
                }
                _ = shutdown_rx.recv() => break,
                () = async {
                    if let Some(deadline) = deadline {
                        time::sleep_until(deadline).await;
                    }
                }, if deadline.is_some() => {
                    let change = pending.take();
                    debug!(
                        "Workspace change: {} path(s), source maps changed: {}",
                        change.paths.len(),
                        change.source_maps_changed
                    );
                    let _ = updates.send(change);
                }
            }
        }
        debug!("Workspace watcher for {} stopped", root.display());
    });
}

#[derive(Default)]
struct PendingBatch {
    paths: BTreeSet<PathBuf>,
    first_event: Option<Instant>,
    last_event: Option<Instant>,
}

impl PendingBatch {
    fn record(&mut self, path: PathBuf) {
        let now = Instant::now();
        self.first_event.get_or_insert(now);
        self.last_event = Some(now);
        self.paths.insert(path);
    }

    fn deadline(&self, config: &WorkspaceWatcherConfig) -> Option<Instant> {
        let first = self.first_event?;
        let last = self.last_event?;
        Some((last + config.debounce).min(first + config.max_batch_wait))
    }

    fn take(&mut self) -> WorkspaceChange {
        self.first_event = None;
        self.last_event = None;
        let paths: Vec<PathBuf> = std::mem::take(&mut self.paths).into_iter().collect();
        let source_maps_changed = paths.iter().any(|p| has_extension(p, &[SOURCE_MAP_EXTENSION]));
        WorkspaceChange {
            paths,
            source_maps_changed,
        }
    }
}

fn is_relevant_path(root: &Path, path: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };
    let ignored = relative.components().any(|component| {
        let std::path::Component::Normal(name) = component else {
            return false;
        };
        let lowered = name.to_string_lossy().to_lowercase();
        ALWAYS_IGNORED.contains(&lowered.as_str())
    });
    if ignored {
        return false;
    }

    has_extension(path, &[SOURCE_MAP_EXTENSION]) || has_extension(path, WORKSPACE_EXTENSIONS)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}
