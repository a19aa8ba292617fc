use findcode_indexer::{WorkspaceChange, WorkspaceWatcher, WorkspaceWatcherConfig};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::broadcast::Receiver;

#[cfg_attr(
    not(target_os = "linux"),
    ignore = "watcher latency test is only reliable on Linux"
)]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn source_map_write_is_published_as_change() {
    if std::env::var("SKIP_WATCH_FLOW").is_ok() {
        eprintln!("skipping watch_flow due to SKIP_WATCH_FLOW");
        return;
    }

    let temp = TempDir::new().expect("tempdir");
    let dist = temp.path().join("dist");
    tokio::fs::create_dir_all(&dist).await.expect("create dist");

    let cfg = WorkspaceWatcherConfig {
        debounce: Duration::from_millis(150),
        max_batch_wait: Duration::from_secs(1),
        notify_poll_interval: Duration::from_millis(100),
    };
    let watcher = match WorkspaceWatcher::start(temp.path(), cfg) {
        Ok(w) => w,
        Err(e) if e.to_string().contains("Too many open files") => {
            eprintln!("skipping watch_flow: {e}");
            return;
        }
        Err(e) => panic!("start watcher: {e}"),
    };
    let mut updates = watcher.subscribe();
    tokio::time::sleep(Duration::from_millis(200)).await;

    tokio::fs::write(dist.join("app.js.map"), r#"{"version":3}"#)
        .await
        .expect("write map");

    let change = wait_for(&mut updates, Duration::from_secs(4), |c| c.source_maps_changed)
        .await
        .expect("timeout waiting for source map change");
    assert!(change
        .paths
        .iter()
        .any(|p| p.file_name().is_some_and(|n| n == "app.js.map")));
}

#[cfg_attr(
    not(target_os = "linux"),
    ignore = "watcher latency test is only reliable on Linux"
)]
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn dependency_folders_are_not_published() {
    if std::env::var("SKIP_WATCH_FLOW").is_ok() {
        eprintln!("skipping watch_flow due to SKIP_WATCH_FLOW");
        return;
    }

    let temp = TempDir::new().expect("tempdir");
    let deps = temp.path().join("node_modules").join("lib");
    tokio::fs::create_dir_all(&deps).await.expect("create deps");

    let cfg = WorkspaceWatcherConfig {
        debounce: Duration::from_millis(100),
        max_batch_wait: Duration::from_millis(500),
        notify_poll_interval: Duration::from_millis(100),
    };
    let Ok(watcher) = WorkspaceWatcher::start(temp.path(), cfg) else {
        eprintln!("skipping watch_flow: watcher unavailable");
        return;
    };
    let mut updates = watcher.subscribe();
    tokio::time::sleep(Duration::from_millis(200)).await;

    tokio::fs::write(deps.join("index.js.map"), "{}")
        .await
        .expect("write map");

    let change = wait_for(&mut updates, Duration::from_millis(1500), |_| true).await;
    assert!(change.is_none(), "unexpected change: {change:?}");
}

async fn wait_for(
    rx: &mut Receiver<WorkspaceChange>,
    timeout: Duration,
    accept: impl Fn(&WorkspaceChange) -> bool,
) -> Option<WorkspaceChange> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            return None;
        }
        match tokio::time::timeout(remaining, rx.recv()).await {
            Ok(Ok(change)) if accept(&change) => return Some(change),
            Ok(Ok(_)) | Ok(Err(_)) => continue,
            Err(_) => return None,
        }
    }
}
