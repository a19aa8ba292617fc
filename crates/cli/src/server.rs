use crate::editor::EditorCommand;
use crate::http_api;
use crate::print_stdout;
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Router,
};
use findcode_indexer::{WorkspaceWatcher, WorkspaceWatcherConfig};
use findcode_protocol::{
    ClientMessage, ElementDescriptor, FailureKind, Resolution, ResolutionResponse,
    ResolveFailure, ServerMessage,
};
use findcode_resolver::ResolverSession;
use log::{debug, info, warn};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast::error::RecvError;

pub(crate) struct ServeOptions {
    pub bind: String,
    pub watch: bool,
    pub editor: Option<EditorCommand>,
}

pub(crate) struct ServerState {
    session: Arc<ResolverSession>,
    editor: Option<EditorCommand>,
    connections: AtomicUsize,
}

impl ServerState {
    pub(crate) fn new(session: Arc<ResolverSession>, editor: Option<EditorCommand>) -> Self {
        Self {
            session,
            editor,
            connections: AtomicUsize::new(0),
        }
    }

    /// Resolve on the blocking pool, then hand successes to the editor.
    async fn resolve(&self, descriptor: ElementDescriptor) -> Resolution {
        let session = Arc::clone(&self.session);
        let resolution = tokio::task::spawn_blocking(move || session.resolve(&descriptor))
            .await
            .unwrap_or_else(|err| {
                Err(ResolveFailure::new(
                    FailureKind::NoMatch,
                    format!("Resolution task failed: {err}"),
                ))
            });

        if let (Ok(location), Some(editor)) = (&resolution, &self.editor) {
            editor.launch(location);
        }
        resolution
    }
}

#[derive(Debug, Serialize)]
struct HealthReport {
    status: &'static str,
    root: Option<PathBuf>,
    source_maps: usize,
    connections: usize,
}

pub(crate) fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/ws", get(ws_upgrade))
        .route("/find-element", post(find_element))
        .route("/health", get(health))
        .with_state(state)
}

pub(crate) async fn serve(session: Arc<ResolverSession>, options: ServeOptions) -> Result<()> {
    let _watch_task = match (options.watch, session.root()) {
        (true, Some(root)) => match WorkspaceWatcher::start(&root, WorkspaceWatcherConfig::default()) {
            Ok(watcher) => Some(spawn_map_refresh(Arc::clone(&session), watcher)),
            Err(err) => {
                warn!("Workspace watcher unavailable, source maps will not refresh: {err}");
                None
            }
        },
        _ => None,
    };

    let state = Arc::new(ServerState::new(Arc::clone(&session), options.editor));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&options.bind)
        .await
        .with_context(|| format!("Failed to bind {}", options.bind))?;
    let local_addr = listener.local_addr()?;

    print_stdout(&format!("WebSocket endpoint: ws://{local_addr}/ws"))?;
    print_stdout(&format!("HTTP fallback: http://{local_addr}/find-element"))?;
    print_stdout(&format!("Health endpoint: http://{local_addr}/health"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    session.dispose();
    Ok(())
}

/// Rebuild the source map index whenever a `.map` file changes.
fn spawn_map_refresh(
    session: Arc<ResolverSession>,
    watcher: WorkspaceWatcher,
) -> tokio::task::JoinHandle<()> {
    let mut updates = watcher.subscribe();
    let root = watcher.root().to_path_buf();
    tokio::spawn(async move {
        let _watcher = watcher;
        loop {
            match updates.recv().await {
                Ok(change) if change.source_maps_changed => {}
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Missed {skipped} workspace change batch(es)");
                }
                Err(RecvError::Closed) => break,
            }

            let session = Arc::clone(&session);
            let root = root.clone();
            match tokio::task::spawn_blocking(move || session.initialize(&root)).await {
                Ok(Ok(stats)) => info!("Source maps refreshed: {} loaded", stats.loaded),
                Ok(Err(err)) => warn!("Source map refresh failed: {err}"),
                Err(err) => warn!("Source map refresh task failed: {err}"),
            }
        }
    })
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<ServerState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

struct ConnectionGuard<'a>(&'a AtomicUsize);

impl<'a> ConnectionGuard<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for ConnectionGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

async fn handle_socket(mut socket: WebSocket, state: Arc<ServerState>) {
    let _guard = ConnectionGuard::new(&state.connections);
    info!(
        "Client connected ({} open)",
        state.connections.load(Ordering::SeqCst)
    );

    let hello = ServerMessage::ConnectionEstablished {
        message: "Connected to find-code".to_string(),
    };
    if send(&mut socket, &hello).await.is_err() {
        return;
    }

    while let Some(message) = socket.recv().await {
        let reply = match message {
            Ok(Message::Text(text)) => handle_text(&state, &text).await,
            Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                Ok(text) => handle_text(&state, text).await,
                Err(err) => invalid_message(err),
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                debug!("WebSocket error: {err}");
                break;
            }
        };
        if send(&mut socket, &reply).await.is_err() {
            break;
        }
    }
    info!("Client disconnected");
}

async fn send(socket: &mut WebSocket, message: &ServerMessage) -> Result<()> {
    let text = serde_json::to_string(message)?;
    socket.send(Message::Text(text)).await?;
    Ok(())
}

/// Answer one inbound text frame.
pub(crate) async fn handle_text(state: &ServerState, text: &str) -> ServerMessage {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Ping) => ServerMessage::Pong {
            timestamp: now_millis(),
        },
        Ok(ClientMessage::FindElement { data }) => match state.resolve(data).await {
            Ok(location) => ServerMessage::ElementResolved { data: location },
            Err(failure) => ServerMessage::ElementNotFound { data: failure },
        },
        Err(err) => invalid_message(err),
    }
}

fn invalid_message(err: impl std::fmt::Display) -> ServerMessage {
    ServerMessage::Error {
        message: "Invalid message".to_string(),
        error: err.to_string(),
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

async fn find_element(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> Result<Response, StatusCode> {
    let descriptor: ElementDescriptor = match serde_json::from_slice(&body) {
        Ok(descriptor) => descriptor,
        Err(err) => {
            let body = http_api::error_body("invalid_request", format!("Invalid JSON request: {err}"));
            return http_api::build_response(StatusCode::BAD_REQUEST, &body);
        }
    };
    let response = ResolutionResponse::from(state.resolve(descriptor).await);
    http_api::build_response(StatusCode::OK, &response)
}

async fn health(State(state): State<Arc<ServerState>>) -> Result<Response, StatusCode> {
    let report = HealthReport {
        status: "ok",
        root: state.session.root(),
        source_maps: state.session.map_count(),
        connections: state.connections.load(Ordering::SeqCst),
    };
    http_api::build_response(StatusCode::OK, &report)
}
