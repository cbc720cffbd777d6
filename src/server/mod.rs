use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing::debug;

use crate::widget::runtime::{CompletionSink, WidgetStatus};
use crate::widget::{DisplaySnapshot, SharedDisplay};

#[derive(Clone)]
pub struct AppState {
    pub display: SharedDisplay,
    pub sink: CompletionSink,
    pub status: watch::Receiver<WidgetStatus>,
}

/// Build the Axum router: widget API, entry page, and the static asset directory.
pub fn router(state: AppState, static_dir: &Path, index_path: Option<&Path>) -> Router {
    let router = Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/api/widget", get(widget_handler))
        .route("/api/widget/transition-end", post(transition_end_handler));

    let router = match index_path {
        Some(path) => router.route_service("/", ServeFile::new(path)),
        None => router.route("/", get(index_handler)),
    };

    router
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

#[derive(Debug, Serialize)]
struct WidgetView {
    #[serde(flatten)]
    display: DisplaySnapshot,
    #[serde(flatten)]
    status: WidgetStatus,
}

/// GET /api/widget
async fn widget_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(WidgetView {
        display: state.display.snapshot(),
        status: *state.status.borrow(),
    })
}

#[derive(Debug, Deserialize)]
struct TransitionEnd {
    event: String,
}

/// POST /api/widget/transition-end  { "event": "transitionend" }
async fn transition_end_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TransitionEnd>,
) -> StatusCode {
    if state.sink.deliver(&body.event) {
        StatusCode::ACCEPTED
    } else {
        debug!("No listener armed for '{}'", body.event);
        StatusCode::CONFLICT
    }
}

/// Serve the embedded entry page.
async fn index_handler() -> impl IntoResponse {
    Html(WIDGET_HTML)
}

/// Embedded single-file host page (HTML + CSS + JS) mirroring the widget state.
const WIDGET_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Live Betting</title>
<style>
  * { box-sizing: border-box; margin: 0; padding: 0; }
  body { background: #0f1117; color: #e0e0e0; font-family: 'Segoe UI', system-ui, sans-serif; display: flex; justify-content: center; padding: 2rem; }
  #wrapper { display: flex; gap: 1rem; transition: transform .6s ease-in, opacity .6s ease-in; }
  #wrapper.slide-out { transform: translateX(-120%); opacity: 0; }
  .card { background: #1a1d27; border: 1px solid #2a2d3a; border-radius: 10px; padding: 1.2rem; width: 260px; display: grid; gap: .6rem; }
  .score { font-size: 1.6rem; font-weight: 700; }
  .game { display: flex; align-items: center; gap: .5rem; }
  .sport-icon { width: 24px; height: 24px; }
  .date { color: #8888aa; font-size: .85rem; }
  .betting-btn { background: #00c896; color: #000; text-decoration: none; text-align: center; padding: .5rem; border-radius: 6px; font-weight: 600; }
</style>
</head>
<body>
<div id="wrapper"></div>
<script>
const wrapper = document.getElementById('wrapper');
let revision = -1;
let listening = null;

function listen(signal) {
  if (!signal || listening === signal) return;
  listening = signal;
  wrapper.addEventListener(signal, function done(ev) {
    if (ev.target !== wrapper) return;
    wrapper.removeEventListener(signal, done, true);
    listening = null;
    fetch('/api/widget/transition-end', {
      method: 'POST',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify({ event: signal })
    });
  }, true);
}

async function poll() {
  try {
    const r = await fetch('/api/widget');
    if (!r.ok) return;
    const w = await r.json();
    if (w.revision === revision) return;
    revision = w.revision;
    if (wrapper.innerHTML !== w.markup) wrapper.innerHTML = w.markup;
    wrapper.className = w.classes.join(' ');
    listen(w.armedSignal);
  } catch (e) {
    // keep the last state on network errors
  }
}

poll();
setInterval(poll, 250);
</script>
</body>
</html>"#;
