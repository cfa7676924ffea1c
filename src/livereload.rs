// src/livereload.rs

//! Live-reload server.
//!
//! Browsers load `/livereload.js`, which subscribes to `/livereload` (a
//! Server-Sent Events stream) and reloads the page, or just the stylesheets
//! for CSS changes, whenever a `reload` event arrives. The watcher feeds
//! changed output files into the [`LiveReloadHub`]; `POST /changed` does
//! the same by hand.

use std::convert::Infallible;
use std::net::SocketAddr;

use anyhow::Context;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info, warn};

use crate::errors::Result;

/// A changed output file, relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloadEvent {
    pub path: String,
}

/// Fan-out of reload events to every connected browser.
#[derive(Debug, Clone)]
pub struct LiveReloadHub {
    tx: broadcast::Sender<ReloadEvent>,
}

impl Default for LiveReloadHub {
    fn default() -> Self {
        Self::new(64)
    }
}

impl LiveReloadHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.tx.subscribe()
    }

    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Push a change to every client. Returns how many were reached.
    pub fn reload(&self, path: impl Into<String>) -> usize {
        let event = ReloadEvent { path: path.into() };
        match self.tx.send(event.clone()) {
            Ok(clients) => {
                debug!(path = %event.path, clients, "live reload sent");
                clients
            }
            Err(_) => {
                debug!(path = %event.path, "live reload: no clients connected");
                0
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangedRequest {
    #[serde(default)]
    pub files: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangedResponse {
    pub clients: usize,
    pub files: Vec<String>,
}

const CLIENT_JS: &str = r#"(function () {
  var script = document.currentScript;
  var origin = script ? new URL(script.src).origin : "";
  var source = new EventSource(origin + "/livereload");
  source.addEventListener("reload", function (e) {
    if (/\.css$/.test(e.data)) {
      var links = document.querySelectorAll('link[rel="stylesheet"]');
      for (var i = 0; i < links.length; i++) {
        var url = new URL(links[i].href);
        url.searchParams.set("livereload", Date.now());
        links[i].href = url.toString();
      }
    } else {
      window.location.reload();
    }
  });
})();
"#;

pub fn router(hub: LiveReloadHub) -> Router {
    Router::new()
        .route("/livereload", get(events))
        .route("/livereload.js", get(client_script))
        .route("/changed", post(changed))
        .with_state(hub)
}

async fn events(
    State(hub): State<LiveReloadHub>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    debug!(clients = hub.client_count() + 1, "live reload client connected");

    let stream = BroadcastStream::new(hub.subscribe()).filter_map(|msg| match msg {
        Ok(event) => Some(Ok(Event::default().event("reload").data(event.path))),
        Err(err) => {
            // Lagged: the client missed some events; the next one still reloads.
            warn!(error = %err, "live reload client lagging");
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn client_script() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript")], CLIENT_JS)
}

async fn changed(
    State(hub): State<LiveReloadHub>,
    Json(req): Json<ChangedRequest>,
) -> Json<ChangedResponse> {
    let clients = req
        .files
        .iter()
        .map(|file| hub.reload(file.clone()))
        .max()
        .unwrap_or(0);
    Json(ChangedResponse {
        clients,
        files: req.files,
    })
}

/// Bind `addr` and serve the live-reload routes in the background.
///
/// Returns the bound address (useful with port 0) and the server task.
pub async fn spawn_server(hub: LiveReloadHub, addr: SocketAddr) -> Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding live reload server to {addr}"))?;
    let local = listener.local_addr()?;
    info!(addr = %local, "live reload server listening");

    let app = router(hub);
    let handle = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            warn!(error = %err, "live reload server stopped");
        }
    });

    Ok((local, handle))
}
