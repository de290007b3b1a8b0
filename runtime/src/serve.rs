// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

//! Static file server for the build output being rendered.
//!
//! Serves the source directory over HTTP on localhost. A path without a
//! matching file falls back to `<path><extension>` and then to the index file,
//! so client-side routes of a single-page app resolve.

use anyhow::{Context, Result};
use axum::extract::State;
use axum::handler::Handler;
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

#[derive(Debug, Clone)]
struct ServeRoot {
    dir: PathBuf,
    index_file: String,
    extension: String,
}

/// Build the static router.
pub fn router(dir: impl Into<PathBuf>, index_file: &str, extension: &str) -> Router {
    let root = Arc::new(ServeRoot {
        dir: dir.into(),
        index_file: index_file.to_string(),
        extension: extension.to_string(),
    });
    let files = ServeDir::new(&root.dir)
        .append_index_html_on_directories(true)
        .fallback(html_fallback.with_state(Arc::clone(&root)));

    Router::new()
        .fallback_service(files)
        .layer(CorsLayer::permissive())
}

async fn html_fallback(State(root): State<Arc<ServeRoot>>, uri: Uri) -> Response {
    let rel = uri.path().trim_matches('/');
    if !rel.is_empty() && !rel.split('/').any(|s| s == "..") {
        let candidate = root.dir.join(format!("{rel}{}", root.extension));
        if let Ok(body) = tokio::fs::read(&candidate).await {
            return html(body);
        }
    }
    match tokio::fs::read(root.dir.join(&root.index_file)).await {
        Ok(body) => html(body),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

fn html(body: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "text/html; charset=utf-8")], body).into_response()
}

/// A running static server.
pub struct StaticServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl StaticServer {
    /// Bind `127.0.0.1:port` (0 picks a free port) and start serving `dir`.
    pub async fn start(dir: impl Into<PathBuf>, index_file: &str, extension: &str, port: u16) -> Result<Self> {
        let dir = dir.into();
        let app = router(dir.clone(), index_file, extension);
        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind static server to {addr}"))?;
        let addr = listener.local_addr()?;
        tracing::info!("serving {} on http://{addr}", dir.display());

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await
        });

        Ok(Self {
            addr,
            shutdown: Some(tx),
            handle,
        })
    }

    pub fn base_url(&self) -> url::Url {
        url::Url::parse(&format!("http://{}/", self.addr)).expect("socket address forms a valid URL")
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        (&mut self.handle)
            .await
            .context("static server task panicked")?
            .context("static server failed")?;
        tracing::debug!("static server on {} stopped", self.addr);
        Ok(())
    }
}
