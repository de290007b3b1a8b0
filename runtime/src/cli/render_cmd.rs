// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

//! `rendition render`: serve, render, write.

use crate::cli::output::{self, Styled};
use crate::cli::RunArgs;
use crate::config::RenderConfig;
use crate::pipeline::RenderPipeline;
use crate::progress::{self, ProgressEventKind, ProgressReceiver};
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::Renderer;
use crate::serve::StaticServer;
use crate::writer::FileSink;
use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// The browser and (optionally) the static server of one invocation.
pub struct Session {
    pub renderer: Arc<ChromiumRenderer>,
    pub base_url: url::Url,
    server: Option<StaticServer>,
}

impl Session {
    /// Start the static server unless a base URL is configured, then launch
    /// Chromium with the global block list.
    pub async fn start(config: &RenderConfig, port: u16) -> Result<Self> {
        let (server, base_url) = match &config.base_url {
            Some(url) => (None, url::Url::parse(url).context("invalid base URL")?),
            None => {
                if !config.source_dir.is_dir() {
                    bail!(
                        "source directory {} does not exist; build the site first",
                        config.source_dir.display()
                    );
                }
                let server = StaticServer::start(
                    config.source_dir.clone(),
                    &config.content_source.index_file,
                    &config.content_source.extension,
                    port,
                )
                .await?;
                let base = server.base_url();
                (Some(server), base)
            }
        };

        let renderer = match ChromiumRenderer::new(RenderPipeline::global_blocklist(config)).await {
            Ok(r) => Arc::new(r),
            Err(e) => {
                if let Some(server) = server {
                    let _ = server.shutdown().await;
                }
                return Err(e.context("failed to launch Chromium (run `rendition doctor`)"));
            }
        };

        Ok(Self {
            renderer,
            base_url,
            server,
        })
    }

    /// Close the browser and stop the server.
    pub async fn stop(self) -> Result<()> {
        if let Err(e) = self.renderer.shutdown().await {
            warn!("browser shutdown failed: {e:#}");
        }
        if let Some(server) = self.server {
            server.shutdown().await?;
        }
        Ok(())
    }
}

pub async fn run(args: &RunArgs, config: RenderConfig) -> Result<()> {
    let s = Styled::new();
    let session = Session::start(&config, args.port).await?;

    let (tx, rx) = progress::channel();
    let view = if output::is_quiet() || output::is_json() {
        None
    } else {
        Some(tokio::spawn(show_progress(rx)))
    };

    let result = async {
        let pipeline = RenderPipeline::new(
            config.clone(),
            session.renderer.clone(),
            session.base_url.clone(),
            Some(tx),
        )?;
        let sink = Arc::new(FileSink::new(&config.output_dir));
        pipeline.run(sink).await
    }
    .await;

    if let Some(view) = view {
        let _ = view.await;
    }
    session.stop().await?;
    let summary = result?;

    if output::is_json() {
        output::print_json(&serde_json::to_value(&summary)?);
    } else if !output::is_quiet() {
        eprintln!(
            "  {} Rendered {} route(s) into {} in {:.1}s",
            s.ok_sym(),
            summary.rendered,
            s.bold(&config.output_dir.display().to_string()),
            summary.elapsed_ms as f64 / 1000.0
        );
    }
    Ok(())
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.green} [{bar:40.green/dim}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░")
}

/// Render progress events until the channel closes.
async fn show_progress(mut rx: ProgressReceiver) {
    let s = Styled::new();
    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style());
    pb.set_message("discovering routes");
    pb.enable_steady_tick(Duration::from_millis(100));

    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        };
        match event.event {
            ProgressEventKind::RunStarted { .. } => {}
            ProgressEventKind::RoutesResolved { seeds, discovered } => {
                pb.set_style(bar_style());
                pb.set_length((seeds + discovered) as u64);
                pb.set_message(format!("{seeds} seed(s), {discovered} discovered"));
            }
            ProgressEventKind::RouteRendered { route, status, .. } => {
                pb.inc(1);
                pb.set_message(format!("{route} ({status})"));
            }
            ProgressEventKind::RouteFailed { route, error } => {
                pb.println(format!("  {} {route}: {error}", s.warn_sym()));
            }
            ProgressEventKind::Warning { message } => {
                pb.println(format!("  {} {message}", s.warn_sym()));
            }
            ProgressEventKind::RunComplete { .. } => break,
        }
    }
    pb.finish_and_clear();
}
