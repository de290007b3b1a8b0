// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

//! The batch render driver.
//!
//! A run resolves the route set, then renders every route under a bounded
//! number of concurrent acquisitions: resolve its effective configuration,
//! gather original and extracted content, merge, and hand the result to a
//! [`SnapshotSink`]. The first route that exhausts its retries aborts the
//! remaining routes and fails the run.

use crate::config::{ConfigError, RenderConfig};
use crate::content::{extract_record, ContentExtractor, ContentRecord};
use crate::crawl::{ResolvedRoutes, RouteResolver};
use crate::merge::{ContentMerger, InclusionPlan};
use crate::progress::{ProgressEventKind, ProgressReporter, ProgressSender};
use crate::renderer::{BlockList, Renderer};
use crate::route::Route;
use crate::route_config::RouteConfigResolver;
use crate::snapshot::{AcquireError, AcquireOptions, SnapshotAcquirer};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info};
use url::Url;

/// A finished page, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResult {
    /// The route path, e.g. `/about`.
    pub url: String,
    pub html: String,
    pub title: Option<String>,
    pub meta: BTreeMap<String, String>,
    pub http_status: u16,
    pub timestamp: DateTime<Utc>,
}

/// Receives every rendered page of a run.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    async fn write(&self, result: &SnapshotResult) -> Result<()>;

    /// Called once after every route was written.
    async fn finish(&self) -> Result<()> {
        Ok(())
    }
}

/// Why a route could not be completed.
#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    Acquire(#[from] AcquireError),
    #[error("failed to write snapshot for {route}: {message}")]
    Write { route: String, message: String },
}

impl RouteError {
    /// The route (or URL) that failed.
    pub fn route(&self) -> &str {
        match self {
            Self::Acquire(e) => e.url(),
            Self::Write { route, .. } => route,
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: String,
    pub routes: Vec<Route>,
    pub rendered: usize,
    pub elapsed_ms: u64,
}

struct Shared {
    route_configs: Arc<RouteConfigResolver>,
    acquirer: SnapshotAcquirer,
    extractor: ContentExtractor,
    merger: ContentMerger,
    base_url: Url,
    progress: ProgressReporter,
}

/// Drives a full render run.
pub struct RenderPipeline {
    config: RenderConfig,
    shared: Arc<Shared>,
    resolver: RouteResolver,
}

impl RenderPipeline {
    /// Build a pipeline over a running renderer and a reachable base URL.
    pub fn new(
        config: RenderConfig,
        renderer: Arc<dyn Renderer>,
        base_url: Url,
        progress: Option<ProgressSender>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let route_configs = Arc::new(RouteConfigResolver::new(&config));
        let acquirer = SnapshotAcquirer::new(Arc::clone(&renderer));
        let extractor = ContentExtractor::new(
            config.content_source.clone(),
            config.source_dir.clone(),
            Arc::clone(&renderer),
            base_url.clone(),
            config.timeout_ms,
        );
        let resolver = RouteResolver::new(
            acquirer.clone(),
            Arc::clone(&route_configs),
            base_url.clone(),
            config.crawl.clone(),
            config.source_dir.clone(),
        )?;

        let shared = Arc::new(Shared {
            route_configs,
            acquirer,
            extractor,
            merger: ContentMerger::new(),
            base_url,
            progress: ProgressReporter::new(progress, uuid::Uuid::new_v4().to_string()),
        });

        Ok(Self {
            config,
            shared,
            resolver,
        })
    }

    /// The block list every page of a run starts with.
    pub fn global_blocklist(config: &RenderConfig) -> BlockList {
        BlockList::new(&config.block_domains)
    }

    pub fn run_id(&self) -> &str {
        self.shared.progress.run_id()
    }

    /// Resolve the route set without rendering.
    pub async fn resolve_routes(&self) -> ResolvedRoutes {
        self.resolver.resolve(&self.config.routes).await
    }

    /// Resolve, render and write every route.
    pub async fn run(&self, sink: Arc<dyn SnapshotSink>) -> Result<RunSummary> {
        let started = Instant::now();
        let progress = &self.shared.progress;
        progress.emit(ProgressEventKind::RunStarted {
            explicit_routes: self.config.routes.len(),
        });
        info!("run {} started", self.run_id());

        let resolved = self.resolve_routes().await;
        progress.emit(ProgressEventKind::RoutesResolved {
            seeds: resolved.seeds.len(),
            discovered: resolved.discovered.len(),
        });
        let routes = resolved.all();

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let mut tasks: JoinSet<Result<(), RouteError>> = JoinSet::new();

        for route in routes.iter().cloned() {
            let shared = Arc::clone(&self.shared);
            let sink = Arc::clone(&sink);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return Ok(());
                };
                let route_started = Instant::now();
                let (result, attempts) = render_route(&shared, &route).await?;
                if let Err(e) = sink.write(&result).await {
                    return Err(RouteError::Write {
                        route: result.url.clone(),
                        message: format!("{e:#}"),
                    });
                }
                shared.progress.emit(ProgressEventKind::RouteRendered {
                    route: route.to_string(),
                    status: result.http_status,
                    attempts,
                    elapsed_ms: route_started.elapsed().as_millis() as u64,
                });
                Ok(())
            });
        }

        let mut rendered = 0;
        while let Some(joined) = tasks.join_next().await {
            let outcome = joined.context("render task panicked")?;
            if let Err(e) = outcome {
                tasks.abort_all();
                error!("{e}");
                progress.emit(ProgressEventKind::RouteFailed {
                    route: e.route().to_string(),
                    error: e.to_string(),
                });
                return Err(anyhow::Error::new(e).context("render run aborted"));
            }
            rendered += 1;
        }

        sink.finish().await.context("failed to finalize output")?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        progress.emit(ProgressEventKind::RunComplete {
            rendered,
            elapsed_ms,
        });
        info!("rendered {rendered} route(s) in {elapsed_ms}ms");
        Ok(RunSummary {
            run_id: self.run_id().to_string(),
            routes,
            rendered,
            elapsed_ms,
        })
    }
}

/// Render one route: acquire, extract, merge.
async fn render_route(shared: &Shared, route: &Route) -> Result<(SnapshotResult, u32), AcquireError> {
    let effective = shared.route_configs.resolve(route);
    let plan = InclusionPlan::resolve(&effective.inject, &effective.inject_defaults);
    let url = route.to_url(&shared.base_url);
    let options = AcquireOptions::from_effective(&effective);

    let needs_original =
        plan.title.original || plan.meta.original || plan.head.original || plan.body.original;
    let original_fut = async {
        if needs_original {
            shared.extractor.original(route).await
        } else {
            ContentRecord::default()
        }
    };
    let (original, snapshot) = tokio::join!(original_fut, shared.acquirer.acquire(&url, &options));
    let snapshot = snapshot?;
    if needs_original && original.is_empty() {
        shared.progress.emit(ProgressEventKind::Warning {
            message: format!("{route}: no original content available"),
        });
    }

    let (html, _merged) = shared.merger.render(
        route.as_str(),
        &snapshot.html,
        &original,
        &snapshot.extracted,
        &effective,
    );
    let final_record = extract_record(&html);

    Ok((
        SnapshotResult {
            url: route.to_string(),
            html,
            title: final_record.title,
            meta: final_record.meta,
            http_status: snapshot.http_status,
            timestamp: snapshot.timestamp,
        },
        snapshot.attempts,
    ))
}
