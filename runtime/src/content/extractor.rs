// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

//! Original (pre-script) content extraction.
//!
//! Two strategies produce the "original" record of a route: reading the file
//! the static server would answer with, or navigating with scripts held back
//! until `DOMContentLoaded`. Failures never propagate; they yield an empty
//! record and a warning.

use super::{extract_record, ContentRecord};
use crate::config::{ContentSourceSettings, ContentStrategy};
use crate::renderer::{Renderer, WaitStrategy};
use crate::route::Route;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

type CacheKey = (Route, ContentStrategy);

/// Produces original content records, caching them per (route, strategy).
pub struct ContentExtractor {
    settings: ContentSourceSettings,
    source_dir: PathBuf,
    renderer: Arc<dyn Renderer>,
    base_url: url::Url,
    timeout_ms: u64,
    cache: DashMap<CacheKey, Arc<OnceCell<ContentRecord>>>,
}

impl ContentExtractor {
    pub fn new(
        settings: ContentSourceSettings,
        source_dir: impl Into<PathBuf>,
        renderer: Arc<dyn Renderer>,
        base_url: url::Url,
        timeout_ms: u64,
    ) -> Self {
        Self {
            settings,
            source_dir: source_dir.into(),
            renderer,
            base_url,
            timeout_ms,
            cache: DashMap::new(),
        }
    }

    /// The original content of `route` using the configured strategy.
    pub async fn original(&self, route: &Route) -> ContentRecord {
        let strategy = self.settings.strategy;
        if !self.settings.cache {
            return self.load(route, strategy).await;
        }

        let cell = self
            .cache
            .entry((route.clone(), strategy))
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();
        cell.get_or_init(|| self.load(route, strategy))
            .await
            .clone()
    }

    async fn load(&self, route: &Route, strategy: ContentStrategy) -> ContentRecord {
        match strategy {
            ContentStrategy::StaticSource => self.from_static_source(route).await,
            ContentStrategy::PreScript => self.from_pre_script(route).await,
        }
    }

    async fn from_static_source(&self, route: &Route) -> ContentRecord {
        let Some(path) = self.resolve_static_path(route).await else {
            warn!("route {route} escapes the source directory, using empty original content");
            return ContentRecord::default();
        };
        match tokio::fs::read_to_string(&path).await {
            Ok(page) => {
                debug!("read original content for {route} from {}", path.display());
                extract_record(&page)
            }
            Err(e) => {
                warn!("cannot read {} for {route}: {e}", path.display());
                ContentRecord::default()
            }
        }
    }

    /// The file a static server answers with for `route`, or `None` when the
    /// route would leave the source directory.
    pub async fn resolve_static_path(&self, route: &Route) -> Option<PathBuf> {
        if route.segments().any(|s| s == "..") {
            return None;
        }
        let index = &self.settings.index_file;
        if route.is_root() {
            return Some(self.source_dir.join(index));
        }

        let relative: PathBuf = route.segments().collect();
        let dir = self.source_dir.join(&relative);
        if route.has_trailing_slash() {
            return Some(dir.join(index));
        }

        let ext = &self.settings.extension;
        if !ext.is_empty() && route.as_str().ends_with(ext.as_str()) {
            return Some(dir);
        }
        let with_ext = self
            .source_dir
            .join(format!("{}{ext}", relative.display()));
        if is_file(&with_ext).await {
            Some(with_ext)
        } else {
            Some(dir.join(index))
        }
    }

    async fn from_pre_script(&self, route: &Route) -> ContentRecord {
        let url = route.to_url(&self.base_url);
        let mut ctx = match self.renderer.new_context().await {
            Ok(ctx) => ctx,
            Err(e) => {
                warn!("cannot open a page for pre-script content of {route}: {e}");
                return ContentRecord::default();
            }
        };

        let record = match ctx
            .navigate(&url, WaitStrategy::DomContentLoaded, self.timeout_ms)
            .await
        {
            Ok(nav) if nav.response.as_ref().map_or(true, |r| r.is_success()) => {
                match ctx.get_html().await {
                    Ok(page) => extract_record(&page),
                    Err(e) => {
                        warn!("cannot read pre-script DOM of {url}: {e}");
                        ContentRecord::default()
                    }
                }
            }
            Ok(nav) => {
                warn!(
                    "pre-script navigation to {url} returned HTTP {}, using empty original content",
                    nav.status()
                );
                ContentRecord::default()
            }
            Err(e) => {
                warn!("pre-script navigation to {url} failed: {e}");
                ContentRecord::default()
            }
        };

        if let Err(e) = ctx.close().await {
            debug!("closing pre-script page for {url}: {e}");
        }
        record
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}
