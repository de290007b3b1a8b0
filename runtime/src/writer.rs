// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

//! Writes rendered snapshots to the output directory.
//!
//! `/` lands in `index.html`, `/docs/intro` in `docs/intro/index.html`, and a
//! route that already names an `.html` file keeps its file name. A
//! `manifest.json` listing every page is written when the run finishes.

use crate::pipeline::{SnapshotResult, SnapshotSink};
use crate::route::Route;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

pub const MANIFEST_FILE: &str = "manifest.json";

/// One written page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub url: String,
    /// Path relative to the output directory.
    pub file: String,
    pub title: Option<String>,
    pub http_status: u16,
    pub timestamp: DateTime<Utc>,
}

/// [`SnapshotSink`] writing static HTML files.
pub struct FileSink {
    output_dir: PathBuf,
    entries: Mutex<Vec<ManifestEntry>>,
}

impl FileSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Output path of `route`, relative to the output directory.
    pub fn relative_path(route: &Route) -> Result<PathBuf> {
        if route.segments().any(|s| s == "..") {
            bail!("refusing to write route {route} outside the output directory");
        }
        let mut path: PathBuf = route.segments().collect();
        if route.is_root() || route.has_trailing_slash() || !route.as_str().ends_with(".html") {
            path.push("index.html");
        }
        Ok(path)
    }
}

#[async_trait]
impl SnapshotSink for FileSink {
    async fn write(&self, result: &SnapshotResult) -> Result<()> {
        let relative = Self::relative_path(&Route::normalize(&result.url))?;
        let path = self.output_dir.join(&relative);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&path, &result.html)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        debug!("wrote {} -> {}", result.url, path.display());

        let entry = ManifestEntry {
            url: result.url.clone(),
            file: relative.to_string_lossy().replace('\\', "/"),
            title: result.title.clone(),
            http_status: result.http_status,
            timestamp: result.timestamp,
        };
        self.entries
            .lock()
            .map_err(|_| anyhow::anyhow!("manifest lock poisoned"))?
            .push(entry);
        Ok(())
    }

    async fn finish(&self) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow::anyhow!("manifest lock poisoned"))?
            .clone();
        entries.sort_by(|a, b| a.url.cmp(&b.url));

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .with_context(|| format!("failed to create {}", self.output_dir.display()))?;
        let path = self.output_dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(&entries)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}
