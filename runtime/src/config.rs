// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

//! Render configuration.
//!
//! The configuration is a camelCase JSON document deserialized into
//! [`RenderConfig`]. Every field has a default, so an empty object `{}` is a
//! valid configuration. [`RenderConfig::validate`] enforces the invariants
//! that must hold before any browser or server work starts.

use crate::crawl::ExclusionSet;
use crate::renderer::WaitStrategy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Fatal configuration problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("output directory must differ from source directory ({0})")]
    SameDirectory(PathBuf),
    #[error("{0} concurrency must be at least 1")]
    ZeroConcurrency(&'static str),
    #[error("invalid exclusion pattern {pattern:?}: {source}")]
    InvalidExclusion {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("invalid base URL {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// Something a strip directive can remove from the rendered HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StripTarget {
    /// `<script>` elements, except `application/ld+json` blocks.
    Scripts,
    /// `<style>` elements and stylesheet `<link>`s.
    Styles,
    /// HTML comments.
    Comments,
    Title,
    Meta,
    /// Everything inside `<head>`.
    Head,
    /// Everything inside `<body>`.
    Body,
}

/// Where the "original" (pre-script) content of a route comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentStrategy {
    /// Read the file the static server would answer with.
    #[default]
    StaticSource,
    /// Navigate separately and read the DOM at `DOMContentLoaded`.
    PreScript,
}

/// Global per-source inclusion defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectDefaults {
    pub original: bool,
    pub extracted: bool,
    /// Accepted for compatibility only. A configured static payload is
    /// always included, whatever this flag says.
    #[serde(rename = "static")]
    pub static_: bool,
}

impl Default for InjectDefaults {
    fn default() -> Self {
        Self {
            original: false,
            extracted: false,
            static_: true,
        }
    }
}

/// Per-content-type override: explicit flags for the two dynamic sources and
/// an optional static payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentTypeInject<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted: Option<bool>,
    #[serde(rename = "static", skip_serializing_if = "Option::is_none")]
    pub static_: Option<T>,
}

impl<T> Default for ContentTypeInject<T> {
    fn default() -> Self {
        Self {
            original: None,
            extracted: None,
            static_: None,
        }
    }
}

/// Injection overrides keyed by content type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<ContentTypeInject<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ContentTypeInject<BTreeMap<String, String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<ContentTypeInject<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<ContentTypeInject<String>>,
}

impl InjectOverrides {
    /// Fill every content type missing here from `fallback`.
    pub fn or(&self, fallback: &InjectOverrides) -> InjectOverrides {
        InjectOverrides {
            title: self.title.clone().or_else(|| fallback.title.clone()),
            meta: self.meta.clone().or_else(|| fallback.meta.clone()),
            head: self.head.clone().or_else(|| fallback.head.clone()),
            body: self.body.clone().or_else(|| fallback.body.clone()),
        }
    }
}

/// A route-pattern override. Absent fields fall back to the global value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteConfig {
    /// Exact path, wildcard path (`/blog/*`) or the global wildcard `*`.
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_until: Option<WaitStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_domains: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strip: Option<Vec<StripTarget>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inject: Option<InjectOverrides>,
}

/// Link-crawl settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CrawlSettings {
    pub enabled: bool,
    pub max_depth: u32,
    pub concurrency: usize,
    /// Substring patterns, or regexes prefixed with `re:`.
    pub exclude: Vec<String>,
    /// Follow links with denylisted schemes (`mailto:`, `tel:`, ...).
    pub crawl_special_protocols: bool,
    /// Sitemap file path (relative to the source dir) or `http(s)` URL.
    pub sitemap: Option<String>,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_depth: 3,
            concurrency: 3,
            exclude: Vec::new(),
            crawl_special_protocols: false,
            sitemap: None,
        }
    }
}

/// Original-content extraction settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentSourceSettings {
    pub strategy: ContentStrategy,
    pub cache: bool,
    pub index_file: String,
    pub extension: String,
}

impl Default for ContentSourceSettings {
    fn default() -> Self {
        Self {
            strategy: ContentStrategy::StaticSource,
            cache: true,
            index_file: "index.html".to_string(),
            extension: ".html".to_string(),
        }
    }
}

/// The fully validated configuration record for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderConfig {
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Serve from an already running server instead of the built-in one.
    pub base_url: Option<String>,
    pub routes: Vec<String>,
    /// Bound on concurrent final acquisitions.
    pub concurrency: usize,
    pub wait_until: WaitStrategy,
    pub timeout_ms: u64,
    pub extra_delay_ms: u64,
    pub retry: u32,
    pub retry_delay_ms: u64,
    pub block_domains: Vec<String>,
    pub strip: Vec<StripTarget>,
    pub inject_defaults: InjectDefaults,
    pub inject: InjectOverrides,
    pub route_overrides: Vec<RouteConfig>,
    pub crawl: CrawlSettings,
    pub content_source: ContentSourceSettings,
    pub verbose: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("dist"),
            output_dir: PathBuf::from("prerendered"),
            base_url: None,
            routes: vec!["/".to_string()],
            concurrency: 3,
            wait_until: WaitStrategy::NetworkIdle,
            timeout_ms: 30_000,
            extra_delay_ms: 0,
            retry: 2,
            retry_delay_ms: 1_000,
            block_domains: Vec::new(),
            strip: Vec::new(),
            inject_defaults: InjectDefaults::default(),
            inject: InjectOverrides::default(),
            route_overrides: Vec::new(),
            crawl: CrawlSettings::default(),
            content_source: ContentSourceSettings::default(),
            verbose: false,
        }
    }
}

impl RenderConfig {
    /// Load and validate a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&raw)?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a JSON config string.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants that must hold before a run starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if same_dir(&self.source_dir, &self.output_dir) {
            return Err(ConfigError::SameDirectory(self.output_dir.clone()));
        }
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency("render"));
        }
        if self.crawl.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency("crawl"));
        }
        ExclusionSet::compile(&self.crawl.exclude)?;
        if let Some(base) = &self.base_url {
            url::Url::parse(base).map_err(|source| ConfigError::InvalidBaseUrl {
                url: base.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

/// Compare two directories, resolving them on disk when possible and
/// lexically otherwise.
fn same_dir(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => lexical(a) == lexical(b),
    }
}

fn lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
