// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI subcommand implementations for the `rendition` binary.

pub mod doctor;
pub mod output;
pub mod render_cmd;
pub mod routes_cmd;

use crate::config::RenderConfig;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "rendition.json";

/// Options shared by `render` and `routes`. Flags override config file values.
#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Path to a JSON config file (defaults to ./rendition.json when present)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Directory holding the built site
    #[arg(long)]
    pub source_dir: Option<PathBuf>,

    /// Directory the rendered pages are written to
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Render from an already running server instead of serving source-dir
    #[arg(long)]
    pub base_url: Option<String>,

    /// Route to render; repeat for several (replaces the configured list)
    #[arg(long = "route", short = 'r')]
    pub routes: Vec<String>,

    /// Maximum concurrent page renders
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Do not crawl links; render only explicit and sitemap routes
    #[arg(long)]
    pub no_crawl: bool,

    /// Maximum link depth when crawling
    #[arg(long)]
    pub max_depth: Option<u32>,

    /// Sitemap file (relative to source-dir) or URL
    #[arg(long)]
    pub sitemap: Option<String>,

    /// Port for the built-in static server (0 picks a free port)
    #[arg(long, default_value = "0")]
    pub port: u16,
}

impl RunArgs {
    /// Load the config file (if any), apply flag overrides and validate.
    pub fn load_config(&self) -> Result<RenderConfig> {
        let mut config = match &self.config {
            Some(path) => RenderConfig::load(path)
                .with_context(|| format!("cannot use config {}", path.display()))?,
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    RenderConfig::load(&default)
                        .with_context(|| format!("cannot use config {DEFAULT_CONFIG_FILE}"))?
                } else {
                    RenderConfig::default()
                }
            }
        };

        if let Some(dir) = &self.source_dir {
            config.source_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(url) = &self.base_url {
            config.base_url = Some(url.clone());
        }
        if !self.routes.is_empty() {
            config.routes = self.routes.clone();
        }
        if let Some(n) = self.concurrency {
            config.concurrency = n;
        }
        if self.no_crawl {
            config.crawl.enabled = false;
        }
        if let Some(depth) = self.max_depth {
            config.crawl.max_depth = depth;
        }
        if let Some(sitemap) = &self.sitemap {
            config.crawl.sitemap = Some(sitemap.clone());
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}
