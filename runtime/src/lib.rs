// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

//! Rendition runtime library: prerender a built web app into static HTML.
//!
//! Routes are discovered from an explicit list, a sitemap and a link crawl,
//! rendered in headless Chromium, merged with pre-script and configured
//! content, and written out as static pages.

#![allow(clippy::new_without_default, clippy::should_implement_trait)]

pub mod cli;
pub mod config;
pub mod content;
pub mod crawl;
pub mod html;
pub mod merge;
pub mod pipeline;
pub mod progress;
pub mod renderer;
pub mod route;
pub mod route_config;
pub mod serve;
pub mod snapshot;
pub mod writer;
