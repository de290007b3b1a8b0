// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

//! Sitemap loading.
//!
//! Only `<urlset><url><loc>` entries are read. Every failure degrades: a
//! missing or unparseable sitemap yields no routes, a malformed `loc` skips
//! that entry.

use super::ExclusionSet;
use crate::route::Route;
use anyhow::{Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::path::Path;
use tracing::{debug, warn};

/// Parse a sitemap document into its `loc` values.
pub fn parse_sitemap(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut locs = Vec::new();
    let mut buf = Vec::new();

    let mut in_url = false;
    let mut in_loc = false;
    let mut current_loc = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"url" => {
                    in_url = true;
                    current_loc.clear();
                }
                b"loc" if in_url => in_loc = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"url" if in_url => {
                    if !current_loc.is_empty() {
                        locs.push(current_loc.clone());
                    }
                    in_url = false;
                }
                b"loc" => in_loc = false,
                _ => {}
            },
            Ok(Event::Text(e)) if in_loc => {
                let text = e.unescape().context("invalid text in <loc>")?;
                current_loc.push_str(text.trim());
            }
            Ok(Event::CData(e)) if in_loc => {
                current_loc.push_str(String::from_utf8_lossy(&e).trim());
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "XML parse error at position {}: {e}",
                    reader.buffer_position()
                ));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(locs)
}

/// Turn `loc` values into routes, skipping malformed and excluded entries.
pub fn routes_from_locs(locs: &[String], exclusions: &ExclusionSet) -> Vec<Route> {
    let mut routes: Vec<Route> = Vec::new();
    for loc in locs {
        let url = match url::Url::parse(loc) {
            Ok(url) => url,
            Err(e) => {
                warn!("skipping malformed sitemap entry {loc:?}: {e}");
                continue;
            }
        };
        let route = Route::normalize(url.path());
        if exclusions.is_excluded(&route) {
            debug!("sitemap route {route} is excluded");
            continue;
        }
        if !routes.contains(&route) {
            routes.push(route);
        }
    }
    routes
}

async fn fetch(source: &str, source_dir: &Path, client: &reqwest::Client) -> Result<String> {
    if source.starts_with("http://") || source.starts_with("https://") {
        let response = client
            .get(source)
            .send()
            .await
            .with_context(|| format!("failed to fetch sitemap {source}"))?
            .error_for_status()
            .with_context(|| format!("sitemap {source} returned an error status"))?;
        return response.text().await.context("failed to read sitemap body");
    }

    let path = source_dir.join(source.trim_start_matches('/'));
    tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read sitemap {}", path.display()))
}

/// Load sitemap routes from a file (relative to `source_dir`) or URL.
/// Never fails: problems are logged and yield fewer routes.
pub async fn load_sitemap_routes(
    source: &str,
    source_dir: &Path,
    exclusions: &ExclusionSet,
    client: &reqwest::Client,
) -> Vec<Route> {
    let xml = match fetch(source, source_dir, client).await {
        Ok(xml) => xml,
        Err(e) => {
            warn!("{e:#}; continuing without sitemap routes");
            return Vec::new();
        }
    };
    match parse_sitemap(&xml) {
        Ok(locs) => {
            let routes = routes_from_locs(&locs, exclusions);
            debug!("sitemap {source}: {} loc(s), {} route(s)", locs.len(), routes.len());
            routes
        }
        Err(e) => {
            warn!("sitemap {source} is not valid XML ({e}); continuing without sitemap routes");
            Vec::new()
        }
    }
}
