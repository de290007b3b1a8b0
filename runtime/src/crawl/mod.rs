// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

//! Route discovery: explicit routes, sitemap entries and a breadth-first
//! link crawl over the rendered site.
//!
//! The crawl proceeds in depth waves. Every route of a wave is rendered
//! concurrently (bounded by the crawl concurrency), then the wave's links are
//! folded into the [`CrawlState`] in wave order, so the state is only ever
//! touched by the resolver loop itself.

pub mod exclude;
pub mod links;
pub mod sitemap;

pub use exclude::ExclusionSet;

use crate::config::{ConfigError, CrawlSettings};
use crate::route::Route;
use crate::route_config::RouteConfigResolver;
use crate::snapshot::{AcquireOptions, SnapshotAcquirer};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use url::Url;

/// The final route set of one resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedRoutes {
    /// Explicit and sitemap routes.
    pub seeds: Vec<Route>,
    /// Routes found by crawling, in discovery order.
    pub discovered: Vec<Route>,
}

impl ResolvedRoutes {
    /// Seeds followed by discovered routes.
    pub fn all(&self) -> Vec<Route> {
        self.seeds.iter().chain(&self.discovered).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.seeds.len() + self.discovered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Visited set and discovery log of one resolution.
#[derive(Debug, Default)]
pub struct CrawlState {
    visited: HashSet<Route>,
    seeds: Vec<Route>,
    discovered: Vec<Route>,
    fetched: usize,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a seed. Returns false for duplicates.
    pub fn seed(&mut self, route: Route) -> bool {
        if !self.visited.insert(route.clone()) {
            return false;
        }
        self.seeds.push(route);
        true
    }

    /// Record a crawled link. Returns false when the route was already seen.
    pub fn discover(&mut self, route: Route) -> bool {
        if !self.visited.insert(route.clone()) {
            return false;
        }
        self.discovered.push(route);
        true
    }

    pub fn into_resolved(self) -> ResolvedRoutes {
        ResolvedRoutes {
            seeds: self.seeds,
            discovered: self.discovered,
        }
    }
}

/// Produces the full route set for a run.
pub struct RouteResolver {
    acquirer: SnapshotAcquirer,
    route_configs: Arc<RouteConfigResolver>,
    base_url: Url,
    settings: CrawlSettings,
    exclusions: ExclusionSet,
    source_dir: PathBuf,
    http: reqwest::Client,
}

impl RouteResolver {
    pub fn new(
        acquirer: SnapshotAcquirer,
        route_configs: Arc<RouteConfigResolver>,
        base_url: Url,
        settings: CrawlSettings,
        source_dir: impl Into<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let exclusions = ExclusionSet::compile(&settings.exclude)?;
        Ok(Self {
            acquirer,
            route_configs,
            base_url,
            settings,
            exclusions,
            source_dir: source_dir.into(),
            http: reqwest::Client::new(),
        })
    }

    /// Resolve explicit routes, sitemap routes and crawled routes.
    pub async fn resolve(&self, explicit: &[String]) -> ResolvedRoutes {
        let mut state = CrawlState::new();

        for raw in explicit {
            state.seed(Route::normalize(raw));
        }
        if let Some(source) = &self.settings.sitemap {
            let routes =
                sitemap::load_sitemap_routes(source, &self.source_dir, &self.exclusions, &self.http)
                    .await;
            for route in routes {
                state.seed(route);
            }
        }

        if !self.settings.enabled {
            debug!("crawling disabled; {} seed route(s)", state.seeds.len());
            return state.into_resolved();
        }

        let mut wave: Vec<Route> = state
            .seeds
            .iter()
            .filter(|r| {
                let excluded = self.exclusions.is_excluded(r);
                if excluded {
                    debug!("seed {r} is excluded from crawling");
                }
                !excluded
            })
            .cloned()
            .collect();

        let mut depth = 0;
        while !wave.is_empty() && depth < self.settings.max_depth {
            let found = self.crawl_wave(&wave, depth).await;
            state.fetched += wave.len();

            let mut next = Vec::new();
            for (route, links) in wave.iter().zip(found) {
                for link in links {
                    if self.exclusions.is_excluded(&link) {
                        continue;
                    }
                    if state.discover(link.clone()) {
                        debug!("discovered {link} from {route} at depth {}", depth + 1);
                        next.push(link);
                    }
                }
            }
            depth += 1;
            wave = next;
        }

        info!(
            "resolved {} seed route(s) and {} discovered route(s) after {} page fetch(es)",
            state.seeds.len(),
            state.discovered.len(),
            state.fetched
        );
        state.into_resolved()
    }

    /// Render every route of a wave and collect its links, in wave order.
    async fn crawl_wave(&self, wave: &[Route], depth: u32) -> Vec<Vec<Route>> {
        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency.max(1)));
        let mut tasks: JoinSet<(usize, Vec<Route>)> = JoinSet::new();

        for (index, route) in wave.iter().enumerate() {
            let options = AcquireOptions::discovery(&self.route_configs.resolve(route));
            let url = route.to_url(&self.base_url);
            let acquirer = self.acquirer.clone();
            let semaphore = Arc::clone(&semaphore);
            let origin = self.base_url.clone();
            let allow_special = self.settings.crawl_special_protocols;
            let route = route.clone();

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (index, Vec::new());
                };
                match acquirer.acquire(&url, &options).await {
                    Ok(snapshot) => {
                        let page_url = Url::parse(&snapshot.final_url).unwrap_or_else(|_| {
                            Url::parse(&url).unwrap_or_else(|_| origin.clone())
                        });
                        let found =
                            links::discover_links(&snapshot.html, &page_url, &origin, allow_special);
                        debug!("{route} (depth {depth}): {} link(s)", found.len());
                        (index, found)
                    }
                    Err(e) => {
                        warn!("crawl fetch of {route} failed, no links followed: {e}");
                        (index, Vec::new())
                    }
                }
            });
        }

        let mut results = vec![Vec::new(); wave.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, found)) => results[index] = found,
                Err(e) => warn!("crawl task failed: {e}"),
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::renderer::scripted::{Outcome, ScriptedRenderer};

    const BASE: &str = "http://localhost:4173";

    fn url(path: &str) -> String {
        format!("{BASE}{path}")
    }

    fn resolver(renderer: &ScriptedRenderer, settings: CrawlSettings) -> RouteResolver {
        let config = RenderConfig {
            retry: 0,
            retry_delay_ms: 0,
            ..Default::default()
        };
        RouteResolver::new(
            SnapshotAcquirer::new(Arc::new(renderer.clone())),
            Arc::new(RouteConfigResolver::new(&config)),
            Url::parse(BASE).unwrap(),
            settings,
            "/unused",
        )
        .unwrap()
    }

    fn site() -> ScriptedRenderer {
        ScriptedRenderer::new()
            .page(
                &url("/"),
                r#"<a href="/about">About</a> <a href="/contact">Contact</a>
                   <a href="https://other.example/x">Off</a> <a href="mailto:a@b.c">Mail</a>"#,
            )
            .page(&url("/about"), r#"<a href="/team">Team</a><a href="/">Home</a>"#)
            .page(&url("/contact"), r#"<a href="/about">About</a>"#)
            .page(&url("/team"), r#"<a href="/careers">Careers</a>"#)
    }

    fn settings(max_depth: u32) -> CrawlSettings {
        CrawlSettings {
            max_depth,
            concurrency: 2,
            ..Default::default()
        }
    }

    fn paths(routes: &[Route]) -> Vec<&str> {
        routes.iter().map(Route::as_str).collect()
    }

    #[tokio::test]
    async fn test_breadth_first_discovery() {
        let renderer = site();
        let resolved = resolver(&renderer, settings(2))
            .resolve(&["/".to_string()])
            .await;
        assert_eq!(paths(&resolved.seeds), vec!["/"]);
        assert_eq!(paths(&resolved.discovered), vec!["/about", "/contact", "/team"]);
        assert_eq!(paths(&resolved.all()), vec!["/", "/about", "/contact", "/team"]);
        // Depth-2 routes are discovered but not fetched.
        assert_eq!(renderer.navigations_to(&url("/team")), 0);
    }

    #[tokio::test]
    async fn test_each_route_fetched_once() {
        let renderer = site();
        resolver(&renderer, settings(5))
            .resolve(&["/".to_string(), "/about".to_string(), "/".to_string()])
            .await;
        for path in ["/", "/about", "/contact", "/team", "/careers"] {
            assert_eq!(renderer.navigations_to(&url(path)), 1, "{path}");
        }
    }

    #[tokio::test]
    async fn test_discovery_uses_load_wait() {
        let renderer = site();
        resolver(&renderer, settings(1))
            .resolve(&["/".to_string()])
            .await;
        let calls = renderer.navigations();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].wait, crate::renderer::WaitStrategy::Load);
    }

    #[tokio::test]
    async fn test_disabled_returns_seeds_only() {
        let renderer = site();
        let resolved = resolver(
            &renderer,
            CrawlSettings {
                enabled: false,
                ..settings(3)
            },
        )
        .resolve(&["/".to_string(), "about?x=1".to_string()])
        .await;
        assert_eq!(paths(&resolved.all()), vec!["/", "/about"]);
        assert!(renderer.navigations().is_empty());
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_seed() {
        let renderer = site().outcomes(&url("/"), vec![Outcome::Fail("net::ERR_FAILED")]);
        let resolved = resolver(&renderer, settings(2))
            .resolve(&["/".to_string()])
            .await;
        assert_eq!(paths(&resolved.all()), vec!["/"]);
    }

    #[tokio::test]
    async fn test_exclusions() {
        let renderer = site();
        let resolved = resolver(
            &renderer,
            CrawlSettings {
                exclude: vec!["/contact".to_string(), "re:^/ab".to_string()],
                ..settings(3)
            },
        )
        .resolve(&["/".to_string(), "/about".to_string()])
        .await;
        // Excluded seeds stay in the set but are not crawled.
        assert_eq!(paths(&resolved.seeds), vec!["/", "/about"]);
        assert!(resolved.discovered.is_empty());
        assert_eq!(renderer.navigations_to(&url("/about")), 0);
    }

    #[tokio::test]
    async fn test_sitemap_seeds() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("sitemap.xml"),
            "<urlset><url><loc>http://localhost:4173/contact</loc></url></urlset>",
        )
        .unwrap();
        let renderer = site();
        let config = RenderConfig::default();
        let resolved = RouteResolver::new(
            SnapshotAcquirer::new(Arc::new(renderer.clone())),
            Arc::new(RouteConfigResolver::new(&config)),
            Url::parse(BASE).unwrap(),
            CrawlSettings {
                enabled: false,
                sitemap: Some("sitemap.xml".to_string()),
                ..Default::default()
            },
            dir.path(),
        )
        .unwrap()
        .resolve(&["/".to_string()])
        .await;
        assert_eq!(paths(&resolved.seeds), vec!["/", "/contact"]);
    }
}
