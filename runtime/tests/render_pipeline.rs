//! End-to-end render pipeline test without a browser.
//!
//! Serves a small built site with the static server, renders it with an
//! HTTP-backed renderer (no script execution), and checks the written pages
//! and manifest:
//! - route discovery (explicit + sitemap + crawl)
//! - per-route overrides (strip, inject)
//! - original/extracted/static merge
//! - manifest shape

use anyhow::Result;
use assert_json_diff::assert_json_include;
use async_trait::async_trait;
use rendition_runtime::config::{
    ContentTypeInject, InjectDefaults, InjectOverrides, RenderConfig, RouteConfig, StripTarget,
};
use rendition_runtime::pipeline::RenderPipeline;
use rendition_runtime::renderer::{
    BlockList, NavigationError, NavigationResult, RenderContext, Renderer, ResponseDiagnostics,
    WaitStrategy,
};
use rendition_runtime::serve::StaticServer;
use rendition_runtime::writer::{FileSink, MANIFEST_FILE};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_test::assert_ok;

// ── HTTP renderer fixture ──

/// Fetches pages over HTTP; the "rendered" DOM is the served markup.
struct HttpRenderer {
    client: reqwest::Client,
    active: Arc<AtomicUsize>,
    global: BlockList,
}

impl HttpRenderer {
    fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            active: Arc::new(AtomicUsize::new(0)),
            global: BlockList::default(),
        }
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        self.active.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(HttpContext {
            client: self.client.clone(),
            active: Arc::clone(&self.active),
            html: String::new(),
        }))
    }

    fn global_blocklist(&self) -> BlockList {
        self.global.clone()
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

struct HttpContext {
    client: reqwest::Client,
    active: Arc<AtomicUsize>,
    html: String,
}

#[async_trait]
impl RenderContext for HttpContext {
    async fn set_blocklist(&mut self, _blocklist: BlockList) -> Result<()> {
        Ok(())
    }

    async fn navigate(
        &mut self,
        url: &str,
        _wait: WaitStrategy,
        _timeout_ms: u64,
    ) -> std::result::Result<NavigationResult, NavigationError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| NavigationError::Failed(e.to_string()))?;
        let status = response.status();
        let final_url = response.url().to_string();
        self.html = response
            .text()
            .await
            .map_err(|e| NavigationError::Failed(e.to_string()))?;
        Ok(NavigationResult {
            final_url,
            response: Some(ResponseDiagnostics {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                headers: Vec::new(),
            }),
            load_time_ms: 1,
        })
    }

    async fn get_html(&self) -> Result<String> {
        Ok(self.html.clone())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

// ── Site fixture ──

fn write(dir: &Path, rel: &str, body: &str) {
    let path = dir.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, body).unwrap();
}

fn build_site(dir: &Path) {
    write(
        dir,
        "index.html",
        r##"<!DOCTYPE html><html><head><meta charset="utf-8"><title>Home</title><meta name="theme-color" content="#000000"></head><body><nav><a href="/about">About</a><a href="/blog/">Blog</a><a href="mailto:team@example.com">Mail</a><a href="https://elsewhere.example/">Away</a></nav><script src="/app.js"></script></body></html>"##,
    );
    write(
        dir,
        "about.html",
        r#"<!DOCTYPE html><html><head><title>About us</title><meta name="description" content="About page"></head><body><h1>About</h1><a href="/team">Team</a></body></html>"#,
    );
    write(
        dir,
        "team.html",
        r#"<!DOCTYPE html><html><head><title>Team</title></head><body><h1>Team</h1></body></html>"#,
    );
    write(
        dir,
        "blog/index.html",
        r#"<!DOCTYPE html><html><head><title>Blog</title></head><body><script src="/blog.js"></script><a href="/blog/first">First</a></body></html>"#,
    );
    write(
        dir,
        "blog/first.html",
        r#"<!DOCTYPE html><html><head><title>First post</title></head><body><article>one</article><script src="/blog.js"></script></body></html>"#,
    );
    write(
        dir,
        "sitemap.xml",
        r#"<?xml version="1.0"?><urlset><url><loc>http://example.com/legal</loc></url></urlset>"#,
    );
    write(
        dir,
        "legal.html",
        r#"<!DOCTYPE html><html><head><title>Legal</title></head><body>terms</body></html>"#,
    );
}

fn config(source: &Path, output: &Path) -> RenderConfig {
    let mut config = RenderConfig {
        source_dir: source.to_path_buf(),
        output_dir: output.to_path_buf(),
        routes: vec!["/".to_string()],
        retry: 0,
        retry_delay_ms: 0,
        inject_defaults: InjectDefaults {
            original: false,
            extracted: false,
            static_: true,
        },
        inject: InjectOverrides {
            meta: Some(ContentTypeInject {
                static_: Some(BTreeMap::from([(
                    "theme-color".to_string(),
                    "#ffffff".to_string(),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        },
        route_overrides: vec![RouteConfig {
            pattern: "/blog/*".to_string(),
            strip: Some(vec![StripTarget::Scripts]),
            inject: Some(InjectOverrides {
                body: Some(ContentTypeInject {
                    static_: Some("<aside>subscribe</aside>".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }],
        ..Default::default()
    };
    config.crawl.max_depth = 3;
    config.crawl.concurrency = 2;
    config.crawl.sitemap = Some("sitemap.xml".to_string());
    config
}

async fn render_site() -> (TempDir, RenderConfig, Vec<String>) {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("dist");
    let output = dir.path().join("prerendered");
    build_site(&source);
    let config = config(&source, &output);

    let server = StaticServer::start(&source, "index.html", ".html", 0)
        .await
        .unwrap();
    let renderer = Arc::new(HttpRenderer::new());
    let pipeline =
        RenderPipeline::new(config.clone(), renderer.clone(), server.base_url(), None).unwrap();
    let summary = assert_ok!(pipeline.run(Arc::new(FileSink::new(&output))).await);
    assert_eq!(renderer.active_contexts(), 0);
    server.shutdown().await.unwrap();

    let routes = summary.routes.iter().map(|r| r.to_string()).collect();
    (dir, config, routes)
}

fn read(config: &RenderConfig, rel: &str) -> String {
    std::fs::read_to_string(config.output_dir.join(rel)).unwrap()
}

// ── Tests ──

#[tokio::test]
async fn test_routes_from_seeds_sitemap_and_crawl() {
    let (_dir, _config, routes) = render_site().await;
    assert_eq!(
        routes,
        vec!["/", "/legal", "/about", "/blog/", "/team", "/blog/first"]
    );
}

#[tokio::test]
async fn test_pages_written_with_merged_content() {
    let (_dir, config, _routes) = render_site().await;

    let home = read(&config, "index.html");
    assert_eq!(home.matches("theme-color").count(), 1);
    assert!(home.contains(r##"<meta name="theme-color" content="#ffffff">"##));
    assert!(home.contains("<title>Home</title>"));
    assert!(home.contains("/app.js"), "scripts only stripped under /blog/*");

    let about = read(&config, "about/index.html");
    assert!(about.contains(r##"<meta name="theme-color" content="#ffffff"></head>"##));
    assert!(about.contains(r#"<meta name="description" content="About page">"#));

    let post = read(&config, "blog/first/index.html");
    assert!(!post.contains("<script"));
    assert!(post.contains("<body><aside>subscribe</aside><article>one</article>"));

    // "/blog/" matches the wildcard too.
    let blog = read(&config, "blog/index.html");
    assert!(blog.contains("<aside>subscribe</aside>"));
    assert!(!blog.contains("blog.js"));
}

#[tokio::test]
async fn test_manifest_lists_every_page() {
    let (_dir, config, _routes) = render_site().await;
    let manifest: serde_json::Value =
        serde_json::from_str(&read(&config, MANIFEST_FILE)).unwrap();
    let entries = manifest.as_array().unwrap();
    assert_eq!(entries.len(), 6);
    assert_json_include!(
        actual: entries[0].clone(),
        expected: serde_json::json!({
            "url": "/",
            "file": "index.html",
            "title": "Home",
            "httpStatus": 200
        })
    );
    assert_json_include!(
        actual: manifest,
        expected: serde_json::json!([
            {"url": "/"},
            {"url": "/about", "file": "about/index.html", "title": "About us"}
        ])
    );
}

#[tokio::test]
async fn test_original_content_from_static_source() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("dist");
    let output = dir.path().join("out");
    build_site(&source);
    let mut config = config(&source, &output);
    config.crawl.enabled = false;
    config.crawl.sitemap = None;
    config.routes = vec!["/about".to_string()];
    config.inject = InjectOverrides {
        title: Some(ContentTypeInject {
            original: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    };

    // The served page differs from the source file, as a client-rendered app would.
    let served = TempDir::new().unwrap();
    write(
        served.path(),
        "about.html",
        r#"<html><head><title>Loading…</title></head><body><div id="app"></div></body></html>"#,
    );
    let server = StaticServer::start(served.path(), "index.html", ".html", 0)
        .await
        .unwrap();

    let pipeline = RenderPipeline::new(
        config.clone(),
        Arc::new(HttpRenderer::new()),
        server.base_url(),
        None,
    )
    .unwrap();
    pipeline.run(Arc::new(FileSink::new(&output))).await.unwrap();
    server.shutdown().await.unwrap();

    let about = read(&config, "about/index.html");
    assert!(about.contains("<title>About us</title>"));
    assert!(!about.contains("Loading"));
}
