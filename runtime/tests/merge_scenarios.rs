//! Merge behavior driven through a JSON configuration.
//!
//! Covers per-route override resolution, meta replacement without
//! duplicates, source priority and original-head filtering.

use rendition_runtime::config::{
    ContentTypeInject, InjectDefaults, InjectOverrides, RenderConfig, StripTarget,
};
use rendition_runtime::content::{extract_record, ContentRecord};
use rendition_runtime::merge::{ContentMerger, InclusionPlan};
use rendition_runtime::renderer::WaitStrategy;
use rendition_runtime::route::Route;
use rendition_runtime::route_config::RouteConfigResolver;
use std::collections::BTreeMap;

const RENDERED: &str = r##"<!DOCTYPE html><html><head><meta charset="utf-8"><title>App</title><meta name="theme-color" content="#000000"><script src="/app.js"></script><script type="application/ld+json">{"@type":"WebSite"}</script></head><body><div id="root">Hello</div></body></html>"##;

const CONFIG: &str = r##"{
    "waitUntil": "networkidle",
    "inject": {
        "meta": { "static": { "theme-color": "#ffffff", "og:title": "Docs" } }
    },
    "routeOverrides": [
        {
            "pattern": "/blog/*",
            "waitUntil": "load",
            "timeoutMs": 5000,
            "strip": ["scripts"],
            "inject": { "title": { "static": "Blog" } }
        }
    ]
}"##;

fn render_page(config: &RenderConfig, route: &str, page: &str) -> String {
    let resolver = RouteConfigResolver::new(config);
    let effective = resolver.resolve(&Route::normalize(route));
    let extracted = extract_record(page);
    let (html, _) = ContentMerger::new().render(
        route,
        page,
        &ContentRecord::default(),
        &extracted,
        &effective,
    );
    html
}

fn render(config: &RenderConfig, route: &str) -> String {
    render_page(config, route, RENDERED)
}

#[test]
fn test_global_meta_replaces_without_duplicates() {
    let config = RenderConfig::from_json_str(CONFIG).unwrap();
    let html = render(&config, "/");

    assert_eq!(html.matches("theme-color").count(), 1);
    assert!(html.contains(r##"<meta name="theme-color" content="#ffffff">"##));
    assert!(html.contains(r#"<meta property="og:title" content="Docs">"#));
    assert!(html.contains("<title>App</title>"));
    assert!(html.contains("/app.js"));

    // Rendering the output again changes nothing.
    let again = render_page(&config, "/", &html);
    assert_eq!(html, again);
}

#[test]
fn test_route_override_layers_on_global() {
    let config = RenderConfig::from_json_str(CONFIG).unwrap();
    let resolver = RouteConfigResolver::new(&config);

    let blog = resolver.resolve(&Route::normalize("/blog/hello-world"));
    assert_eq!(blog.matched_pattern.as_deref(), Some("/blog/*"));
    assert_eq!(blog.wait_until, WaitStrategy::Load);
    assert_eq!(blog.timeout_ms, 5000);
    assert_eq!(blog.strip, vec![StripTarget::Scripts]);

    let about = resolver.resolve(&Route::normalize("/about"));
    assert_eq!(about.matched_pattern, None);
    assert_eq!(about.wait_until, WaitStrategy::NetworkIdle);

    let html = render(&config, "/blog/hello-world");
    assert!(html.contains("<title>Blog</title>"));
    assert!(!html.contains("/app.js"));
    assert!(html.contains("application/ld+json"));
    // Meta not overridden by the route still comes from the global config.
    assert!(html.contains(r##"content="#ffffff""##));
}

#[test]
fn test_later_sources_win_for_title() {
    let original = ContentRecord {
        title: Some("Pre".to_string()),
        body: Some("<p>pre</p>".to_string()),
        ..Default::default()
    };
    let extracted = ContentRecord {
        title: Some("Post".to_string()),
        body: Some("<p>post</p>".to_string()),
        ..Default::default()
    };
    let all_on = InjectDefaults {
        original: true,
        extracted: true,
        static_: true,
    };
    let merger = ContentMerger::new();

    let plan = InclusionPlan::resolve(&InjectOverrides::default(), &all_on);
    let merged = merger.merge("/", &original, &extracted, &plan);
    assert_eq!(merged.title.as_deref(), Some("Post"));
    assert_eq!(merged.body.as_deref(), Some("<p>pre</p>\n<p>post</p>"));

    let overrides = InjectOverrides {
        title: Some(ContentTypeInject {
            static_: Some("Static".to_string()),
            ..Default::default()
        }),
        body: Some(ContentTypeInject {
            original: Some(false),
            static_: Some("<p>static</p>".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    };
    let plan = InclusionPlan::resolve(&overrides, &all_on);
    let merged = merger.merge("/", &original, &extracted, &plan);
    assert_eq!(merged.title.as_deref(), Some("Static"));
    assert_eq!(merged.body.as_deref(), Some("<p>post</p>\n<p>static</p>"));
}

#[test]
fn test_original_head_filtered_when_meta_disabled() {
    let original = ContentRecord {
        title: Some("Old".to_string()),
        meta: BTreeMap::from([("description".to_string(), "old".to_string())]),
        head: Some(
            r#"<title>Old</title><meta name="description" content="old"><link rel="canonical" href="/x">"#
                .to_string(),
        ),
        body: None,
    };
    let overrides = InjectOverrides {
        meta: Some(ContentTypeInject {
            original: Some(false),
            ..Default::default()
        }),
        head: Some(ContentTypeInject {
            original: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    };
    let plan = InclusionPlan::resolve(&overrides, &InjectDefaults::default());
    let merged = ContentMerger::new().merge("/", &original, &ContentRecord::default(), &plan);

    assert!(merged.meta.is_empty());
    let head = merged.head.unwrap();
    assert!(head.contains(r#"<link rel="canonical" href="/x">"#));
    assert!(head.contains("<title>Old</title>"));
    assert!(!head.contains("description"));
}
