// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

//! Content merging.
//!
//! Three sources feed the final page: the pre-script ("original") record, the
//! post-script ("extracted") record and static payloads from configuration.
//! For each content type the merger decides which sources are enabled,
//! overlays them in the fixed order original, extracted, static, and injects
//! the result into the rendered markup.

pub mod inject;

use crate::config::{ContentTypeInject, InjectDefaults, InjectOverrides, StripTarget};
use crate::content::ContentRecord;
use crate::html;
use crate::route_config::EffectiveConfig;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Which sources contribute to one content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inclusion<T> {
    pub original: bool,
    pub extracted: bool,
    /// Static payload, included whenever present.
    pub static_: Option<T>,
}

impl<T: Clone> Inclusion<T> {
    fn resolve(over: Option<&ContentTypeInject<T>>, defaults: &InjectDefaults) -> Self {
        Self {
            original: over.and_then(|o| o.original).unwrap_or(defaults.original),
            extracted: over.and_then(|o| o.extracted).unwrap_or(defaults.extracted),
            static_: over.and_then(|o| o.static_.clone()),
        }
    }

    /// Whether any source is enabled for this type.
    pub fn any(&self) -> bool {
        self.original || self.extracted || self.static_.is_some()
    }
}

/// Inclusion decisions for every content type of a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InclusionPlan {
    pub title: Inclusion<String>,
    pub meta: Inclusion<BTreeMap<String, String>>,
    pub head: Inclusion<String>,
    pub body: Inclusion<String>,
    /// Meta explicitly excluded from the original source.
    strip_original_meta: bool,
    /// Title explicitly excluded from the original source.
    strip_original_title: bool,
}

impl InclusionPlan {
    pub fn resolve(inject: &InjectOverrides, defaults: &InjectDefaults) -> Self {
        let explicitly_off = |flag: Option<bool>| flag == Some(false);
        Self {
            title: Inclusion::resolve(inject.title.as_ref(), defaults),
            meta: Inclusion::resolve(inject.meta.as_ref(), defaults),
            head: Inclusion::resolve(inject.head.as_ref(), defaults),
            body: Inclusion::resolve(inject.body.as_ref(), defaults),
            strip_original_meta: explicitly_off(inject.meta.as_ref().and_then(|m| m.original)),
            strip_original_title: explicitly_off(inject.title.as_ref().and_then(|t| t.original)),
        }
    }

    fn injects(&self, target: StripTarget) -> bool {
        match target {
            StripTarget::Title => self.title.any(),
            StripTarget::Meta => self.meta.any(),
            StripTarget::Head => self.head.any(),
            StripTarget::Body => self.body.any(),
            StripTarget::Scripts | StripTarget::Styles | StripTarget::Comments => false,
        }
    }
}

/// The resolved content to inject into a page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergedContent {
    pub title: Option<String>,
    pub meta: BTreeMap<String, String>,
    pub head: Option<String>,
    pub body: Option<String>,
}

/// Merges content sources and injects the result into rendered HTML.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentMerger;

impl ContentMerger {
    pub fn new() -> Self {
        Self
    }

    /// Overlay the enabled sources in order original, extracted, static.
    pub fn merge(
        &self,
        route: &str,
        original: &ContentRecord,
        extracted: &ContentRecord,
        plan: &InclusionPlan,
    ) -> MergedContent {
        let mut merged = MergedContent::default();

        // Title: last enabled source with a value wins.
        for (source, enabled, title) in [
            ("original", plan.title.original, original.title.as_ref()),
            ("extracted", plan.title.extracted, extracted.title.as_ref()),
            ("static", plan.title.static_.is_some(), plan.title.static_.as_ref()),
        ] {
            if let (true, Some(title)) = (enabled, title) {
                debug!("{route}: title from {source}: {title:?}");
                merged.title = Some(title.clone());
            }
        }

        for (source, enabled, meta) in [
            ("original", plan.meta.original, Some(&original.meta)),
            ("extracted", plan.meta.extracted, Some(&extracted.meta)),
            ("static", plan.meta.static_.is_some(), plan.meta.static_.as_ref()),
        ] {
            if let (true, Some(meta)) = (enabled, meta) {
                for (key, value) in meta {
                    if let Some(previous) = merged.meta.insert(key.clone(), value.clone()) {
                        if &previous != value {
                            debug!("{route}: meta {key:?} overridden by {source}");
                        }
                    }
                }
            }
        }

        let original_head = original.head.as_deref().map(|head| {
            let mut ranges = Vec::new();
            if plan.strip_original_meta {
                ranges.extend(html::meta_ranges(head));
            }
            if plan.strip_original_title {
                ranges.extend(html::title_ranges(head));
            }
            html::remove_ranges(head, ranges)
        });

        merged.head = concat(
            route,
            "head",
            [
                ("original", plan.head.original, original_head.as_deref()),
                ("extracted", plan.head.extracted, extracted.head.as_deref()),
                ("static", true, plan.head.static_.as_deref()),
            ],
        );
        merged.body = concat(
            route,
            "body",
            [
                ("original", plan.body.original, original.body.as_deref()),
                ("extracted", plan.body.extracted, extracted.body.as_deref()),
                ("static", true, plan.body.static_.as_deref()),
            ],
        );
        merged
    }

    /// Strip, then inject `merged` into `page`.
    pub fn apply(
        &self,
        route: &str,
        page: &str,
        merged: &MergedContent,
        strip: &[StripTarget],
        plan: &InclusionPlan,
    ) -> String {
        for target in strip {
            if plan.injects(*target) {
                warn!(
                    "{route}: strip directive {target:?} removes content that is also injected; injected content is kept"
                );
            }
        }

        let mut out = inject::strip(page, strip);

        if let Some(title) = &merged.title {
            out = inject::set_title(&out, title);
        }
        for (key, value) in &merged.meta {
            let (next, change) = inject::upsert_meta(&out, key, value);
            debug!("{route}: meta {key:?} {change:?}");
            out = next;
        }
        if let Some(head) = &merged.head {
            out = inject::append_to_head(&out, head);
        }
        if let Some(body) = &merged.body {
            out = inject::prepend_to_body(&out, body);
        }
        out
    }

    /// Resolve, merge and apply for one route.
    pub fn render(
        &self,
        route: &str,
        page: &str,
        original: &ContentRecord,
        extracted: &ContentRecord,
        config: &EffectiveConfig,
    ) -> (String, MergedContent) {
        let plan = InclusionPlan::resolve(&config.inject, &config.inject_defaults);
        debug!("{route}: inclusion plan {plan:?}");
        let merged = self.merge(route, original, extracted, &plan);
        let html = self.apply(route, page, &merged, &config.strip, &plan);
        (html, merged)
    }
}

fn concat<'a>(
    route: &str,
    kind: &str,
    parts: [(&str, bool, Option<&'a str>); 3],
) -> Option<String> {
    let pieces: Vec<&str> = parts
        .into_iter()
        .filter_map(|(source, enabled, fragment)| {
            let fragment = fragment.map(str::trim).filter(|f| !f.is_empty())?;
            if enabled {
                debug!("{route}: {kind} fragment from {source}");
                Some(fragment)
            } else {
                None
            }
        })
        .collect();
    if pieces.is_empty() {
        None
    } else {
        Some(pieces.join("\n"))
    }
}
