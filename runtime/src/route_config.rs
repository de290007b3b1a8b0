// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-route configuration resolution.
//!
//! Route overrides are matched in priority order: exact path, then wildcard
//! path (`/blog/*`), then the global wildcard `*`. Only the single winning
//! override applies; every field it leaves unset falls back to the global
//! value.

use crate::config::{InjectDefaults, InjectOverrides, RenderConfig, RouteConfig, StripTarget};
use crate::renderer::WaitStrategy;
use crate::route::Route;
use regex::Regex;
use std::collections::HashMap;

/// The settings that apply to one route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    /// The override pattern that matched, if any.
    pub matched_pattern: Option<String>,
    pub wait_until: WaitStrategy,
    pub timeout_ms: u64,
    pub extra_delay_ms: u64,
    /// Per-route block list; `None` keeps the global list.
    pub block_domains: Option<Vec<String>>,
    pub retry: u32,
    pub retry_delay_ms: u64,
    pub strip: Vec<StripTarget>,
    pub inject_defaults: InjectDefaults,
    pub inject: InjectOverrides,
}

struct WildcardPattern {
    regex: Regex,
    literal_len: usize,
    index: usize,
}

/// Resolves [`EffectiveConfig`]s from a [`RenderConfig`].
pub struct RouteConfigResolver {
    base: EffectiveConfig,
    overrides: Vec<RouteConfig>,
    exact: HashMap<String, usize>,
    wildcards: Vec<WildcardPattern>,
    catch_all: Option<usize>,
}

impl RouteConfigResolver {
    pub fn new(config: &RenderConfig) -> Self {
        let base = EffectiveConfig {
            matched_pattern: None,
            wait_until: config.wait_until,
            timeout_ms: config.timeout_ms,
            extra_delay_ms: config.extra_delay_ms,
            block_domains: None,
            retry: config.retry,
            retry_delay_ms: config.retry_delay_ms,
            strip: config.strip.clone(),
            inject_defaults: config.inject_defaults,
            inject: config.inject.clone(),
        };

        let mut exact = HashMap::new();
        let mut wildcards = Vec::new();
        let mut catch_all = None;

        for (index, over) in config.route_overrides.iter().enumerate() {
            let pattern = over.pattern.trim();
            if pattern == "*" {
                catch_all.get_or_insert(index);
            } else if pattern.contains('*') {
                wildcards.push(WildcardPattern {
                    regex: wildcard_regex(pattern),
                    literal_len: pattern.chars().filter(|&c| c != '*').count(),
                    index,
                });
            } else {
                exact
                    .entry(Route::normalize(pattern).as_str().to_string())
                    .or_insert(index);
            }
        }

        // Most literal characters first; the stable sort keeps declaration
        // order for ties.
        wildcards.sort_by(|a, b| b.literal_len.cmp(&a.literal_len));

        Self {
            base,
            overrides: config.route_overrides.clone(),
            exact,
            wildcards,
            catch_all,
        }
    }

    /// The index of the override that applies to `route`.
    fn matching_override(&self, route: &Route) -> Option<usize> {
        if let Some(&index) = self.exact.get(route.as_str()) {
            return Some(index);
        }
        if let Some(w) = self
            .wildcards
            .iter()
            .find(|w| w.regex.is_match(route.as_str()))
        {
            return Some(w.index);
        }
        self.catch_all
    }

    pub fn resolve(&self, route: &Route) -> EffectiveConfig {
        let Some(index) = self.matching_override(route) else {
            return self.base.clone();
        };
        let over = &self.overrides[index];
        let base = &self.base;

        let effective = EffectiveConfig {
            matched_pattern: Some(over.pattern.clone()),
            wait_until: over.wait_until.unwrap_or(base.wait_until),
            timeout_ms: over.timeout_ms.unwrap_or(base.timeout_ms),
            extra_delay_ms: over.extra_delay_ms.unwrap_or(base.extra_delay_ms),
            block_domains: over.block_domains.clone(),
            retry: over.retry.unwrap_or(base.retry),
            retry_delay_ms: base.retry_delay_ms,
            strip: over.strip.clone().unwrap_or_else(|| base.strip.clone()),
            inject_defaults: base.inject_defaults,
            inject: over
                .inject
                .as_ref()
                .map(|i| i.or(&base.inject))
                .unwrap_or_else(|| base.inject.clone()),
        };
        tracing::debug!("route {route} matched override {:?}", over.pattern);
        effective
    }
}

/// Anchored regex where each `*` matches any substring.
fn wildcard_regex(pattern: &str) -> Regex {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("^{body}$")).expect("escaped wildcard pattern is a valid regex")
}
