// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

//! Route normalization.
//!
//! A [`Route`] is the canonical form of a path on the site under render:
//! always `/`-leading, never carrying a query string or fragment. Every input
//! string maps to exactly one route and normalizing a route again is a no-op.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A normalized, `/`-leading site path without query or fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Route(String);

impl Route {
    /// Normalize an arbitrary string (path, relative path or absolute URL).
    pub fn normalize(input: &str) -> Self {
        let input = input.trim();

        // Absolute URLs contribute only their path.
        let path = match url::Url::parse(input) {
            Ok(parsed) if parsed.has_host() => parsed.path().to_string(),
            _ => input.to_string(),
        };

        let end = path.find(['?', '#']).unwrap_or(path.len());
        let path = path[..end].trim().trim_start_matches('/');

        Self(format!("/{path}"))
    }

    /// The root route `/`.
    pub fn root() -> Self {
        Self("/".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Whether the route ends in `/` (selects a directory index).
    pub fn has_trailing_slash(&self) -> bool {
        self.0.ends_with('/')
    }

    /// Path segments without the leading slash, ignoring empty segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Join this route onto a base URL.
    pub fn to_url(&self, base: &url::Url) -> String {
        let mut joined = base.clone();
        joined.set_path(&self.0);
        joined.set_query(None);
        joined.set_fragment(None);
        joined.to_string()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Route {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Route {
    fn from(s: &str) -> Self {
        Self::normalize(s)
    }
}
