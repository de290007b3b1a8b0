// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

//! Page content records.
//!
//! A [`ContentRecord`] is the shape shared by the three content sources: the
//! pre-script ("original") page, the post-script ("extracted") DOM, and the
//! statically configured payload.

pub mod extractor;

pub use extractor::ContentExtractor;

use crate::html;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Title, meta map and head/body fragments of one page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub title: Option<String>,
    pub meta: BTreeMap<String, String>,
    pub head: Option<String>,
    pub body: Option<String>,
}

impl ContentRecord {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.meta.is_empty() && self.head.is_none() && self.body.is_none()
    }
}

/// Pattern-extract a record from a full HTML document.
///
/// Repeated meta keys resolve to the last occurrence. Empty titles and
/// whitespace-only fragments are treated as absent.
pub fn extract_record(page: &str) -> ContentRecord {
    let title = html::find_title(page)
        .map(|(_, text)| text)
        .filter(|t| !t.is_empty());

    let meta = html::meta_tags(page)
        .into_iter()
        .map(|tag| (tag.key(), tag.value))
        .collect();

    let fragment = |range: Option<std::ops::Range<usize>>| {
        range
            .map(|r| page[r].trim().to_string())
            .filter(|s| !s.is_empty())
    };

    ContentRecord {
        title,
        meta,
        head: fragment(html::head_inner(page)),
        body: fragment(html::body_inner(page)),
    }
}
