// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

//! Same-origin link discovery in rendered pages.

use crate::html;
use crate::route::Route;
use url::Url;

/// Schemes that never lead to a crawlable page.
pub const DENIED_SCHEMES: &[&str] = &[
    "mailto:",
    "tel:",
    "sms:",
    "fax:",
    "ftp:",
    "sftp:",
    "ftps:",
    "javascript:",
    "data:",
    "blob:",
    "file:",
    "about:",
    "chrome:",
    "chrome-extension:",
    "moz-extension:",
    "webkit:",
    "resource:",
];

pub fn has_denied_scheme(href: &str) -> bool {
    let lowered = href.trim_start().to_ascii_lowercase();
    DENIED_SCHEMES.iter().any(|s| lowered.starts_with(s))
}

/// Routes linked from `page`, in document order, without duplicates.
///
/// Relative hrefs resolve against `page_url`. Fragment-only links, links to
/// another origin than `origin`, and (unless `allow_special` is set) links
/// with a denylisted scheme are dropped.
pub fn discover_links(page: &str, page_url: &Url, origin: &Url, allow_special: bool) -> Vec<Route> {
    let mut routes: Vec<Route> = Vec::new();
    for href in html::anchor_hrefs(page) {
        if href.starts_with('#') {
            continue;
        }
        if !allow_special && has_denied_scheme(&href) {
            continue;
        }
        let Ok(target) = page_url.join(&href) else {
            continue;
        };
        if target.origin() != origin.origin() {
            continue;
        }
        let route = Route::normalize(target.path());
        if !routes.contains(&route) {
            routes.push(route);
        }
    }
    routes
}
