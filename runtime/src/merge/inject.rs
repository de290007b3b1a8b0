// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

//! In-place edits of rendered markup: strip directives and content injection.

use crate::config::StripTarget;
use crate::html::{self, MetaForm};

/// Apply strip directives in the order given.
pub fn strip(page: &str, targets: &[StripTarget]) -> String {
    let mut out = page.to_string();
    for target in targets {
        out = match target {
            StripTarget::Scripts => {
                let ranges = html::element_ranges(&out, "script", |open| {
                    html::attribute(open, "type")
                        .is_some_and(|t| t.trim().eq_ignore_ascii_case("application/ld+json"))
                });
                html::remove_ranges(&out, ranges)
            }
            StripTarget::Styles => {
                let mut ranges = html::element_ranges(&out, "style", |_| false);
                ranges.extend(html::stylesheet_link_ranges(&out));
                html::remove_ranges(&out, ranges)
            }
            StripTarget::Comments => html::remove_ranges(&out, html::comment_ranges(&out)),
            StripTarget::Title => html::remove_ranges(&out, html::title_ranges(&out)),
            StripTarget::Meta => html::remove_ranges(&out, html::meta_ranges(&out)),
            StripTarget::Head => match html::head_inner(&out) {
                Some(range) => html::remove_ranges(&out, vec![range]),
                None => out,
            },
            StripTarget::Body => match html::body_inner(&out) {
                Some(range) => html::remove_ranges(&out, vec![range]),
                None => out,
            },
        };
    }
    out
}

/// Make sure the document has a `<head>...</head>` section.
pub fn ensure_head(page: &str) -> String {
    match (html::head_open(page), html::head_close(page)) {
        (Some(_), Some(_)) => page.to_string(),
        (Some(open), None) => {
            let at = html::body_open(page)
                .map(|r| r.start)
                .filter(|&at| at >= open.end)
                .unwrap_or(page.len());
            html::insert_at(page, at, "</head>")
        }
        (None, _) => match html::html_open(page) {
            Some(open) => html::insert_at(page, open.end, "<head></head>"),
            None => {
                let at = html::doctype(page).map(|r| r.end).unwrap_or(0);
                html::insert_at(page, at, "<head></head>")
            }
        },
    }
}

/// Replace the existing `<title>` or insert one at the start of `<head>`.
pub fn set_title(page: &str, title: &str) -> String {
    let element = format!("<title>{}</title>", html::escape_text(title));
    if let Some((range, _)) = html::find_title(page) {
        let mut out = String::with_capacity(page.len());
        out.push_str(&page[..range.start]);
        out.push_str(&element);
        out.push_str(&page[range.end..]);
        return out;
    }
    let page = ensure_head(page);
    match html::head_open(&page) {
        Some(open) => html::insert_at(&page, open.end, &element),
        None => page,
    }
}

/// What [`upsert_meta`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaChange {
    Inserted,
    Replaced,
    Unchanged,
}

/// Insert or update the meta tag identified by `key`.
///
/// An existing tag with the same value is left alone, so applying the same
/// pair twice is a no-op. A different value replaces every tag carrying the
/// key; the new tag keeps the attribute form of the first one.
pub fn upsert_meta(page: &str, key: &str, value: &str) -> (String, MetaChange) {
    let wanted = MetaForm::for_key(key);
    let merge_key = wanted.key();
    let existing: Vec<_> = html::meta_tags(page)
        .into_iter()
        .filter(|tag| tag.key() == merge_key)
        .collect();

    if existing.len() == 1 && existing[0].value == value {
        return (page.to_string(), MetaChange::Unchanged);
    }

    let form = existing
        .first()
        .map(|tag| tag.form.clone())
        .unwrap_or(wanted);
    let change = if existing.is_empty() {
        MetaChange::Inserted
    } else {
        MetaChange::Replaced
    };

    let page = html::remove_ranges(page, existing.into_iter().map(|t| t.range).collect());
    (append_to_head(&page, &form.render(value)), change)
}

/// Insert `fragment` immediately before `</head>`.
pub fn append_to_head(page: &str, fragment: &str) -> String {
    let page = ensure_head(page);
    match html::head_close(&page) {
        Some(at) => html::insert_at(&page, at, fragment),
        None => page,
    }
}

/// Insert `fragment` right after the opening `<body>` tag, or at the end of
/// the document when there is none.
pub fn prepend_to_body(page: &str, fragment: &str) -> String {
    match html::body_open(page) {
        Some(open) => html::insert_at(page, open.end, fragment),
        None => format!("{page}{fragment}"),
    }
}
