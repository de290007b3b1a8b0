// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pattern-based HTML tag scanning.
//!
//! This is deliberately not a conforming HTML parser: tags are located with
//! regular expressions, which is adequate for the well-formed markup produced
//! by a browser's serializer or a static-site build. Every function here works
//! on byte ranges of the input so callers can splice edits back in.

use regex::Regex;
use std::ops::Range;
use std::sync::OnceLock;

fn title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").expect("title regex is valid")
    })
}

fn meta_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("meta regex is valid"))
}

fn anchor_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<a\b[^>]*>").expect("anchor regex is valid"))
}

fn attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
            .expect("attribute regex is valid")
    })
}

fn open_tag_re(tag: &str) -> Regex {
    Regex::new(&format!(r"(?is)<{tag}\b[^>]*>")).expect("open tag regex is valid")
}

fn close_tag_re(tag: &str) -> Regex {
    Regex::new(&format!(r"(?is)</{tag}\s*>")).expect("close tag regex is valid")
}

fn head_open_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| open_tag_re("head"))
}

fn head_close_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| close_tag_re("head"))
}

fn body_open_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| open_tag_re("body"))
}

fn body_close_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| close_tag_re("body"))
}

fn html_open_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| open_tag_re("html"))
}

fn doctype_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)\A\s*<!doctype\b[^>]*>").expect("doctype regex is valid"))
}

// ── Attributes ─────────────────────────────────────────────────

/// Parse the attributes of a single start tag such as `<meta name="x">`.
///
/// Names are lowercased, values are entity-decoded, valueless attributes get
/// an empty value.
pub fn parse_attributes(tag: &str) -> Vec<(String, String)> {
    let inner = tag
        .trim_start_matches('<')
        .trim_end_matches('>')
        .trim_end_matches('/');
    // Skip the tag name itself.
    let inner = match inner.find(|c: char| c.is_whitespace()) {
        Some(i) => &inner[i..],
        None => return Vec::new(),
    };

    attr_re()
        .captures_iter(inner)
        .map(|caps| {
            let name = caps[1].to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| decode_entities(m.as_str()))
                .unwrap_or_default();
            (name, value)
        })
        .collect()
}

/// Value of attribute `name` in a start tag.
pub fn attribute(tag: &str, name: &str) -> Option<String> {
    parse_attributes(tag)
        .into_iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v)
}

/// Decode the handful of entities that appear in serialized attributes.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

/// Escape a value for a double-quoted attribute.
pub fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape text content (used for `<title>`).
pub fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

// ── Title ──────────────────────────────────────────────────────

/// The first `<title>` element: its full range and decoded text.
pub fn find_title(html: &str) -> Option<(Range<usize>, String)> {
    let caps = title_re().captures(html)?;
    let whole = caps.get(0)?;
    let text = decode_entities(caps.get(1).map(|m| m.as_str()).unwrap_or_default().trim());
    Some((whole.range(), text))
}

/// Ranges of every `<title>` element.
pub fn title_ranges(html: &str) -> Vec<Range<usize>> {
    title_re().find_iter(html).map(|m| m.range()).collect()
}

// ── Meta ───────────────────────────────────────────────────────

/// Which attribute identifies a meta tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaForm {
    Charset,
    HttpEquiv(String),
    Property(String),
    Name(String),
}

impl MetaForm {
    /// Choose a form for a key that has no existing tag in the document.
    pub fn for_key(key: &str) -> Self {
        const PROPERTY_PREFIXES: [&str; 8] = [
            "og:", "article:", "book:", "profile:", "fb:", "music:", "video:", "product:",
        ];
        if key == "charset" {
            Self::Charset
        } else if let Some(name) = key.strip_prefix("http-equiv:") {
            Self::HttpEquiv(name.to_string())
        } else if PROPERTY_PREFIXES.iter().any(|p| key.starts_with(p)) {
            Self::Property(key.to_string())
        } else {
            Self::Name(key.to_string())
        }
    }

    /// The merge key: `charset`, `http-equiv:<name>`, the property or the name.
    /// `http-equiv` names are case-insensitive and keyed in lowercase.
    pub fn key(&self) -> String {
        match self {
            Self::Charset => "charset".to_string(),
            Self::HttpEquiv(name) => format!("http-equiv:{}", name.to_ascii_lowercase()),
            Self::Property(p) => p.clone(),
            Self::Name(n) => n.clone(),
        }
    }

    /// Serialize a tag of this form carrying `value`.
    pub fn render(&self, value: &str) -> String {
        let value = escape_attr(value);
        match self {
            Self::Charset => format!(r#"<meta charset="{value}">"#),
            Self::HttpEquiv(name) => format!(
                r#"<meta http-equiv="{}" content="{value}">"#,
                escape_attr(name)
            ),
            Self::Property(p) => {
                format!(r#"<meta property="{}" content="{value}">"#, escape_attr(p))
            }
            Self::Name(n) => format!(r#"<meta name="{}" content="{value}">"#, escape_attr(n)),
        }
    }
}

/// A meta tag located in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaTag {
    pub range: Range<usize>,
    pub form: MetaForm,
    pub value: String,
}

impl MetaTag {
    pub fn key(&self) -> String {
        self.form.key()
    }
}

/// Every keyed meta tag in document order. Tags with none of `charset`,
/// `http-equiv`, `property` or `name` are skipped.
pub fn meta_tags(html: &str) -> Vec<MetaTag> {
    meta_re()
        .find_iter(html)
        .filter_map(|m| {
            let attrs = parse_attributes(m.as_str());
            let get = |name: &str| {
                attrs
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, v)| v.clone())
            };
            let content = get("content").unwrap_or_default();
            let (form, value) = if let Some(charset) = get("charset") {
                (MetaForm::Charset, charset)
            } else if let Some(equiv) = get("http-equiv") {
                (MetaForm::HttpEquiv(equiv), content)
            } else if let Some(property) = get("property") {
                (MetaForm::Property(property), content)
            } else if let Some(name) = get("name") {
                (MetaForm::Name(name), content)
            } else {
                return None;
            };
            Some(MetaTag {
                range: m.range(),
                form,
                value,
            })
        })
        .collect()
}

/// Ranges of every `<meta>` tag, keyed or not.
pub fn meta_ranges(html: &str) -> Vec<Range<usize>> {
    meta_re().find_iter(html).map(|m| m.range()).collect()
}

// ── Sections ───────────────────────────────────────────────────

/// Range of the `<head>` opening tag.
pub fn head_open(html: &str) -> Option<Range<usize>> {
    head_open_re().find(html).map(|m| m.range())
}

/// Byte offset of `</head>`.
pub fn head_close(html: &str) -> Option<usize> {
    head_close_re().find(html).map(|m| m.start())
}

/// Range of the `<body>` opening tag.
pub fn body_open(html: &str) -> Option<Range<usize>> {
    body_open_re().find(html).map(|m| m.range())
}

/// Range of the `<html>` opening tag.
pub fn html_open(html: &str) -> Option<Range<usize>> {
    html_open_re().find(html).map(|m| m.range())
}

/// Range of a leading `<!DOCTYPE ...>` declaration, including any whitespace
/// before it.
pub fn doctype(html: &str) -> Option<Range<usize>> {
    doctype_re().find(html).map(|m| m.range())
}

/// Range of the content between `<head>` and `</head>`.
pub fn head_inner(html: &str) -> Option<Range<usize>> {
    let open = head_open(html)?;
    let close = head_close_re().find_at(html, open.end)?;
    Some(open.end..close.start())
}

/// Range of the content between `<body>` and `</body>` (or the end of the
/// document when the closing tag is missing).
pub fn body_inner(html: &str) -> Option<Range<usize>> {
    let open = body_open(html)?;
    let end = body_close_re()
        .find_at(html, open.end)
        .map(|m| m.start())
        .unwrap_or(html.len());
    Some(open.end..end)
}

// ── Elements ───────────────────────────────────────────────────

/// `href` values of every `<a>` tag, entity-decoded, in document order.
pub fn anchor_hrefs(html: &str) -> Vec<String> {
    anchor_re()
        .find_iter(html)
        .filter_map(|m| attribute(m.as_str(), "href"))
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
        .collect()
}

/// Ranges of `<tag ...>...</tag>` elements, in document order. `keep` sees the
/// opening tag and returns true for elements that must not be reported.
pub fn element_ranges(html: &str, tag: &str, keep: impl Fn(&str) -> bool) -> Vec<Range<usize>> {
    let open = open_tag_re(tag);
    let close = close_tag_re(tag);
    let mut ranges = Vec::new();
    let mut pos = 0;
    while let Some(start) = open.find_at(html, pos) {
        let end = close
            .find_at(html, start.end())
            .map(|m| m.end())
            .unwrap_or(html.len());
        if !keep(start.as_str()) {
            ranges.push(start.start()..end);
        }
        pos = end;
        if pos >= html.len() {
            break;
        }
    }
    ranges
}

/// Ranges of `<!-- ... -->` comments.
pub fn comment_ranges(html: &str) -> Vec<Range<usize>> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").expect("comment regex is valid"));
    re.find_iter(html).map(|m| m.range()).collect()
}

/// Ranges of stylesheet `<link>` tags.
pub fn stylesheet_link_ranges(html: &str) -> Vec<Range<usize>> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?is)<link\b[^>]*>").expect("link regex is valid"));
    re.find_iter(html)
        .filter(|m| {
            attribute(m.as_str(), "rel")
                .map(|rel| rel.to_ascii_lowercase().split_whitespace().any(|r| r == "stylesheet"))
                .unwrap_or(false)
        })
        .map(|m| m.range())
        .collect()
}

/// Remove the given byte ranges. Ranges may overlap and come in any order.
pub fn remove_ranges(html: &str, mut ranges: Vec<Range<usize>>) -> String {
    if ranges.is_empty() {
        return html.to_string();
    }
    ranges.sort_by_key(|r| r.start);
    let mut out = String::with_capacity(html.len());
    let mut pos = 0;
    for range in ranges {
        if range.start > pos {
            out.push_str(&html[pos..range.start]);
        }
        pos = pos.max(range.end);
    }
    if pos < html.len() {
        out.push_str(&html[pos..]);
    }
    out
}

/// Insert `fragment` at byte offset `at`.
pub fn insert_at(html: &str, at: usize, fragment: &str) -> String {
    let mut out = String::with_capacity(html.len() + fragment.len());
    out.push_str(&html[..at]);
    out.push_str(fragment);
    out.push_str(&html[at..]);
    out
}
