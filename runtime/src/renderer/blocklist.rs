// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

//! Request block list applied at the network-interception layer.

/// A set of domain strings whose requests are aborted.
///
/// A request is blocked when its URL contains one of the strings, or when its
/// hostname equals one of them or is a subdomain of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockList {
    domains: Vec<String>,
}

impl BlockList {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let domains = domains
            .into_iter()
            .map(|d| d.as_ref().trim().to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { domains }
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    pub fn domains(&self) -> &[String] {
        &self.domains
    }

    /// Whether a request to `request_url` must be aborted.
    pub fn is_blocked(&self, request_url: &str) -> bool {
        if self.domains.is_empty() {
            return false;
        }
        let lowered = request_url.to_ascii_lowercase();
        let host = url::Url::parse(&lowered)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()));

        self.domains.iter().any(|domain| {
            if lowered.contains(domain.as_str()) {
                return true;
            }
            match &host {
                Some(h) => h == domain || h.ends_with(&format!(".{domain}")),
                None => false,
            }
        })
    }
}
