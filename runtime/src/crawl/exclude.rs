// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

//! Route exclusion patterns.

use crate::config::ConfigError;
use crate::route::Route;
use regex::Regex;

const REGEX_PREFIX: &str = "re:";

#[derive(Debug, Clone)]
enum Exclusion {
    Substring(String),
    Pattern(Regex),
}

/// Compiled exclusion patterns. A plain pattern excludes routes containing
/// it; a `re:`-prefixed pattern is a regular expression searched in the
/// route path.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    patterns: Vec<Exclusion>,
}

impl ExclusionSet {
    pub fn compile(patterns: &[String]) -> Result<Self, ConfigError> {
        let patterns = patterns
            .iter()
            .filter(|p| !p.trim().is_empty())
            .map(|p| match p.strip_prefix(REGEX_PREFIX) {
                Some(expr) => Regex::new(expr)
                    .map(Exclusion::Pattern)
                    .map_err(|source| ConfigError::InvalidExclusion {
                        pattern: p.clone(),
                        source,
                    }),
                None => Ok(Exclusion::Substring(p.clone())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn is_excluded(&self, route: &Route) -> bool {
        let path = route.as_str();
        self.patterns.iter().any(|p| match p {
            Exclusion::Substring(s) => path.contains(s.as_str()),
            Exclusion::Pattern(re) => re.is_match(path),
        })
    }
}
