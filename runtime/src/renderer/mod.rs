// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

//! Renderer abstraction for browser-based page rendering.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide). One renderer is
//! shared by the whole run; every acquisition gets its own context (tab).

pub mod blocklist;
pub mod chromium;

pub use blocklist::BlockList;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The page-lifecycle condition a navigation waits for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaitStrategy {
    /// `DOMContentLoaded`: markup parsed, scripts may not have run.
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    /// The `load` event has fired.
    #[default]
    #[serde(rename = "load")]
    Load,
    /// `load` plus a quiet network window.
    #[serde(rename = "networkidle")]
    NetworkIdle,
}

impl fmt::Display for WaitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DomContentLoaded => write!(f, "domcontentloaded"),
            Self::Load => write!(f, "load"),
            Self::NetworkIdle => write!(f, "networkidle"),
        }
    }
}

/// Status line and headers of the main document response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseDiagnostics {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
}

impl ResponseDiagnostics {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// A known, non-2xx status. Status 0 means the browser reported none.
    pub fn is_error_status(&self) -> bool {
        self.status != 0 && !self.is_success()
    }
}

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// The main document response, when the browser reported one.
    pub response: Option<ResponseDiagnostics>,
    /// Time taken to reach the wait condition in milliseconds.
    pub load_time_ms: u64,
}

impl NavigationResult {
    /// HTTP status of the main document, assuming 200 when none was seen.
    pub fn status(&self) -> u16 {
        self.response.as_ref().map(|r| r.status).unwrap_or(200)
    }
}

/// A single failed navigation attempt.
#[derive(Debug, Clone, Error)]
pub enum NavigationError {
    #[error("navigation timed out after {timeout_ms}ms waiting for {wait}")]
    Timeout {
        wait: WaitStrategy,
        timeout_ms: u64,
        /// The document response, if one arrived before the deadline.
        response: Option<ResponseDiagnostics>,
    },
    #[error("navigation returned HTTP {} {}", .0.status, .0.status_text)]
    Status(ResponseDiagnostics),
    #[error("navigation failed: {0}")]
    Failed(String),
}

impl NavigationError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn response(&self) -> Option<&ResponseDiagnostics> {
        match self {
            Self::Status(diag) => Some(diag),
            Self::Timeout { response, .. } => response.as_ref(),
            Self::Failed(_) => None,
        }
    }
}

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab) with the global block list installed.
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
    /// The block list applied to every new context.
    fn global_blocklist(&self) -> BlockList;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<()>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
}

/// A single browser context (tab) for rendering pages.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Replace the request block list of this context.
    async fn set_blocklist(&mut self, blocklist: BlockList) -> Result<()>;
    /// Navigate to a URL, waiting for `wait` within `timeout_ms`.
    async fn navigate(
        &mut self,
        url: &str,
        wait: WaitStrategy,
        timeout_ms: u64,
    ) -> std::result::Result<NavigationResult, NavigationError>;
    /// Get the full page HTML.
    async fn get_html(&self) -> Result<String>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod scripted;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_strategy_serde_names() {
        let json = serde_json::to_string(&WaitStrategy::NetworkIdle).unwrap();
        assert_eq!(json, "\"networkidle\"");
        let parsed: WaitStrategy = serde_json::from_str("\"domcontentloaded\"").unwrap();
        assert_eq!(parsed, WaitStrategy::DomContentLoaded);
        assert_eq!(WaitStrategy::default(), WaitStrategy::Load);
        assert_eq!(WaitStrategy::Load.to_string(), "load");
    }

    #[test]
    fn test_navigation_error_display() {
        let err = NavigationError::Status(ResponseDiagnostics {
            status: 404,
            status_text: "Not Found".to_string(),
            headers: Vec::new(),
        });
        assert_eq!(err.to_string(), "navigation returned HTTP 404 Not Found");
        assert_eq!(err.response().map(|r| r.status), Some(404));
        assert!(!err.is_timeout());

        let timeout = NavigationError::Timeout {
            wait: WaitStrategy::NetworkIdle,
            timeout_ms: 500,
            response: Some(ResponseDiagnostics {
                status: 200,
                status_text: "OK".to_string(),
                headers: Vec::new(),
            }),
        };
        assert!(timeout.is_timeout());
        assert!(timeout.to_string().contains("networkidle"));
        assert_eq!(timeout.response().map(|r| r.status), Some(200));
    }

    #[test]
    fn test_status_defaults_to_ok() {
        let nav = NavigationResult {
            final_url: "http://x/".to_string(),
            response: None,
            load_time_ms: 3,
        };
        assert_eq!(nav.status(), 200);
    }
}
