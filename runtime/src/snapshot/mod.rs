// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

//! Resilient snapshot acquisition.
//!
//! The [`SnapshotAcquirer`] renders one URL in its own browser page:
//!
//! ```text
//! Idle -> Navigating -> Failed   -> (fallback | retry | give up)
//!                    -> Settling -> Extracting -> Succeeded
//! ```
//!
//! Navigation fails on a browser error or a non-2xx document status. The
//! retry schedule lives in [`policy`].

pub mod policy;

pub use policy::{AttemptPolicy, NextStep, RetryBudget, WaitFallback};

use crate::content::{extract_record, ContentRecord};
use crate::renderer::{
    BlockList, NavigationError, NavigationResult, RenderContext, Renderer, ResponseDiagnostics,
    WaitStrategy,
};
use crate::route_config::EffectiveConfig;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Acquisition failure after the retry policy gave up.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("failed to render {url} after {attempts} attempt(s): {last_error}")]
    Exhausted {
        url: String,
        attempts: u32,
        #[source]
        last_error: NavigationError,
        /// The last document response, when one was received.
        response: Option<ResponseDiagnostics>,
    },
    #[error("browser error while rendering {url}: {message}")]
    Browser { url: String, message: String },
}

impl AcquireError {
    pub fn url(&self) -> &str {
        match self {
            Self::Exhausted { url, .. } | Self::Browser { url, .. } => url,
        }
    }
}

/// Per-acquisition settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquireOptions {
    pub wait: WaitStrategy,
    pub timeout_ms: u64,
    pub extra_delay_ms: u64,
    pub retry: u32,
    pub retry_delay_ms: u64,
    /// Replaces the global block list for this acquisition only.
    pub block_override: Option<BlockList>,
}

impl AcquireOptions {
    pub fn from_effective(config: &EffectiveConfig) -> Self {
        Self {
            wait: config.wait_until,
            timeout_ms: config.timeout_ms,
            extra_delay_ms: config.extra_delay_ms,
            retry: config.retry,
            retry_delay_ms: config.retry_delay_ms,
            block_override: config.block_domains.as_ref().map(BlockList::new),
        }
    }

    /// Options for link discovery: the route's settings with the wait
    /// strategy relaxed to the default and no settling delay.
    pub fn discovery(config: &EffectiveConfig) -> Self {
        Self {
            wait: WaitStrategy::default(),
            extra_delay_ms: 0,
            ..Self::from_effective(config)
        }
    }
}

/// A rendered page.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub url: String,
    pub final_url: String,
    pub html: String,
    /// Title, meta and fragments of the rendered DOM.
    pub extracted: ContentRecord,
    pub http_status: u16,
    pub timestamp: DateTime<Utc>,
    pub attempts: u32,
}

/// Lifecycle of one acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireState {
    Idle,
    Navigating,
    Failed,
    Settling,
    Extracting,
    Succeeded,
}

impl fmt::Display for AcquireState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Navigating => "navigating",
            Self::Failed => "failed",
            Self::Settling => "settling",
            Self::Extracting => "extracting",
            Self::Succeeded => "succeeded",
        };
        f.write_str(name)
    }
}

struct Transitions<'a> {
    url: &'a str,
    state: AcquireState,
}

impl Transitions<'_> {
    fn to(&mut self, next: AcquireState) {
        debug!("{}: {} -> {}", self.url, self.state, next);
        self.state = next;
    }
}

/// Renders URLs through a shared [`Renderer`].
#[derive(Clone)]
pub struct SnapshotAcquirer {
    renderer: Arc<dyn Renderer>,
}

impl SnapshotAcquirer {
    pub fn new(renderer: Arc<dyn Renderer>) -> Self {
        Self { renderer }
    }

    /// Render `url` in a fresh page, retrying per `options`.
    pub async fn acquire(&self, url: &str, options: &AcquireOptions) -> Result<Snapshot, AcquireError> {
        let browser_err = |e: anyhow::Error| AcquireError::Browser {
            url: url.to_string(),
            message: format!("{e:#}"),
        };

        let mut ctx = self.renderer.new_context().await.map_err(browser_err)?;

        let overridden = match &options.block_override {
            Some(list) => match ctx.set_blocklist(list.clone()).await {
                Ok(()) => true,
                Err(e) => {
                    let _ = ctx.close().await;
                    return Err(browser_err(e));
                }
            },
            None => false,
        };

        let result = self.drive(ctx.as_mut(), url, options).await;

        if overridden {
            if let Err(e) = ctx.set_blocklist(self.renderer.global_blocklist()).await {
                warn!("failed to restore the global block list after {url}: {e}");
            }
        }
        if let Err(e) = ctx.close().await {
            debug!("closing page for {url}: {e}");
        }
        result
    }

    async fn drive(
        &self,
        ctx: &mut dyn RenderContext,
        url: &str,
        options: &AcquireOptions,
    ) -> Result<Snapshot, AcquireError> {
        let mut policy = AttemptPolicy::new(
            options.wait,
            options.retry,
            Duration::from_millis(options.retry_delay_ms),
        );
        let mut state = Transitions {
            url,
            state: AcquireState::Idle,
        };
        let mut last_response = None;

        loop {
            let attempt = policy.begin_attempt();
            let wait = policy.wait();
            state.to(AcquireState::Navigating);
            debug!("{url}: attempt {attempt} waiting for {wait}");

            let error = match navigate_checked(ctx, url, wait, options.timeout_ms).await {
                Ok(nav) => return self.capture(ctx, url, nav, options, &mut state, attempt).await,
                Err(error) => error,
            };

            state.to(AcquireState::Failed);
            if let Some(response) = error.response() {
                last_response = Some(response.clone());
            }
            match policy.after_failure(&error) {
                NextStep::Fallback(relaxed) => {
                    warn!("{url}: {error}; retrying once with {relaxed}");
                }
                NextStep::Retry { delay } => {
                    warn!("{url}: attempt {attempt} failed: {error}; retrying in {delay:?}");
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                NextStep::GiveUp => {
                    return Err(AcquireError::Exhausted {
                        url: url.to_string(),
                        attempts: policy.attempts(),
                        response: last_response,
                        last_error: error,
                    });
                }
            }
        }
    }

    async fn capture(
        &self,
        ctx: &mut dyn RenderContext,
        url: &str,
        nav: NavigationResult,
        options: &AcquireOptions,
        state: &mut Transitions<'_>,
        attempts: u32,
    ) -> Result<Snapshot, AcquireError> {
        state.to(AcquireState::Settling);
        if options.extra_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(options.extra_delay_ms)).await;
        }

        state.to(AcquireState::Extracting);
        let html = ctx.get_html().await.map_err(|e| AcquireError::Browser {
            url: url.to_string(),
            message: format!("{e:#}"),
        })?;
        let extracted = extract_record(&html);

        state.to(AcquireState::Succeeded);
        info!(
            "rendered {url} (HTTP {}, {}ms, {attempts} attempt(s))",
            nav.status(),
            nav.load_time_ms
        );
        Ok(Snapshot {
            url: url.to_string(),
            http_status: nav.status(),
            final_url: nav.final_url,
            html,
            extracted,
            timestamp: Utc::now(),
            attempts,
        })
    }
}

/// Navigate and turn an error status into a failed attempt.
async fn navigate_checked(
    ctx: &mut dyn RenderContext,
    url: &str,
    wait: WaitStrategy,
    timeout_ms: u64,
) -> Result<NavigationResult, NavigationError> {
    let nav = ctx.navigate(url, wait, timeout_ms).await?;
    match &nav.response {
        Some(response) if response.is_error_status() => {
            Err(NavigationError::Status(response.clone()))
        }
        _ => Ok(nav),
    }
}
