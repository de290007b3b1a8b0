// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

//! Chromium-based renderer using chromiumoxide.
//!
//! Request blocking uses the CDP `Fetch` domain: while a context has a
//! non-empty block list every request is paused, and either failed with
//! `BlockedByClient` or continued. The main document status comes from
//! `Network.responseReceived`.

use super::{
    BlockList, NavigationError, NavigationResult, RenderContext, Renderer, ResponseDiagnostics,
    WaitStrategy,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetScriptExecutionDisabledParams;
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, DisableParams as FetchDisableParams, EnableParams as FetchEnableParams,
    EventRequestPaused, FailRequestParams,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, ErrorReason, EventResponseReceived, ResourceType,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Quiet window that counts as "network idle".
const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);

/// Poll interval while waiting for network idle.
const NETWORK_IDLE_POLL: Duration = Duration::from_millis(100);

/// Grace period for the response watcher after the wait condition is met.
const RESPONSE_GRACE: Duration = Duration::from_millis(250);

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. RENDITION_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("RENDITION_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.rendition/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".rendition/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".rendition/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".rendition/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".rendition/chromium/chrome-linux64/chrome"),
                home.join(".rendition/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Chromium-based renderer.
pub struct ChromiumRenderer {
    browser: tokio::sync::Mutex<Browser>,
    handler: JoinHandle<()>,
    active_count: Arc<AtomicUsize>,
    global: BlockList,
}

impl ChromiumRenderer {
    /// Launch a headless Chromium instance. `global` is installed on every
    /// context the renderer creates.
    pub async fn new(global: BlockList) -> Result<Self> {
        let chrome_path =
            find_chromium().context("Chromium not found. Set RENDITION_CHROMIUM_PATH.")?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser handler error: {e}");
                }
            }
        });

        Ok(Self {
            browser: tokio::sync::Mutex::new(browser),
            handler,
            active_count: Arc::new(AtomicUsize::new(0)),
            global,
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .context("failed to create new page")?;

        page.execute(NetworkEnableParams::default())
            .await
            .context("failed to enable network events")?;

        self.active_count.fetch_add(1, Ordering::Relaxed);

        let mut context = ChromiumContext {
            page,
            active_count: Arc::clone(&self.active_count),
            rules: Arc::new(RwLock::new(BlockList::default())),
            interception: None,
        };
        context.set_blocklist(self.global.clone()).await?;

        Ok(Box::new(context))
    }

    fn global_blocklist(&self) -> BlockList {
        self.global.clone()
    }

    async fn shutdown(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        if let Err(e) = browser.close().await {
            warn!("failed to close Chromium cleanly: {e}");
        }
        let _ = browser.wait().await;
        self.handler.abort();
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.active_count.load(Ordering::Relaxed)
    }
}

/// A single Chromium page context.
pub struct ChromiumContext {
    page: Page,
    active_count: Arc<AtomicUsize>,
    rules: Arc<RwLock<BlockList>>,
    interception: Option<JoinHandle<()>>,
}

impl ChromiumContext {
    async fn start_interception(&mut self) -> Result<()> {
        if self.interception.is_some() {
            return Ok(());
        }

        let mut paused = self
            .page
            .event_listener::<EventRequestPaused>()
            .await
            .context("failed to subscribe to paused requests")?;
        self.page
            .execute(FetchEnableParams::default())
            .await
            .context("failed to enable request interception")?;

        let page = self.page.clone();
        let rules = Arc::clone(&self.rules);
        self.interception = Some(tokio::spawn(async move {
            while let Some(event) = paused.next().await {
                let blocked = rules
                    .read()
                    .map(|r| r.is_blocked(&event.request.url))
                    .unwrap_or(false);
                let outcome = if blocked {
                    debug!("blocked request {}", event.request.url);
                    page.execute(FailRequestParams::new(
                        event.request_id.clone(),
                        ErrorReason::BlockedByClient,
                    ))
                    .await
                    .map(|_| ())
                } else {
                    page.execute(ContinueRequestParams::new(event.request_id.clone()))
                        .await
                        .map(|_| ())
                };
                if let Err(e) = outcome {
                    debug!("failed to resolve paused request {}: {e}", event.request.url);
                }
            }
        }));
        Ok(())
    }

    async fn stop_interception(&mut self) -> Result<()> {
        if let Some(task) = self.interception.take() {
            self.page
                .execute(FetchDisableParams::default())
                .await
                .context("failed to disable request interception")?;
            task.abort();
        }
        Ok(())
    }

    async fn set_scripts_disabled(&self, disabled: bool) {
        if let Err(e) = self
            .page
            .execute(SetScriptExecutionDisabledParams::new(disabled))
            .await
        {
            warn!("failed to toggle script execution: {e}");
        }
    }

    /// Navigate and wait for the requested lifecycle condition.
    ///
    /// `DomContentLoaded` navigates with script execution disabled so the DOM
    /// is read as parsed, before any script mutates it.
    async fn drive(&self, url: &str, wait: WaitStrategy) -> Result<(), NavigationError> {
        let scripts_off = wait == WaitStrategy::DomContentLoaded;
        if scripts_off {
            self.set_scripts_disabled(true).await;
        }
        let nav = self.page.goto(url).await;
        if scripts_off {
            self.set_scripts_disabled(false).await;
        }
        nav.map_err(|e| NavigationError::Failed(e.to_string()))?;

        if wait == WaitStrategy::NetworkIdle {
            self.wait_for_network_idle().await?;
        }
        Ok(())
    }

    /// Wait until no new resource entries appear for `NETWORK_IDLE_WINDOW`.
    async fn wait_for_network_idle(&self) -> Result<(), NavigationError> {
        let mut last_count = -1i64;
        let mut quiet_since = Instant::now();
        loop {
            let count: i64 = self
                .page
                .evaluate("performance.getEntriesByType('resource').length")
                .await
                .map_err(|e| NavigationError::Failed(e.to_string()))?
                .into_value()
                .unwrap_or(0);
            if count != last_count {
                last_count = count;
                quiet_since = Instant::now();
            } else if quiet_since.elapsed() >= NETWORK_IDLE_WINDOW {
                return Ok(());
            }
            tokio::time::sleep(NETWORK_IDLE_POLL).await;
        }
    }
}

fn diagnostics_from(event: &EventResponseReceived) -> ResponseDiagnostics {
    let headers = event
        .response
        .headers
        .inner()
        .as_object()
        .map(|map| {
            map.iter()
                .map(|(k, v)| (k.clone(), v.as_str().unwrap_or_default().to_string()))
                .collect()
        })
        .unwrap_or_default();
    ResponseDiagnostics {
        status: u16::try_from(event.response.status).unwrap_or(0),
        status_text: event.response.status_text.clone(),
        headers,
    }
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn set_blocklist(&mut self, blocklist: BlockList) -> Result<()> {
        let empty = blocklist.is_empty();
        if let Ok(mut rules) = self.rules.write() {
            *rules = blocklist;
        }
        if empty {
            self.stop_interception().await
        } else {
            self.start_interception().await
        }
    }

    async fn navigate(
        &mut self,
        url: &str,
        wait: WaitStrategy,
        timeout_ms: u64,
    ) -> std::result::Result<NavigationResult, NavigationError> {
        let start = Instant::now();

        let mut responses = self
            .page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| NavigationError::Failed(format!("failed to watch responses: {e}")))?;
        let captured: Arc<Mutex<Option<ResponseDiagnostics>>> = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&captured);
        let mut watcher = tokio::spawn(async move {
            while let Some(event) = responses.next().await {
                if event.r#type == ResourceType::Document {
                    if let Ok(mut slot) = sink.lock() {
                        *slot = Some(diagnostics_from(&event));
                    }
                    break;
                }
            }
        });

        let result = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.drive(url, wait),
        )
        .await;

        let _ = tokio::time::timeout(RESPONSE_GRACE, &mut watcher).await;
        watcher.abort();
        let response = captured.lock().ok().and_then(|slot| slot.clone());
        let load_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(Ok(())) => {
                let final_url = self
                    .page
                    .url()
                    .await
                    .ok()
                    .flatten()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| url.to_string());
                Ok(NavigationResult {
                    final_url,
                    response,
                    load_time_ms,
                })
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                if wait == WaitStrategy::DomContentLoaded {
                    self.set_scripts_disabled(false).await;
                }
                Err(NavigationError::Timeout {
                    wait,
                    timeout_ms,
                    response,
                })
            }
        }
    }

    async fn get_html(&self) -> Result<String> {
        self.page.content().await.context("failed to get HTML")
    }

    async fn close(mut self: Box<Self>) -> Result<()> {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        if let Some(task) = self.interception.take() {
            task.abort();
        }
        let _ = self.page.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_navigate_and_read_html() {
        let renderer = ChromiumRenderer::new(BlockList::default())
            .await
            .expect("failed to create renderer");
        let mut ctx = renderer
            .new_context()
            .await
            .expect("failed to create context");

        let nav = ctx
            .navigate(
                "data:text/html,<title>Hi</title><h1>Hello</h1><p>World</p>",
                WaitStrategy::Load,
                10000,
            )
            .await
            .expect("navigation failed");
        assert!(nav.load_time_ms < 10000);

        let html = ctx.get_html().await.expect("get_html failed");
        assert!(html.contains("<title>Hi</title>"));
        assert!(html.contains("<h1>Hello</h1>"));

        ctx.close().await.expect("close failed");
        assert_eq!(renderer.active_contexts(), 0);

        renderer.shutdown().await.expect("shutdown failed");
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_dom_content_loaded_skips_scripts() {
        let renderer = ChromiumRenderer::new(BlockList::default())
            .await
            .expect("failed to create renderer");
        let mut ctx = renderer.new_context().await.expect("context");

        ctx.navigate(
            "data:text/html,<div id=a>static</div><script>document.getElementById('a').textContent='dynamic'</script>",
            WaitStrategy::DomContentLoaded,
            10000,
        )
        .await
        .expect("navigation failed");
        let html = ctx.get_html().await.expect("get_html failed");
        assert!(html.contains(">static<"));

        ctx.close().await.expect("close failed");
        renderer.shutdown().await.expect("shutdown failed");
    }
}
