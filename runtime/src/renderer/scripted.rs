// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

//! In-memory renderer for unit tests: serves canned HTML per URL and replays
//! scripted navigation outcomes.

use super::{
    BlockList, NavigationError, NavigationResult, RenderContext, Renderer, ResponseDiagnostics,
    WaitStrategy,
};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// What a single scripted navigation does.
#[derive(Debug, Clone)]
pub(crate) enum Outcome {
    Ok,
    Timeout,
    /// Times out after the document answered with this status.
    TimeoutAfter(u16),
    Fail(&'static str),
    Status(u16),
}

fn scripted_response(status: u16) -> ResponseDiagnostics {
    ResponseDiagnostics {
        status,
        status_text: "Scripted".to_string(),
        headers: vec![("x-scripted".to_string(), "1".to_string())],
    }
}

/// A recorded `navigate` call.
#[derive(Debug, Clone)]
pub(crate) struct NavigationCall {
    pub url: String,
    pub wait: WaitStrategy,
    pub blocklist: BlockList,
}

#[derive(Default)]
struct ScriptState {
    pages: HashMap<String, String>,
    outcomes: HashMap<String, VecDeque<Outcome>>,
    navigations: Vec<NavigationCall>,
    active: usize,
}

#[derive(Default, Clone)]
pub(crate) struct ScriptedRenderer {
    state: Arc<Mutex<ScriptState>>,
    global: BlockList,
}

impl ScriptedRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_global_blocklist(mut self, blocklist: BlockList) -> Self {
        self.global = blocklist;
        self
    }

    pub fn page(self, url: &str, html: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .pages
            .insert(url.to_string(), html.to_string());
        self
    }

    pub fn outcomes(self, url: &str, outcomes: Vec<Outcome>) -> Self {
        self.state
            .lock()
            .unwrap()
            .outcomes
            .insert(url.to_string(), outcomes.into());
        self
    }

    pub fn navigations(&self) -> Vec<NavigationCall> {
        self.state.lock().unwrap().navigations.clone()
    }

    pub fn navigations_to(&self, url: &str) -> usize {
        self.navigations().iter().filter(|c| c.url == url).count()
    }
}

#[async_trait]
impl Renderer for ScriptedRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        self.state.lock().unwrap().active += 1;
        Ok(Box::new(ScriptedContext {
            state: Arc::clone(&self.state),
            blocklist: self.global.clone(),
            current: None,
        }))
    }

    fn global_blocklist(&self) -> BlockList {
        self.global.clone()
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.state.lock().unwrap().active
    }
}

struct ScriptedContext {
    state: Arc<Mutex<ScriptState>>,
    blocklist: BlockList,
    current: Option<String>,
}

#[async_trait]
impl RenderContext for ScriptedContext {
    async fn set_blocklist(&mut self, blocklist: BlockList) -> Result<()> {
        self.blocklist = blocklist;
        Ok(())
    }

    async fn navigate(
        &mut self,
        url: &str,
        wait: WaitStrategy,
        timeout_ms: u64,
    ) -> std::result::Result<NavigationResult, NavigationError> {
        let mut state = self.state.lock().unwrap();
        state.navigations.push(NavigationCall {
            url: url.to_string(),
            wait,
            blocklist: self.blocklist.clone(),
        });
        let outcome = state
            .outcomes
            .get_mut(url)
            .and_then(|q| q.pop_front())
            .unwrap_or(Outcome::Ok);

        match outcome {
            Outcome::Timeout => Err(NavigationError::Timeout {
                wait,
                timeout_ms,
                response: None,
            }),
            Outcome::TimeoutAfter(status) => Err(NavigationError::Timeout {
                wait,
                timeout_ms,
                response: Some(scripted_response(status)),
            }),
            Outcome::Fail(reason) => Err(NavigationError::Failed(reason.to_string())),
            Outcome::Status(status) => Ok(NavigationResult {
                final_url: url.to_string(),
                response: Some(scripted_response(status)),
                load_time_ms: 1,
            }),
            Outcome::Ok => {
                if !state.pages.contains_key(url) {
                    return Ok(NavigationResult {
                        final_url: url.to_string(),
                        response: Some(ResponseDiagnostics {
                            status: 404,
                            status_text: "Not Found".to_string(),
                            headers: Vec::new(),
                        }),
                        load_time_ms: 1,
                    });
                }
                self.current = Some(url.to_string());
                Ok(NavigationResult {
                    final_url: url.to_string(),
                    response: Some(ResponseDiagnostics {
                        status: 200,
                        status_text: "OK".to_string(),
                        headers: Vec::new(),
                    }),
                    load_time_ms: 1,
                })
            }
        }
    }

    async fn get_html(&self) -> Result<String> {
        let state = self.state.lock().unwrap();
        Ok(self
            .current
            .as_ref()
            .and_then(|url| state.pages.get(url).cloned())
            .unwrap_or_default())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.state.lock().unwrap().active -= 1;
        Ok(())
    }
}
