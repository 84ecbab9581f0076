// Copyright 2026 Formpilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Content fetching behind one capability interface.
//!
//! Two strategies implement [`PageSession`]: [`HttpSession`] (lightweight,
//! plain HTTP with an in-memory form model) and [`BrowserSession`]
//! (interactive, a Chromium tab). Strategies are never mixed within one
//! attempt. Controls are addressed by `(form index, position)`, where
//! `position` is the control's place in the form's
//! [`CONTROL_SELECTOR`](crate::extract::CONTROL_SELECTOR) enumeration.

pub mod browser;
pub mod http_client;

pub use browser::BrowserSession;
pub use http_client::{HttpFetcher, HttpSession};

use crate::config::EngineConfig;
use crate::error::FetchResult;
use crate::renderer::Renderer;
use crate::types::FetchStrategy;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Content of a page at one moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub requested_url: String,
    pub final_url: String,
    /// Main-document status; unknown for some interactive loads.
    pub status: Option<u16>,
    pub html: String,
    pub load_time_ms: u64,
    pub strategy: FetchStrategy,
}

/// A stateful page under automation.
///
/// Carries the current URL and DOM, so a session must be driven by a single
/// pipeline at a time.
#[async_trait]
pub trait PageSession: Send {
    fn strategy(&self) -> FetchStrategy;

    /// Load `url`, replacing the current page.
    async fn open(&mut self, url: &str) -> FetchResult<PageSnapshot>;

    /// The current page, re-read from the session.
    async fn snapshot(&mut self) -> FetchResult<PageSnapshot>;

    /// Wait for dynamic content; a no-op where nothing runs in the page.
    async fn settle(&self, ms: u64);

    async fn clear(&mut self, form: usize, position: usize) -> FetchResult<()>;

    /// Append text to a text-like control.
    async fn type_text(&mut self, form: usize, position: usize, text: &str) -> FetchResult<()>;

    async fn is_checked(&mut self, form: usize, position: usize) -> FetchResult<bool>;

    /// Activate a control: toggles checkboxes, selects radios, and submits
    /// through submit buttons.
    async fn click(&mut self, form: usize, position: usize) -> FetchResult<()>;

    /// Select the option carrying `value`.
    async fn select_option(&mut self, form: usize, position: usize, value: &str)
        -> FetchResult<()>;

    /// Press Enter in a control (implicit submission).
    async fn press_enter(&mut self, form: usize, position: usize) -> FetchResult<()>;

    /// Invoke the form's own submit capability, bypassing handlers.
    async fn submit_native(&mut self, form: usize) -> FetchResult<()>;

    async fn close(self: Box<Self>);
}

/// Fetch a page once with the given strategy and return its content.
pub async fn fetch_page(
    strategy: FetchStrategy,
    url: &str,
    renderer: &dyn Renderer,
    config: &EngineConfig,
) -> FetchResult<PageSnapshot> {
    let mut session = open_session(strategy, renderer, config).await?;
    let result = session.open(url).await;
    session.close().await;
    result
}

/// Create a fresh session for one operation.
pub async fn open_session(
    strategy: FetchStrategy,
    renderer: &dyn Renderer,
    config: &EngineConfig,
) -> FetchResult<Box<dyn PageSession>> {
    match strategy {
        FetchStrategy::Lightweight => {
            let fetcher = HttpFetcher::new(config.probe.lightweight_timeout_ms, &config.user_agent);
            Ok(Box::new(HttpSession::new(
                fetcher,
                config.probe.lightweight_timeout_ms,
            )))
        }
        FetchStrategy::Interactive => {
            let context = renderer.new_context().await?;
            Ok(Box::new(BrowserSession::new(context, &config.submit)))
        }
    }
}
