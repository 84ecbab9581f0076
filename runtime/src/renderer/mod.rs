// Copyright 2026 Formpilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Renderer abstraction for the interactive fetch strategy.
//!
//! Defines the `Renderer` and `RenderContext` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide).

pub mod chromium;

use crate::error::{FetchError, FetchResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// HTTP status of the main document, when the browser exposes it.
    pub status: Option<u16>,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self) -> FetchResult<Box<dyn RenderContext>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> FetchResult<()>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
}

/// A single browser context (tab).
///
/// Carries mutable navigation state, so one context must never be shared
/// by concurrent operations.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> FetchResult<NavigationResult>;
    /// Execute JavaScript in the page context and return the result.
    async fn execute_js(&self, script: &str) -> FetchResult<serde_json::Value>;
    /// Get the full page HTML.
    async fn get_html(&self) -> FetchResult<String>;
    /// Get the current URL.
    async fn get_url(&self) -> FetchResult<String>;
    /// Click the first element matching a CSS selector.
    async fn click(&self, selector: &str) -> FetchResult<()>;
    /// Focus the element and type text into it as key events.
    async fn type_text(&self, selector: &str, text: &str) -> FetchResult<()>;
    /// Press a named key (e.g. "Enter") on the element.
    async fn press_key(&self, selector: &str, key: &str) -> FetchResult<()>;
    /// Close this context.
    async fn close(self: Box<Self>) -> FetchResult<()>;
}

/// A no-op renderer used when Chromium is unavailable.
///
/// The lightweight strategy works without a browser; every attempt to use
/// the interactive strategy fails with a context-creation error.
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn new_context(&self) -> FetchResult<Box<dyn RenderContext>> {
        Err(FetchError::ContextCreation(
            "browser not available (lightweight-only mode)".to_string(),
        ))
    }
    async fn shutdown(&self) -> FetchResult<()> {
        Ok(())
    }
    fn active_contexts(&self) -> usize {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_renderer_refuses_contexts() {
        let renderer = NoopRenderer;
        match renderer.new_context().await {
            Err(e) => assert!(e.is_context_creation()),
            Ok(_) => panic!("expected context creation failure"),
        }
        assert_eq!(renderer.active_contexts(), 0);
    }
}
