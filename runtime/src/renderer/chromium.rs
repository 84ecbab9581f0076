// Copyright 2026 Formpilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Chromium-based renderer using chromiumoxide.

use super::{NavigationResult, RenderContext, Renderer};
use crate::config::{BrowserSettings, CHROMIUM_PATH_ENV};
use crate::error::{FetchError, FetchResult};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Status of the main document, from the Navigation Timing API.
const STATUS_SCRIPT: &str = r#"(() => {
    const nav = performance.getEntriesByType('navigation')[0];
    return nav && nav.responseStatus ? nav.responseStatus : null;
})()"#;

/// Find the Chromium binary path.
pub fn find_chromium(configured: Option<&Path>) -> Option<PathBuf> {
    // 1. FORMPILOT_CHROMIUM_PATH env
    if let Ok(p) = std::env::var(CHROMIUM_PATH_ENV) {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. Config file
    if let Some(path) = configured {
        if path.exists() {
            return Some(path.to_path_buf());
        }
    }

    // 3. ~/.formpilot/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".formpilot/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".formpilot/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".formpilot/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".formpilot/chromium/chrome-linux64/chrome"),
                home.join(".formpilot/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 4. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 5. Common macOS location
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
    browser: Browser,
    active_count: Arc<AtomicUsize>,
}

impl ChromiumRenderer {
    /// Launch a Chromium instance with the given settings.
    pub async fn new(settings: &BrowserSettings, user_agent: &str) -> FetchResult<Self> {
        let chrome_path = find_chromium(settings.chromium_path.as_deref()).ok_or_else(|| {
            FetchError::ContextCreation(format!(
                "Chromium not found. Set {CHROMIUM_PATH_ENV} or install Chrome."
            ))
        })?;

        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);
        builder = if settings.headless {
            builder.arg("--headless=new")
        } else {
            builder.with_head()
        };
        builder = builder
            .arg("--disable-gpu")
            .arg("--disable-extensions")
            .arg(format!("--user-agent={user_agent}"));
        for arg in &settings.extra_args {
            builder = builder.arg(arg.as_str());
        }
        let config = builder.build().map_err(|e| {
            FetchError::ContextCreation(format!("failed to build browser config: {e}"))
        })?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchError::ContextCreation(format!("failed to launch Chromium: {e}")))?;

        // Drive the CDP event loop
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        tracing::info!("Chromium launched");

        Ok(Self {
            browser,
            active_count: Arc::new(AtomicUsize::new(0)),
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> FetchResult<Box<dyn RenderContext>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| FetchError::ContextCreation(format!("failed to create page: {e}")))?;

        self.active_count.fetch_add(1, Ordering::Relaxed);

        Ok(Box::new(ChromiumContext {
            page,
            active_count: Arc::clone(&self.active_count),
        }))
    }

    async fn shutdown(&self) -> FetchResult<()> {
        // Browser is dropped when ChromiumRenderer is dropped
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
}

impl ChromiumContext {
    async fn element(&self, selector: &str) -> FetchResult<chromiumoxide::element::Element> {
        self.page
            .find_element(selector)
            .await
            .map_err(|e| FetchError::ElementNotFound(format!("{selector}: {e}")))
    }
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> FetchResult<NavigationResult> {
        let start = Instant::now();
        let limit = Duration::from_millis(timeout_ms);

        match tokio::time::timeout(limit, self.page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(FetchError::Navigation(e.to_string())),
            Err(_) => {
                return Err(FetchError::NavigationTimeout {
                    url: url.to_string(),
                    timeout_ms,
                })
            }
        }

        let remaining = limit.saturating_sub(start.elapsed());
        let _ = tokio::time::timeout(remaining, self.page.wait_for_navigation()).await;

        let load_time_ms = start.elapsed().as_millis() as u64;

        let final_url = self
            .page
            .url()
            .await
            .unwrap_or_default()
            .map(|u| u.to_string())
            .unwrap_or_else(|| url.to_string());

        let status = self
            .execute_js(STATUS_SCRIPT)
            .await
            .ok()
            .and_then(|v| v.as_u64())
            .and_then(|s| u16::try_from(s).ok());

        Ok(NavigationResult {
            final_url,
            status,
            load_time_ms,
        })
    }

    async fn execute_js(&self, script: &str) -> FetchResult<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| FetchError::Script(e.to_string()))?;

        // `undefined` has no value; treat it as null
        Ok(result.into_value().unwrap_or(serde_json::Value::Null))
    }

    async fn get_html(&self) -> FetchResult<String> {
        self.page
            .content()
            .await
            .map_err(|e| FetchError::Script(format!("failed to get HTML: {e}")))
    }

    async fn get_url(&self) -> FetchResult<String> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| FetchError::Script(format!("failed to get URL: {e}")))?
            .map(|u| u.to_string())
            .unwrap_or_default();
        Ok(url)
    }

    async fn click(&self, selector: &str) -> FetchResult<()> {
        self.element(selector)
            .await?
            .click()
            .await
            .map_err(|e| FetchError::Script(format!("click {selector}: {e}")))?;
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> FetchResult<()> {
        let el = self.element(selector).await?;
        el.focus()
            .await
            .map_err(|e| FetchError::Script(format!("focus {selector}: {e}")))?;
        el.type_str(text)
            .await
            .map_err(|e| FetchError::Script(format!("type into {selector}: {e}")))?;
        Ok(())
    }

    async fn press_key(&self, selector: &str, key: &str) -> FetchResult<()> {
        self.element(selector)
            .await?
            .press_key(key)
            .await
            .map_err(|e| FetchError::Script(format!("press {key} on {selector}: {e}")))?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> FetchResult<()> {
        self.active_count.fetch_sub(1, Ordering::Relaxed);
        let _ = self.page.close().await;
        Ok(())
    }
}
