// Copyright 2026 Formpilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Interactive strategy: a rendered page in a browser tab.
//!
//! After each navigation every form control is tagged with
//! `data-formpilot="<form>-<position>"` so later operations address it by
//! a plain attribute selector. Every operation runs under the element
//! timeout.

use super::{PageSession, PageSnapshot};
use crate::config::SubmitConfig;
use crate::error::{FetchError, FetchResult};
use crate::extract::CONTROL_SELECTOR;
use crate::renderer::RenderContext;
use crate::types::FetchStrategy;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

const TAG_ATTR: &str = "data-formpilot";

/// Page session over a browser context.
pub struct BrowserSession {
    context: Box<dyn RenderContext>,
    navigation_timeout_ms: u64,
    navigation_settle_ms: u64,
    element_timeout_ms: u64,
    requested_url: String,
    last_status: Option<u16>,
    last_load_ms: u64,
}

impl BrowserSession {
    pub fn new(context: Box<dyn RenderContext>, config: &SubmitConfig) -> Self {
        Self {
            context,
            navigation_timeout_ms: config.navigation_timeout_ms,
            navigation_settle_ms: config.navigation_settle_ms,
            element_timeout_ms: config.element_timeout_ms,
            requested_url: String::new(),
            last_status: None,
            last_load_ms: 0,
        }
    }

    fn selector(form: usize, position: usize) -> String {
        format!("[{TAG_ATTR}=\"{form}-{position}\"]")
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        fut: impl Future<Output = FetchResult<T>>,
    ) -> FetchResult<T> {
        match tokio::time::timeout(Duration::from_millis(self.element_timeout_ms), fut).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout {
                operation: operation.to_string(),
                timeout_ms: self.element_timeout_ms,
            }),
        }
    }

    async fn run_js(&self, operation: &str, script: &str) -> FetchResult<serde_json::Value> {
        self.bounded(operation, self.context.execute_js(script)).await
    }

    /// Run a script that returns `{ok: bool, error?: string}`.
    async fn run_checked(&self, operation: &str, script: &str) -> FetchResult<serde_json::Value> {
        let value = self.run_js(operation, script).await?;
        if value.get("ok").and_then(|v| v.as_bool()) == Some(true) {
            return Ok(value);
        }
        let reason = value
            .get("error")
            .and_then(|v| v.as_str())
            .unwrap_or("script reported failure");
        Err(FetchError::ElementNotFound(format!("{operation}: {reason}")))
    }

    async fn tag_controls(&self) -> FetchResult<()> {
        let script = format!(
            r#"(() => {{
                const forms = Array.from(document.forms);
                forms.forEach((form, f) => {{
                    form.querySelectorAll('{CONTROL_SELECTOR}').forEach((el, p) => {{
                        el.setAttribute('{TAG_ATTR}', f + '-' + p);
                    }});
                }});
                return forms.length;
            }})()"#
        );
        self.run_js("tag form controls", &script).await.map(|_| ())
    }

    fn element_script(form: usize, position: usize, body: &str) -> String {
        format!(
            r#"(() => {{
                const el = document.querySelector('{sel}');
                if (!el) return {{ ok: false, error: 'element not found' }};
                {body}
            }})()"#,
            sel = Self::selector(form, position).replace('\'', "\\'"),
        )
    }
}

/// Escape a string for a single-quoted JS literal.
fn js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            '<' => out.push_str("\\x3c"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

#[async_trait]
impl PageSession for BrowserSession {
    fn strategy(&self) -> FetchStrategy {
        FetchStrategy::Interactive
    }

    async fn open(&mut self, url: &str) -> FetchResult<PageSnapshot> {
        let nav = self.context.navigate(url, self.navigation_timeout_ms).await?;
        self.requested_url = url.to_string();
        self.last_status = nav.status;
        self.last_load_ms = nav.load_time_ms;
        self.settle(self.navigation_settle_ms).await;
        self.snapshot().await
    }

    async fn snapshot(&mut self) -> FetchResult<PageSnapshot> {
        self.tag_controls().await?;
        let html = self.bounded("read page HTML", self.context.get_html()).await?;
        let final_url = self.bounded("read page URL", self.context.get_url()).await?;
        Ok(PageSnapshot {
            requested_url: self.requested_url.clone(),
            final_url,
            status: self.last_status,
            html,
            load_time_ms: self.last_load_ms,
            strategy: FetchStrategy::Interactive,
        })
    }

    async fn settle(&self, ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    async fn clear(&mut self, form: usize, position: usize) -> FetchResult<()> {
        let script = Self::element_script(
            form,
            position,
            r#"el.focus();
               el.value = '';
               el.dispatchEvent(new Event('input', { bubbles: true }));
               return { ok: true };"#,
        );
        self.run_checked("clear field", &script).await.map(|_| ())
    }

    async fn type_text(&mut self, form: usize, position: usize, text: &str) -> FetchResult<()> {
        let selector = Self::selector(form, position);
        self.bounded("type text", self.context.type_text(&selector, text))
            .await
    }

    async fn is_checked(&mut self, form: usize, position: usize) -> FetchResult<bool> {
        let script = Self::element_script(form, position, "return { ok: true, checked: !!el.checked };");
        let value = self.run_checked("read checked state", &script).await?;
        Ok(value.get("checked").and_then(|v| v.as_bool()).unwrap_or(false))
    }

    async fn click(&mut self, form: usize, position: usize) -> FetchResult<()> {
        let selector = Self::selector(form, position);
        self.bounded("click", self.context.click(&selector)).await
    }

    async fn select_option(
        &mut self,
        form: usize,
        position: usize,
        value: &str,
    ) -> FetchResult<()> {
        let body = format!(
            r#"const wanted = {v};
               const opt = Array.from(el.options || []).find(o => o.value === wanted);
               if (!opt) return {{ ok: false, error: 'option not found' }};
               el.value = opt.value;
               opt.selected = true;
               el.dispatchEvent(new Event('input', {{ bubbles: true }}));
               el.dispatchEvent(new Event('change', {{ bubbles: true }}));
               return {{ ok: true }};"#,
            v = js_string(value),
        );
        let script = Self::element_script(form, position, &body);
        self.run_checked("select option", &script).await.map(|_| ())
    }

    async fn press_enter(&mut self, form: usize, position: usize) -> FetchResult<()> {
        let selector = Self::selector(form, position);
        self.bounded("press Enter", self.context.press_key(&selector, "Enter"))
            .await
    }

    async fn submit_native(&mut self, form: usize) -> FetchResult<()> {
        // the prototype call survives controls named "submit" shadowing form.submit
        let script = format!(
            r#"(() => {{
                const form = document.forms[{form}];
                if (!form) return {{ ok: false, error: 'form not found' }};
                HTMLFormElement.prototype.submit.call(form);
                return {{ ok: true }};
            }})()"#
        );
        self.run_checked("native submit", &script).await.map(|_| ())
    }

    async fn close(self: Box<Self>) {
        if let Err(e) = self.context.close().await {
            tracing::debug!("closing browser context failed: {e}");
        }
    }
}
