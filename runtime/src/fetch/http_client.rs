// Copyright 2026 Formpilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Lightweight strategy: plain HTTP via reqwest.
//!
//! Not a browser. [`HttpFetcher`] handles redirects, timeouts, retry on
//! 5xx and backoff on 429. [`HttpSession`] keeps an in-memory model of the
//! page's forms so fills and submits can be replayed as a GET or a
//! urlencoded or multipart POST, including hidden anti-forgery fields.

use super::{PageSession, PageSnapshot};
use crate::error::{FetchError, FetchResult};
use crate::extract::parse_forms;
use crate::types::{FetchStrategy, FormDescriptor, FormMethod, InputType};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Response from an HTTP request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Original requested URL.
    pub url: String,
    /// Final URL after redirects.
    pub final_url: String,
    /// HTTP status code.
    pub status: u16,
    /// Response headers (selected subset).
    pub headers: Vec<(String, String)>,
    /// Response body as text.
    pub body: String,
}

/// HTTP client for the lightweight strategy.
///
/// Keeps a cookie store, so one fetcher is one browsing session.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    /// HTTP/1.1-only fallback client for sites that reject HTTP/2.
    h1_client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout_ms: u64, user_agent: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(user_agent)
            .cookie_store(true)
            .build()
            .unwrap_or_default();

        let h1_client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(user_agent)
            .cookie_store(true)
            .http1_only()
            .build()
            .unwrap_or_default();

        Self { client, h1_client }
    }

    /// GET with retry on 5xx and backoff on 429.
    ///
    /// Falls back to HTTP/1.1 on protocol errors (some CDNs reject HTTP/2).
    pub async fn get(&self, url: &str, timeout_ms: u64) -> FetchResult<HttpResponse> {
        match self.get_inner(&self.client, url, timeout_ms).await {
            Ok(resp) => Ok(resp),
            Err(FetchError::Network(msg))
                if msg.contains("http2")
                    || msg.contains("protocol")
                    || msg.contains("connection closed") =>
            {
                tracing::debug!(url, "retrying over HTTP/1.1");
                self.get_inner(&self.h1_client, url, timeout_ms).await
            }
            Err(e) => Err(e),
        }
    }

    async fn get_inner(
        &self,
        client: &reqwest::Client,
        url: &str,
        timeout_ms: u64,
    ) -> FetchResult<HttpResponse> {
        let mut retries = 0u32;
        let max_retries = 2;

        loop {
            let resp = client
                .get(url)
                .timeout(Duration::from_millis(timeout_ms))
                .send()
                .await;

            match resp {
                Ok(r) => {
                    let status = r.status().as_u16();

                    // Retry on 5xx
                    if status >= 500 && retries < max_retries {
                        retries += 1;
                        let delay = Duration::from_millis(500 * 2u64.pow(retries - 1));
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    // Backoff on 429
                    if status == 429 && retries < max_retries {
                        retries += 1;
                        let retry_after = r
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|s| s.parse::<u64>().ok())
                            .unwrap_or(2);
                        tokio::time::sleep(Duration::from_secs(retry_after.min(10))).await;
                        continue;
                    }

                    return read_response(url, r, timeout_ms).await;
                }
                Err(e) => {
                    if !e.is_timeout() && retries < max_retries {
                        retries += 1;
                        let delay = Duration::from_millis(500 * 2u64.pow(retries - 1));
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(map_error(e, url, timeout_ms));
                }
            }
        }
    }

    /// GET with the query string replaced by `pairs`.
    pub async fn get_with_query(
        &self,
        url: &str,
        pairs: &[(String, String)],
        timeout_ms: u64,
    ) -> FetchResult<HttpResponse> {
        let mut target = url::Url::parse(url)
            .map_err(|e| FetchError::Navigation(format!("invalid URL {url}: {e}")))?;
        target.set_fragment(None);
        target
            .query_pairs_mut()
            .clear()
            .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        self.get(target.as_str(), timeout_ms).await
    }

    /// POST form data (url-encoded).
    pub async fn post_form(
        &self,
        url: &str,
        form_fields: &[(String, String)],
        timeout_ms: u64,
    ) -> FetchResult<HttpResponse> {
        let r = self
            .client
            .post(url)
            .timeout(Duration::from_millis(timeout_ms))
            .form(form_fields)
            .send()
            .await
            .map_err(|e| map_error(e, url, timeout_ms))?;
        read_response(url, r, timeout_ms).await
    }

    /// POST form data as `multipart/form-data`, one text part per pair.
    pub async fn post_multipart(
        &self,
        url: &str,
        form_fields: &[(String, String)],
        timeout_ms: u64,
    ) -> FetchResult<HttpResponse> {
        let form = form_fields
            .iter()
            .fold(reqwest::multipart::Form::new(), |form, (name, value)| {
                form.text(name.clone(), value.clone())
            });
        let r = self
            .client
            .post(url)
            .timeout(Duration::from_millis(timeout_ms))
            .multipart(form)
            .send()
            .await
            .map_err(|e| map_error(e, url, timeout_ms))?;
        read_response(url, r, timeout_ms).await
    }
}

async fn read_response(
    url: &str,
    r: reqwest::Response,
    timeout_ms: u64,
) -> FetchResult<HttpResponse> {
    let status = r.status().as_u16();
    let final_url = r.url().to_string();
    let headers: Vec<(String, String)> = r
        .headers()
        .iter()
        .filter(|(k, _)| {
            matches!(
                k.as_str(),
                "content-type" | "location" | "retry-after" | "server" | "cf-ray"
            )
        })
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
        .collect();
    let body = r.text().await.map_err(|e| map_error(e, url, timeout_ms))?;

    Ok(HttpResponse {
        url: url.to_string(),
        final_url,
        status,
        headers,
        body,
    })
}

fn map_error(e: reqwest::Error, url: &str, timeout_ms: u64) -> FetchError {
    if e.is_timeout() {
        FetchError::NavigationTimeout {
            url: url.to_string(),
            timeout_ms,
        }
    } else if e.is_builder() {
        FetchError::Navigation(format!("invalid request for {url}: {e}"))
    } else {
        FetchError::Network(format!("{e:#}"))
    }
}

// ── Session ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
struct ControlState {
    value: String,
    checked: bool,
}

/// Page session over plain HTTP.
///
/// Forms are parsed on every page load. Fills mutate a per-control value
/// table; any submit tactic serializes the form like a browser would and
/// sends it to the resolved action URL.
pub struct HttpSession {
    fetcher: HttpFetcher,
    timeout_ms: u64,
    page: Option<PageSnapshot>,
    forms: Vec<FormDescriptor>,
    state: HashMap<(usize, usize), ControlState>,
}

impl HttpSession {
    pub fn new(fetcher: HttpFetcher, timeout_ms: u64) -> Self {
        Self {
            fetcher,
            timeout_ms,
            page: None,
            forms: Vec::new(),
            state: HashMap::new(),
        }
    }

    fn load(&mut self, snapshot: PageSnapshot) -> PageSnapshot {
        self.forms = parse_forms(&snapshot.html, &snapshot.final_url);
        self.state.clear();
        for form in &self.forms {
            for field in &form.fields {
                let value = match field.input_type {
                    InputType::Select => field
                        .options
                        .iter()
                        .find(|o| o.selected)
                        .or_else(|| field.options.first())
                        .map(|o| o.value.clone())
                        .unwrap_or_default(),
                    _ => field.value.clone().unwrap_or_default(),
                };
                self.state.insert(
                    (form.index, field.position),
                    ControlState {
                        value,
                        checked: field.checked,
                    },
                );
            }
        }
        self.page = Some(snapshot.clone());
        snapshot
    }

    fn form(&self, form: usize) -> FetchResult<&FormDescriptor> {
        self.forms
            .get(form)
            .ok_or_else(|| FetchError::ElementNotFound(format!("form {form}")))
    }

    fn state_mut(&mut self, form: usize, position: usize) -> FetchResult<&mut ControlState> {
        self.state
            .get_mut(&(form, position))
            .ok_or_else(|| FetchError::ElementNotFound(format!("control {form}-{position}")))
    }

    /// Name/value pairs the form would send, with an optional submitter.
    fn form_data(&self, form: &FormDescriptor, submitter: Option<usize>) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = form
            .hidden_fields
            .iter()
            .map(|h| (h.name.clone(), h.value.clone()))
            .collect();

        for field in &form.fields {
            let Some(name) = field.name.as_ref() else {
                continue;
            };
            if field.disabled || field.input_type == InputType::File {
                continue;
            }
            let Some(st) = self.state.get(&(form.index, field.position)) else {
                continue;
            };
            match field.input_type {
                InputType::Checkbox | InputType::Radio => {
                    if st.checked {
                        let value = field.value.clone().unwrap_or_else(|| "on".to_string());
                        pairs.push((name.clone(), value));
                    }
                }
                _ => pairs.push((name.clone(), st.value.clone())),
            }
        }

        if let Some(control) = submitter
            .and_then(|pos| form.submit_controls.iter().find(|c| c.position == pos))
        {
            if let Some(name) = &control.name {
                if control.input_type == InputType::Image {
                    pairs.push((format!("{name}.x"), "0".to_string()));
                    pairs.push((format!("{name}.y"), "0".to_string()));
                } else {
                    pairs.push((name.clone(), control.value.clone().unwrap_or_default()));
                }
            }
        }
        pairs
    }

    async fn submit(&mut self, form: usize, submitter: Option<usize>) -> FetchResult<()> {
        let descriptor = self.form(form)?;
        let pairs = self.form_data(descriptor, submitter);
        let action = descriptor.action.clone();
        let method = descriptor.method;
        let multipart = descriptor.is_multipart();
        tracing::debug!(%action, ?method, multipart, fields = pairs.len(), "submitting over HTTP");

        let start = Instant::now();
        let resp = match method {
            FormMethod::Get => {
                self.fetcher
                    .get_with_query(&action, &pairs, self.timeout_ms)
                    .await?
            }
            FormMethod::Post if multipart => {
                self.fetcher
                    .post_multipart(&action, &pairs, self.timeout_ms)
                    .await?
            }
            FormMethod::Post => self.fetcher.post_form(&action, &pairs, self.timeout_ms).await?,
        };
        self.load(PageSnapshot {
            requested_url: action,
            final_url: resp.final_url,
            status: Some(resp.status),
            html: resp.body,
            load_time_ms: start.elapsed().as_millis() as u64,
            strategy: FetchStrategy::Lightweight,
        });
        Ok(())
    }

    fn unsupported(operation: &str) -> FetchError {
        FetchError::Unsupported {
            strategy: FetchStrategy::Lightweight.to_string(),
            operation: operation.to_string(),
        }
    }
}

#[async_trait]
impl PageSession for HttpSession {
    fn strategy(&self) -> FetchStrategy {
        FetchStrategy::Lightweight
    }

    async fn open(&mut self, url: &str) -> FetchResult<PageSnapshot> {
        let start = Instant::now();
        let resp = self.fetcher.get(url, self.timeout_ms).await?;
        Ok(self.load(PageSnapshot {
            requested_url: url.to_string(),
            final_url: resp.final_url,
            status: Some(resp.status),
            html: resp.body,
            load_time_ms: start.elapsed().as_millis() as u64,
            strategy: FetchStrategy::Lightweight,
        }))
    }

    async fn snapshot(&mut self) -> FetchResult<PageSnapshot> {
        self.page
            .clone()
            .ok_or_else(|| FetchError::Navigation("no page loaded".to_string()))
    }

    async fn settle(&self, _ms: u64) {}

    async fn clear(&mut self, form: usize, position: usize) -> FetchResult<()> {
        self.state_mut(form, position)?.value.clear();
        Ok(())
    }

    async fn type_text(&mut self, form: usize, position: usize, text: &str) -> FetchResult<()> {
        self.state_mut(form, position)?.value.push_str(text);
        Ok(())
    }

    async fn is_checked(&mut self, form: usize, position: usize) -> FetchResult<bool> {
        Ok(self.state_mut(form, position)?.checked)
    }

    async fn click(&mut self, form: usize, position: usize) -> FetchResult<()> {
        let descriptor = self.form(form)?;

        if let Some(control) = descriptor
            .submit_controls
            .iter()
            .find(|c| c.position == position)
        {
            if control.input_type == InputType::Button {
                // needs page scripts
                return Err(Self::unsupported("click on a script button"));
            }
            return self.submit(form, Some(position)).await;
        }

        let field = descriptor
            .fields
            .iter()
            .find(|f| f.position == position)
            .ok_or_else(|| FetchError::ElementNotFound(format!("control {form}-{position}")))?;

        match field.input_type {
            InputType::Checkbox => {
                let st = self.state_mut(form, position)?;
                st.checked = !st.checked;
            }
            InputType::Radio => {
                let group = field.name.clone();
                let siblings: Vec<usize> = descriptor
                    .fields
                    .iter()
                    .filter(|f| f.input_type == InputType::Radio && f.name == group)
                    .map(|f| f.position)
                    .collect();
                for pos in siblings {
                    self.state_mut(form, pos)?.checked = pos == position;
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn select_option(
        &mut self,
        form: usize,
        position: usize,
        value: &str,
    ) -> FetchResult<()> {
        self.state_mut(form, position)?.value = value.to_string();
        Ok(())
    }

    async fn press_enter(&mut self, form: usize, _position: usize) -> FetchResult<()> {
        // implicit submission uses the default button when there is one
        let default_button = self
            .form(form)?
            .submit_controls
            .iter()
            .find(|c| c.input_type.is_submit_like())
            .map(|c| c.position);
        self.submit(form, default_button).await
    }

    async fn submit_native(&mut self, form: usize) -> FetchResult<()> {
        self.submit(form, None).await
    }

    async fn close(self: Box<Self>) {}
}
