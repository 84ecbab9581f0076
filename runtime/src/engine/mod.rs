// Copyright 2026 Formpilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! The engine: public operations over one renderer and one attempt history.
//!
//! Every operation returns a plain result value. Lower-level failures are
//! folded into that value with a truncated diagnostic; retries happen only
//! inside [`Engine::submit`].

pub mod history;

use crate::config::EngineConfig;
use crate::error::{ExtractionError, FetchError};
use crate::extract::{count_forms, extract_form, page_title, page_type, parse_forms};
use crate::fetch::{fetch_page, open_session, PageSession, PageSnapshot};
use crate::probe::{probe, ProbeOutcome};
use crate::renderer::Renderer;
use crate::submit::{run_attempt, AttemptFailure};
use crate::suggest::{suggest_for_field, FieldSuggestion};
use crate::types::{
    AccessibilityReport, FetchStrategy, FieldData, FillStats, FormDescriptor, FormSummary,
    HistorySummary, PageAnalysis, PageType, SubmissionAttempt, SubmissionResult,
    ValidationReport,
};
use crate::util::{truncate, MAX_DIAGNOSTIC_CHARS};
use crate::validate::validate_data;
use chrono::Utc;
use history::AttemptHistory;
use std::sync::Arc;
use std::time::Instant;

/// Form automation engine.
///
/// Owns its renderer handle and attempt history; callers create and close it
/// explicitly. Independent operations may run concurrently since each opens
/// its own fetch context.
pub struct Engine {
    config: EngineConfig,
    renderer: Arc<dyn Renderer>,
    history: AttemptHistory,
}

impl Engine {
    pub fn new(config: EngineConfig, renderer: Arc<dyn Renderer>) -> Self {
        let history = AttemptHistory::new(config.submit.max_history);
        Self {
            config,
            renderer,
            history,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ── Probe ──

    /// Reachability and automation-readiness of a page.
    pub async fn probe(&self, url: &str) -> AccessibilityReport {
        self.probe_outcome(url).await.report
    }

    async fn probe_outcome(&self, url: &str) -> ProbeOutcome {
        let outcome = probe(url, self.renderer.as_ref(), &self.config).await;
        let r = &outcome.report;
        tracing::info!(
            url,
            strategy = %r.strategy,
            score = r.success_probability,
            forms = r.forms_found,
            barriers = r.barriers.len(),
            "probe complete"
        );
        outcome
    }

    /// Page type, form summaries and accessibility in one pass.
    pub async fn analyze(&self, url: &str) -> PageAnalysis {
        let outcome = self.probe_outcome(url).await;
        if !outcome.report.accessible {
            tracing::warn!(url, "page is not accessible, form summary may be incomplete");
        }
        let (title, page_type, forms) = match &outcome.snapshot {
            Some(snapshot) => {
                let forms = parse_forms(&snapshot.html, &snapshot.final_url);
                (
                    page_title(&snapshot.html),
                    page_type(&snapshot.html, &forms),
                    forms.iter().map(summarize).collect(),
                )
            }
            None => (None, PageType::NoForms, Vec::new()),
        };
        PageAnalysis {
            url: truncate(url, MAX_DIAGNOSTIC_CHARS),
            title,
            page_type,
            forms,
            accessibility: outcome.report,
        }
    }

    // ── Extraction ──

    /// Describe the form at `form_index`.
    pub async fn extract_form(
        &self,
        url: &str,
        form_index: usize,
    ) -> Result<FormDescriptor, ExtractionError> {
        let snapshot = self.load_for_extraction(url).await?;
        extract_form(&snapshot.html, &snapshot.final_url, form_index)
    }

    /// Content hints for every field of a form.
    pub async fn suggest(
        &self,
        url: &str,
        form_index: usize,
    ) -> Result<Vec<FieldSuggestion>, ExtractionError> {
        let form = self.extract_form(url, form_index).await?;
        Ok(form.fields.iter().map(suggest_for_field).collect())
    }

    /// Lightweight first; a failed or form-less lightweight load falls back
    /// to the interactive strategy.
    async fn load_for_extraction(&self, url: &str) -> Result<PageSnapshot, FetchError> {
        let renderer = self.renderer.as_ref();
        let light = fetch_page(FetchStrategy::Lightweight, url, renderer, &self.config).await;
        if let Ok(snapshot) = &light {
            if count_forms(&snapshot.html) > 0 {
                return light;
            }
        }

        tracing::debug!(url, "no forms over HTTP, trying interactive strategy");
        match fetch_page(FetchStrategy::Interactive, url, renderer, &self.config).await {
            Ok(rendered) if count_forms(&rendered.html) > 0 || light.is_err() => Ok(rendered),
            Ok(_) => light,
            Err(e) => {
                tracing::debug!(url, "interactive load failed: {e}");
                light
            }
        }
    }

    // ── Validation ──

    /// Check `data` against a form without submitting.
    pub async fn validate(&self, url: &str, form_index: usize, data: &FieldData) -> ValidationReport {
        match self.extract_form(url, form_index).await {
            Ok(form) => validate_data(&form, data),
            Err(e) => ValidationReport {
                valid: false,
                issues: vec![truncate(
                    &format!("Cannot validate: {e}"),
                    MAX_DIAGNOSTIC_CHARS,
                )],
                ..ValidationReport::default()
            },
        }
    }

    // ── Submission ──

    /// Fill and submit a form, retrying with backoff.
    ///
    /// A failure under the lightweight strategy switches to the interactive
    /// one for the next attempt. Every attempt is recorded in the history.
    pub async fn submit(
        &self,
        url: &str,
        form_index: usize,
        data: &FieldData,
        max_retries: u32,
    ) -> SubmissionResult {
        let start = Instant::now();
        let max_attempts = max_retries.max(1);
        let outcome = self.probe_outcome(url).await;
        let mut strategy = self.choose_strategy(&outcome.report);
        let mut preflight = Vec::new();
        let threshold = self.config.probe.accessible_threshold;
        if let Some(warning) = accessibility_warning(&outcome.report, threshold) {
            tracing::warn!(url, score = outcome.report.success_probability, "{warning}");
            preflight.push(warning);
        }
        preflight.extend(preflight_warnings(&outcome, form_index, data));

        let mut interactive_available = true;
        let mut last_result: Option<SubmissionResult> = None;
        let mut last_fill = FillStats::default();
        let mut last_error = String::new();
        let mut last_strategy = strategy;

        for attempt in 1..=max_attempts {
            tracing::info!(url, attempt, max_attempts, %strategy, "submission attempt");
            let attempt_start = Instant::now();

            let (used, outcome) = self
                .attempt(strategy, &mut interactive_available, url, form_index, data)
                .await;
            last_strategy = used;

            let (success, error) = match &outcome {
                Ok(r) if r.success => (true, None),
                Ok(r) => (false, Some(r.message.clone())),
                Err(f) => (false, Some(f.error.to_string())),
            };
            self.history
                .record(SubmissionAttempt {
                    timestamp: Utc::now(),
                    url: truncate(url, MAX_DIAGNOSTIC_CHARS),
                    attempt,
                    success,
                    error: error.as_deref().map(|e| truncate(e, MAX_DIAGNOSTIC_CHARS)),
                    strategy: used,
                    elapsed_ms: attempt_start.elapsed().as_millis() as u64,
                    field_count: data.len(),
                })
                .await;

            match outcome {
                Ok(mut result) if result.success => {
                    result.attempts = attempt;
                    result.elapsed_ms = start.elapsed().as_millis() as u64;
                    result.warnings = [preflight, std::mem::take(&mut result.warnings)].concat();
                    tracing::info!(url, attempt, score = result.score, "submission succeeded");
                    return result;
                }
                Ok(result) => {
                    tracing::warn!(url, attempt, score = result.score, "{}", result.message);
                    last_error = result.message.clone();
                    last_fill = result.fill.clone();
                    last_result = Some(result);
                }
                Err(AttemptFailure { error, fill, .. }) => {
                    tracing::warn!(url, attempt, code = error.code(), "attempt failed: {error}");
                    if error.is_terminal() {
                        let mut result = SubmissionResult::failed(
                            &truncate(url, MAX_DIAGNOSTIC_CHARS),
                            error.to_string(),
                        );
                        result.attempts = attempt;
                        result.strategy = Some(used);
                        result.fill = fill;
                        result.warnings = preflight;
                        result.elapsed_ms = start.elapsed().as_millis() as u64;
                        return result;
                    }
                    last_error = error.to_string();
                    last_fill = fill;
                }
            }

            if !interactive_available {
                strategy = FetchStrategy::Lightweight;
            } else if used == FetchStrategy::Lightweight {
                tracing::info!(url, "switching to interactive strategy");
                strategy = FetchStrategy::Interactive;
            }
            if attempt < max_attempts {
                let delay = self.config.submit.backoff_delay(attempt - 1);
                tracing::info!(url, delay_secs = delay.as_secs(), "backing off before retry");
                tokio::time::sleep(delay).await;
            }
        }

        let mut result = last_result
            .unwrap_or_else(|| SubmissionResult::failed(&truncate(url, MAX_DIAGNOSTIC_CHARS), ""));
        result.success = false;
        result.message = format!("Form submission failed after {max_attempts} attempts");
        result.error = Some(truncate(&last_error, MAX_DIAGNOSTIC_CHARS));
        result.attempts = max_attempts;
        result.strategy = Some(last_strategy);
        result.fill = last_fill;
        result.warnings = [preflight, std::mem::take(&mut result.warnings)].concat();
        result.elapsed_ms = start.elapsed().as_millis() as u64;
        tracing::warn!(url, "{}", result.message);
        result
    }

    fn choose_strategy(&self, report: &AccessibilityReport) -> FetchStrategy {
        if report.strategy == FetchStrategy::Lightweight
            && report.success_probability >= self.config.probe.lightweight_preference
        {
            FetchStrategy::Lightweight
        } else {
            FetchStrategy::Interactive
        }
    }

    /// Run one attempt with a fresh session. Returns the strategy actually
    /// used: without a browser the interactive strategy degrades to the
    /// lightweight one for the rest of the call.
    async fn attempt(
        &self,
        strategy: FetchStrategy,
        interactive_available: &mut bool,
        url: &str,
        form_index: usize,
        data: &FieldData,
    ) -> (FetchStrategy, Result<SubmissionResult, AttemptFailure>) {
        let renderer = self.renderer.as_ref();
        let opened = match open_session(strategy, renderer, &self.config).await {
            Err(e) if strategy == FetchStrategy::Interactive && e.is_context_creation() => {
                tracing::warn!(url, "interactive strategy unavailable ({e}), using lightweight");
                *interactive_available = false;
                open_session(FetchStrategy::Lightweight, renderer, &self.config).await
            }
            other => other,
        };
        let mut session: Box<dyn PageSession> = match opened {
            Ok(s) => s,
            Err(e) => {
                return (
                    strategy,
                    Err(AttemptFailure {
                        error: e.into(),
                        fill: FillStats::default(),
                        warnings: Vec::new(),
                    }),
                )
            }
        };
        let used = session.strategy();
        let outcome = run_attempt(session.as_mut(), url, form_index, data, &self.config).await;
        session.close().await;
        (used, outcome)
    }

    // ── Diagnostics ──

    pub async fn history(&self) -> HistorySummary {
        self.history.summary().await
    }

    pub async fn attempts(&self) -> Vec<SubmissionAttempt> {
        self.history.entries().await
    }

    /// Shut the renderer down.
    pub async fn close(&self) {
        if let Err(e) = self.renderer.shutdown().await {
            tracing::warn!("renderer shutdown failed: {e}");
        }
    }
}

fn summarize(form: &FormDescriptor) -> FormSummary {
    FormSummary {
        index: form.index,
        action: form.action.clone(),
        method: form.method,
        field_count: form.fields.len(),
        required_count: form.required_fields().count(),
        has_file_upload: form.has_file_upload(),
        submit_controls: form.submit_controls.len(),
    }
}

/// Validation issues from the probed page, surfaced as warnings only.
/// Warning for a page the probe did not judge accessible.
fn accessibility_warning(report: &AccessibilityReport, threshold: f32) -> Option<String> {
    if report.accessible {
        return None;
    }
    Some(format!(
        "Accessibility: page scored {:.2} (needs more than {threshold:.2}), submission may fail",
        report.success_probability
    ))
}

fn preflight_warnings(outcome: &ProbeOutcome, form_index: usize, data: &FieldData) -> Vec<String> {
    let Some(snapshot) = &outcome.snapshot else {
        return Vec::new();
    };
    let Ok(form) = extract_form(&snapshot.html, &snapshot.final_url, form_index) else {
        return Vec::new();
    };
    let report = validate_data(&form, data);
    if !report.valid {
        tracing::warn!(issues = report.issues.len(), "pre-flight validation found issues");
    }
    report
        .issues
        .into_iter()
        .map(|i| format!("Validation: {i}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::NoopRenderer;

    fn engine() -> Engine {
        Engine::new(EngineConfig::default(), Arc::new(NoopRenderer))
    }

    fn report(strategy: FetchStrategy, score: f32) -> AccessibilityReport {
        AccessibilityReport {
            url: "https://example.com/".into(),
            final_url: None,
            reachable: true,
            accessible: score > 0.6,
            status_code: Some(200),
            strategy,
            barriers: Vec::new(),
            success_probability: score,
            recommendations: Vec::new(),
            forms_found: 1,
            load_time_ms: 10,
            error: None,
        }
    }

    #[test]
    fn test_strategy_choice() {
        let e = engine();
        assert_eq!(
            e.choose_strategy(&report(FetchStrategy::Lightweight, 0.9)),
            FetchStrategy::Lightweight
        );
        assert_eq!(
            e.choose_strategy(&report(FetchStrategy::Lightweight, 0.5)),
            FetchStrategy::Interactive
        );
        assert_eq!(
            e.choose_strategy(&report(FetchStrategy::Interactive, 0.9)),
            FetchStrategy::Interactive
        );
    }

    #[test]
    fn test_accessibility_warning() {
        assert_eq!(accessibility_warning(&report(FetchStrategy::Lightweight, 0.9), 0.6), None);
        assert_eq!(
            accessibility_warning(&report(FetchStrategy::Interactive, 0.3), 0.6).as_deref(),
            Some("Accessibility: page scored 0.30 (needs more than 0.60), submission may fail")
        );
    }

    #[test]
    fn test_preflight_warnings() {
        let outcome = ProbeOutcome {
            report: report(FetchStrategy::Lightweight, 0.9),
            snapshot: Some(PageSnapshot {
                requested_url: "https://example.com/".into(),
                final_url: "https://example.com/".into(),
                status: Some(200),
                html: r#"<form><input name="email" type="email" required></form>"#.into(),
                load_time_ms: 1,
                strategy: FetchStrategy::Lightweight,
            }),
        };
        let data: FieldData = [("email".to_string(), "nope".to_string())].into_iter().collect();
        assert_eq!(
            preflight_warnings(&outcome, 0, &data),
            vec!["Validation: Email: Invalid email format".to_string()]
        );
        assert!(preflight_warnings(&outcome, 4, &data).is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_submit_records_every_attempt() {
        let mut config = EngineConfig::default();
        config.submit.backoff_step_secs = 0;
        config.submit.navigation_retry_delay_ms = 0;
        config.probe.lightweight_timeout_ms = 500;
        let e = Engine::new(config, Arc::new(NoopRenderer));

        let result = e
            .submit("http://127.0.0.1:9/form", 0, &FieldData::new(), 2)
            .await;
        assert!(!result.success);
        assert_eq!(result.attempts, 2);
        assert_eq!(result.message, "Form submission failed after 2 attempts");
        assert!(result.error.is_some());

        let ordinals: Vec<u32> = e.attempts().await.iter().map(|a| a.attempt).collect();
        assert_eq!(ordinals, vec![1, 2]);
    }
}
