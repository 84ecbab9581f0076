// Copyright 2026 Formpilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! One fill-and-submit attempt over a page session.
//!
//! Navigate (retried once), locate the form by index, fill, submit through
//! the tactic ladder, wait for the result page, and classify it against the
//! form page's URL. Failures come back as [`AttemptFailure`] carrying
//! whatever fill progress was made.

pub mod fill;
pub mod tactics;

use crate::classify::classify;
use crate::config::EngineConfig;
use crate::error::SubmissionError;
use crate::extract::extract_form;
use crate::fetch::{PageSession, PageSnapshot};
use crate::types::{FieldData, FillStats, SubmissionResult};
use std::time::Duration;

/// A failed attempt with partial fill statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptFailure {
    pub error: SubmissionError,
    pub fill: FillStats,
    pub warnings: Vec<String>,
}

impl AttemptFailure {
    fn before_fill(error: SubmissionError) -> Self {
        Self {
            error,
            fill: FillStats::default(),
            warnings: Vec::new(),
        }
    }
}

/// Run one attempt. The returned result is classified but carries no
/// attempt count; the orchestrator sets that.
pub async fn run_attempt(
    session: &mut dyn PageSession,
    url: &str,
    form_index: usize,
    data: &FieldData,
    config: &EngineConfig,
) -> Result<SubmissionResult, AttemptFailure> {
    let cfg = &config.submit;

    let page = navigate(session, url, cfg.navigation_retry_delay_ms)
        .await
        .map_err(AttemptFailure::before_fill)?;

    let form = extract_form(&page.html, &page.final_url, form_index)
        .map_err(|e| AttemptFailure::before_fill(SubmissionError::FormNotFound(e)))?;

    let (fill, warnings) = fill::fill_form(session, &form, data, cfg).await;

    if let Err(error) = tactics::submit_form(session, &form, cfg.submit_settle_ms).await {
        return Err(AttemptFailure {
            error,
            fill,
            warnings,
        });
    }

    session.settle(cfg.result_settle_ms).await;
    let after = match session.snapshot().await {
        Ok(s) => s,
        Err(e) => {
            return Err(AttemptFailure {
                error: SubmissionError::Fetch(e),
                fill,
                warnings,
            })
        }
    };

    let mut result = classify(
        &after.html,
        after.status,
        &after.final_url,
        &page.final_url,
        &config.classify,
    );
    result.strategy = Some(session.strategy());
    result.fill = fill;
    result.warnings = warnings;
    Ok(result)
}

async fn navigate(
    session: &mut dyn PageSession,
    url: &str,
    retry_delay_ms: u64,
) -> Result<PageSnapshot, SubmissionError> {
    match session.open(url).await {
        Ok(page) => Ok(page),
        Err(first) => {
            tracing::warn!(url, "navigation failed ({first}), retrying once");
            tokio::time::sleep(Duration::from_millis(retry_delay_ms)).await;
            session.open(url).await.map_err(SubmissionError::Navigation)
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingSession;
    use super::*;
    use crate::error::ExtractionError;
    use crate::types::FetchStrategy;

    const FORM_URL: &str = "https://example.com/contact";

    fn page(url: &str, html: &str) -> PageSnapshot {
        PageSnapshot {
            requested_url: url.into(),
            final_url: url.into(),
            status: Some(200),
            html: html.into(),
            load_time_ms: 5,
            strategy: FetchStrategy::Lightweight,
        }
    }

    fn contact_session() -> RecordingSession {
        RecordingSession {
            page: Some(page(
                FORM_URL,
                r#"<form action="/send" method="post">
                    <input name="email"><textarea name="message"></textarea>
                    <button type="submit">Send</button>
                </form>"#,
            )),
            result_page: Some(page(
                "https://example.com/thanks",
                "<h1>Thank you, your message was sent.</h1>",
            )),
            ..RecordingSession::default()
        }
    }

    fn data() -> FieldData {
        [("email", "ada@example.com"), ("message", "Hello")]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn quick_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.submit.navigation_retry_delay_ms = 0;
        config
    }

    #[tokio::test]
    async fn test_successful_attempt() {
        let mut session = contact_session();
        let result = run_attempt(&mut session, FORM_URL, 0, &data(), &quick_config())
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.url_changed);
        assert_eq!(result.fill.filled, 2);
        assert_eq!(result.strategy, Some(FetchStrategy::Lightweight));
        assert_eq!(session.ops.last().map(String::as_str), Some("click 2"));
    }

    #[tokio::test]
    async fn test_navigation_retried_once() {
        let mut session = RecordingSession {
            open_failures: 1,
            ..contact_session()
        };
        assert!(run_attempt(&mut session, FORM_URL, 0, &data(), &quick_config())
            .await
            .is_ok());

        let mut session = RecordingSession {
            open_failures: 2,
            ..contact_session()
        };
        let failure = run_attempt(&mut session, FORM_URL, 0, &data(), &quick_config())
            .await
            .unwrap_err();
        assert!(matches!(failure.error, SubmissionError::Navigation(_)));
        assert_eq!(session.ops.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_form_index_is_terminal() {
        let mut session = contact_session();
        let failure = run_attempt(&mut session, FORM_URL, 3, &data(), &quick_config())
            .await
            .unwrap_err();
        assert_eq!(
            failure.error,
            SubmissionError::FormNotFound(ExtractionError::FormIndexOutOfRange { index: 3, count: 1 })
        );
        assert!(failure.error.is_terminal());
        assert_eq!(failure.fill, FillStats::default());
    }

    #[tokio::test]
    async fn test_failure_keeps_fill_progress() {
        let mut session = RecordingSession {
            fail_clicks: true,
            fail_submits: true,
            ..contact_session()
        };
        let failure = run_attempt(&mut session, FORM_URL, 0, &data(), &quick_config())
            .await
            .unwrap_err();
        assert_eq!(failure.error, SubmissionError::NoSubmitTactic);
        assert_eq!(failure.fill.filled, 2);
    }
}
