// Copyright 2026 Formpilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Post-submission outcome classification.
//!
//! Evidence is gathered from the page reached after submission and scored:
//! +50 for content evidence of success, +30 for a changed URL, +20 when no
//! error evidence exists. Success requires the threshold and zero error
//! indicators.

use crate::config::ClassifyConfig;
use crate::types::{FillStats, SubmissionResult};
use crate::util::{collapse_whitespace, same_url, truncate, visible_text, MAX_DIAGNOSTIC_CHARS};
use regex::Regex;
use std::sync::OnceLock;

const CONTENT_POINTS: u32 = 50;
const URL_CHANGE_POINTS: u32 = 30;
const NO_ERROR_POINTS: u32 = 20;
const MAX_SCORE: u32 = 100;

const CONFIRMATION_LINE_MIN: usize = 10;
const CONFIRMATION_LINE_MAX: usize = 200;
const GENERIC_CONFIRMATION: &str = "Form submission appears to have been successful";

fn confirmation_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)\b(?:confirmation|reference|ticket)\s*(?:number|no\.?|id|code|#)?\s*[:#]?\s*([a-z0-9-]*[0-9][a-z0-9-]*)\b",
        )
        .expect("valid regex")
    })
}

fn success_markup_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\b(?:class|id)\s*=\s*["'][^"']*(?:success|thank|confirm)[^"']*["']"#)
            .expect("valid regex")
    })
}

fn error_markup_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\b(?:class|id)\s*=\s*["'][^"']*(?:error|danger|invalid)[^"']*["']"#)
            .expect("valid regex")
    })
}

fn indicator(prefix: &str, phrase: &str) -> String {
    format!("{prefix}_{}", phrase.trim().replace(' ', "_"))
}

/// Classify the page reached after a submission.
///
/// Only evidence fields are filled; attempt bookkeeping (`attempts`,
/// `strategy`, `fill`, timings) is left for the caller.
pub fn classify(
    html: &str,
    status: Option<u16>,
    final_url: &str,
    original_url: &str,
    cfg: &ClassifyConfig,
) -> SubmissionResult {
    let text = visible_text(html);
    let lower = text.to_lowercase();
    let url_changed = !final_url.is_empty() && !same_url(final_url, original_url);

    // ── Success evidence ──
    let mut success = Vec::new();
    let mut content_evidence = false;
    let mut bonus = 0;
    if url_changed {
        let lowered_url = final_url.to_lowercase();
        if cfg
            .confirmation_url_tokens
            .iter()
            .any(|t| lowered_url.contains(&t.to_lowercase()))
        {
            success.push("success_url_redirect".to_string());
            content_evidence = true;
            bonus = cfg.confirmation_url_bonus;
        } else {
            success.push("url_changed".to_string());
        }
    }
    for phrase in &cfg.success_phrases {
        if lower.contains(&phrase.to_lowercase()) {
            success.push(indicator("text", phrase));
            content_evidence = true;
        }
    }
    if confirmation_number_re().is_match(&text) {
        success.push("confirmation_number".to_string());
        content_evidence = true;
    }
    if success_markup_re().is_match(html) {
        success.push("success_element".to_string());
        content_evidence = true;
    }

    // ── Error evidence ──
    let mut errors = Vec::new();
    for phrase in &cfg.error_phrases {
        if lower.contains(&phrase.to_lowercase()) {
            errors.push(indicator("error", phrase));
        }
    }
    if error_markup_re().is_match(html) {
        errors.push("error_element".to_string());
    }
    if let Some(code) = status.filter(|s| *s >= 400) {
        errors.push(format!("http_error_{code}"));
    }

    // ── Score ──
    let mut score = 0;
    if content_evidence {
        score += CONTENT_POINTS + bonus;
    }
    if url_changed {
        score += URL_CHANGE_POINTS;
    }
    if errors.is_empty() {
        score += NO_ERROR_POINTS;
    }
    let score = score.min(MAX_SCORE);
    let succeeded = score >= cfg.success_threshold && errors.is_empty();

    let extracted = confirmation_line(&text, &cfg.confirmation_keywords);
    let message = if succeeded {
        match &extracted {
            Some(line) => line.clone(),
            None if url_changed => {
                "Form submitted successfully (redirected to confirmation page)".to_string()
            }
            None => "Form appears to have been submitted successfully".to_string(),
        }
    } else if !errors.is_empty() {
        format!(
            "Submission may have failed: {}",
            errors.iter().take(2).cloned().collect::<Vec<_>>().join("; ")
        )
    } else {
        "Form submission result unclear - please verify manually".to_string()
    };
    let confirmation = extracted.or_else(|| {
        (!success.is_empty()).then(|| GENERIC_CONFIRMATION.to_string())
    });

    tracing::debug!(
        score,
        succeeded,
        success = ?success,
        errors = ?errors,
        "classified submission result"
    );

    SubmissionResult {
        success: succeeded,
        score,
        confidence: score as f32 / MAX_SCORE as f32,
        original_url: truncate(original_url, MAX_DIAGNOSTIC_CHARS),
        final_url: truncate(final_url, MAX_DIAGNOSTIC_CHARS),
        url_changed,
        success_indicators: success,
        error_indicators: errors,
        confirmation,
        message,
        attempts: 0,
        strategy: None,
        fill: FillStats::default(),
        warnings: Vec::new(),
        error: None,
        elapsed_ms: 0,
    }
}

/// First short visible line carrying a confirmation keyword.
fn confirmation_line(text: &str, keywords: &[String]) -> Option<String> {
    text.lines()
        .map(collapse_whitespace)
        .filter(|l| {
            let n = l.chars().count();
            (CONFIRMATION_LINE_MIN..=CONFIRMATION_LINE_MAX).contains(&n)
        })
        .find(|l| {
            let lower = l.to_lowercase();
            keywords.iter().any(|k| lower.contains(&k.to_lowercase()))
        })
}
