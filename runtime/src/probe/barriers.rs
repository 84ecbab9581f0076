// Copyright 2026 Formpilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Barrier signatures and success-probability scoring.
//!
//! Shared by both fetch strategies: whatever produced the HTML, the same
//! scan and the same score apply.

use crate::config::ProbeConfig;
use crate::extract::parse_forms;
use crate::types::{Barrier, InputType};
use crate::util::visible_text;

/// Raw-markup tokens of CAPTCHA widgets.
const CAPTCHA_MARKUP: &[&str] = &[
    "g-recaptcha",
    "recaptcha/api",
    "grecaptcha",
    "h-captcha",
    "hcaptcha.com",
    "cf-turnstile",
    "captcha",
];

/// Raw-markup tokens only present on anti-bot interstitials.
const CHALLENGE_MARKUP: &[&str] = &[
    "cf-browser-verification",
    "challenge-running",
    "cf-challenge",
    "_cf_chl_opt",
    "challenge-form",
];

const CHALLENGE_PHRASES: &[&str] = &[
    "checking your browser",
    "just a moment",
    "verifying you are human",
    "ddos protection by",
    "enable javascript and cookies to continue",
];

const LOGIN_PHRASES: &[&str] = &[
    "sign in",
    "log in",
    "login",
    "please authenticate",
    "authentication required",
];

const DENIAL_PHRASES: &[&str] = &[
    "access denied",
    "access to this page has been denied",
    "you don't have permission",
    "you do not have permission",
    "request blocked",
    "you have been blocked",
];

const RATE_LIMIT_PHRASES: &[&str] = &["too many requests", "rate limit exceeded"];

/// What a scan of one page found.
#[derive(Debug, Clone, PartialEq)]
pub struct PageScan {
    pub barriers: Vec<Barrier>,
    pub forms_found: usize,
}

/// Scan fetched content for barrier signatures.
///
/// Error responses (status >= 400) report the status plus rate-limit and
/// challenge markers only; their body is an error page, not the target.
pub fn scan_page(status: Option<u16>, html: &str, base_url: &str) -> PageScan {
    let markup = html.to_lowercase();
    let text = visible_text(html).to_lowercase();
    let forms = parse_forms(html, base_url);
    let mut barriers = Vec::new();

    let any = |haystack: &str, needles: &[&str]| needles.iter().any(|n| haystack.contains(n));
    let is_challenge =
        any(&markup, CHALLENGE_MARKUP) || (forms.is_empty() && any(&text, CHALLENGE_PHRASES));

    if let Some(code) = status.filter(|s| *s >= 400) {
        barriers.push(Barrier::HttpError(code));
        if code == 429 {
            barriers.push(Barrier::RateLimited);
        }
        if is_challenge {
            barriers.push(Barrier::ChallengePage);
        }
        return PageScan {
            barriers,
            forms_found: forms.len(),
        };
    }

    if any(&markup, CAPTCHA_MARKUP) {
        barriers.push(Barrier::CaptchaDetected);
    }
    if is_challenge {
        barriers.push(Barrier::ChallengePage);
    }
    let has_password = forms
        .iter()
        .flat_map(|f| f.fields.iter())
        .any(|f| f.input_type == InputType::Password);
    if has_password && any(&text, LOGIN_PHRASES) {
        barriers.push(Barrier::CredentialWall);
    }
    if any(&text, DENIAL_PHRASES) {
        barriers.push(Barrier::AccessDenied);
    }
    if any(&text, RATE_LIMIT_PHRASES) {
        barriers.push(Barrier::RateLimited);
    }
    if forms.is_empty() && text.trim().is_empty() {
        barriers.push(Barrier::NoContent);
    }

    PageScan {
        barriers,
        forms_found: forms.len(),
    }
}

/// Weighted success probability, clamped to [0, 1].
pub fn success_probability(
    barriers: &[Barrier],
    forms_found: usize,
    load_time_ms: u64,
    cfg: &ProbeConfig,
) -> f32 {
    let mut score = cfg.base_score;
    for barrier in barriers {
        score -= cfg.penalty_for(&barrier.to_string(), barrier.family());
    }
    if forms_found > 0 {
        score += cfg.form_bonus;
    } else {
        score -= cfg.no_form_penalty;
    }
    if load_time_ms < cfg.fast_load_ms {
        score -= cfg.fast_load_penalty;
    } else if load_time_ms > cfg.slow_load_ms {
        score -= cfg.slow_load_penalty;
    }
    score.clamp(0.0, 1.0)
}

/// Human-readable advice for the detected barriers.
pub fn recommendations(barriers: &[Barrier], forms_found: usize) -> Vec<String> {
    let mut out: Vec<String> = barriers
        .iter()
        .map(|b| match b {
            Barrier::HttpError(code) => {
                format!("Server returned HTTP {code} - verify the URL and access rights")
            }
            Barrier::CaptchaDetected => {
                "CAPTCHA detected - may require manual intervention".to_string()
            }
            Barrier::ChallengePage => {
                "Anti-bot challenge page detected - retry later or from a different network"
                    .to_string()
            }
            Barrier::CredentialWall => {
                "Login required - provide authentication credentials".to_string()
            }
            Barrier::AccessDenied => {
                "Access blocked - consider using different IP or proxy".to_string()
            }
            Barrier::RateLimited => "Rate limited - slow down and retry later".to_string(),
            Barrier::NoContent => {
                "Page returned no content - it may be rendered by scripts".to_string()
            }
        })
        .collect();
    if forms_found == 0 {
        out.push("No forms found - verify URL or wait for dynamic content".to_string());
    }
    out
}
