// Copyright 2026 Formpilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Waiting out anti-bot interstitials in the interactive strategy.
//!
//! Polls the page for challenge markers, clicks a known verification
//! widget once, and stops early when the URL changes or the markers
//! disappear. Bounded by the configured ceiling; nothing here attempts to
//! defeat a challenge beyond what a visitor would do.

use crate::config::ProbeConfig;
use crate::error::{FetchError, FetchResult};
use crate::renderer::RenderContext;
use serde::Deserialize;
use std::time::{Duration, Instant};

const DETECT_SCRIPT: &str = r#"(() => {
    const text = ((document.title || '') + ' ' +
        (document.body ? document.body.innerText : '')).toLowerCase();
    const markers = ['checking your browser', 'just a moment', 'verifying you are human',
        'ddos protection by'];
    const dom = !!document.querySelector(
        '#cf-browser-verification, #challenge-running, #challenge-form, .cf-challenge');
    const challenge = dom || (document.forms.length === 0 && markers.some(m => text.includes(m)));
    let clicked = false;
    if (challenge && !window.__formpilotClicked) {
        const target = document.querySelector(
            '.cf-turnstile, #challenge-form input[type="checkbox"], input[type="checkbox"]');
        if (target) {
            target.click();
            window.__formpilotClicked = true;
            clicked = true;
        }
    }
    return { challenge, clicked };
})()"#;

#[derive(Debug, Default, Deserialize)]
struct Detection {
    challenge: bool,
    clicked: bool,
}

/// How a challenge wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeOutcome {
    /// No challenge markers on the page.
    NotPresent,
    /// Markers disappeared or the page navigated away.
    Cleared { waited_ms: u64, clicked: bool },
    /// Still present at the ceiling.
    Persisted { waited_ms: u64, clicked: bool },
}

/// Poll until the challenge clears or the ceiling passes.
pub async fn wait_out_challenge(
    ctx: &dyn RenderContext,
    cfg: &ProbeConfig,
) -> FetchResult<ChallengeOutcome> {
    let start = Instant::now();
    let ceiling = Duration::from_millis(cfg.challenge_max_wait_ms);
    let poll = Duration::from_millis(cfg.challenge_poll_ms.max(100));
    let start_url = ctx.get_url().await?;
    let mut clicked = false;
    let mut seen = false;

    loop {
        let remaining = ceiling.saturating_sub(start.elapsed());
        let detection: Detection =
            match tokio::time::timeout(remaining.max(poll), ctx.execute_js(DETECT_SCRIPT)).await {
                Ok(Ok(value)) => serde_json::from_value(value).unwrap_or_default(),
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    return Err(FetchError::Timeout {
                        operation: "challenge detection".to_string(),
                        timeout_ms: cfg.challenge_max_wait_ms,
                    })
                }
            };
        clicked |= detection.clicked;
        let waited_ms = start.elapsed().as_millis() as u64;

        if !detection.challenge {
            if !seen {
                return Ok(ChallengeOutcome::NotPresent);
            }
            tracing::info!(waited_ms, "challenge cleared");
            return Ok(ChallengeOutcome::Cleared { waited_ms, clicked });
        }
        if !seen {
            tracing::info!("challenge page detected, waiting");
            seen = true;
        }

        if start.elapsed() >= ceiling {
            tracing::warn!(waited_ms, "challenge persisted until the ceiling");
            return Ok(ChallengeOutcome::Persisted { waited_ms, clicked });
        }

        tokio::time::sleep(poll.min(ceiling.saturating_sub(start.elapsed()))).await;

        let url = ctx.get_url().await.unwrap_or_default();
        if !url.is_empty() && url != start_url {
            let waited_ms = start.elapsed().as_millis() as u64;
            tracing::info!(waited_ms, %url, "challenge navigated away");
            return Ok(ChallengeOutcome::Cleared { waited_ms, clicked });
        }
    }
}
