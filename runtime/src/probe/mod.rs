// Copyright 2026 Formpilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Barrier and capability probing.
//!
//! Lightweight fetch first; a clean page with forms returns immediately
//! with the clear score. Anything else escalates to the interactive
//! strategy, waits out challenge interstitials, and rescans. When the
//! interactive strategy is unavailable the lightweight scan is scored
//! instead.

pub mod barriers;
pub mod challenge;

use crate::config::EngineConfig;
use crate::error::{FetchError, FetchResult};
use crate::fetch::{fetch_page, PageSnapshot};
use crate::renderer::{RenderContext, Renderer};
use crate::types::{AccessibilityReport, FetchStrategy};
use crate::util::{truncate, MAX_DIAGNOSTIC_CHARS};
use barriers::{recommendations, scan_page, success_probability};
use challenge::{wait_out_challenge, ChallengeOutcome};
use std::time::Instant;

/// Probe result plus the content it was computed from, so the caller can
/// extract forms without fetching again.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub report: AccessibilityReport,
    pub snapshot: Option<PageSnapshot>,
}

/// Assess reachability and automation readiness of `url`.
///
/// The report is marked accessible when its score exceeds the configured
/// threshold; later stages read that flag instead of the raw score.
pub async fn probe(url: &str, renderer: &dyn Renderer, config: &EngineConfig) -> ProbeOutcome {
    let mut outcome = assess(url, renderer, config).await;
    let report = &mut outcome.report;
    report.accessible = report.is_accessible(config.probe.accessible_threshold);
    outcome
}

async fn assess(url: &str, renderer: &dyn Renderer, config: &EngineConfig) -> ProbeOutcome {
    let cfg = &config.probe;

    let light_err = match fetch_page(FetchStrategy::Lightweight, url, renderer, config).await {
        Ok(snapshot) => {
            let scan = scan_page(snapshot.status, &snapshot.html, &snapshot.final_url);
            if scan.barriers.is_empty() && scan.forms_found > 0 {
                tracing::debug!(url, forms = scan.forms_found, "page clear over HTTP");
                let mut report = report_from(url, &snapshot, config);
                report.success_probability = cfg.clear_score;
                return ProbeOutcome {
                    report,
                    snapshot: Some(snapshot),
                };
            }

            tracing::info!(
                url,
                barriers = ?scan.barriers,
                forms = scan.forms_found,
                "escalating to interactive strategy"
            );
            match probe_interactive(url, renderer, config).await {
                Ok(rendered) => {
                    return ProbeOutcome {
                        report: report_from(url, &rendered, config),
                        snapshot: Some(rendered),
                    }
                }
                Err(e) => {
                    tracing::warn!(url, "interactive strategy unavailable: {e}");
                    let mut report = report_from(url, &snapshot, config);
                    report.recommendations.push(format!(
                        "Interactive strategy unavailable ({}) - result based on HTTP fetch only",
                        e.reason()
                    ));
                    return ProbeOutcome {
                        report,
                        snapshot: Some(snapshot),
                    };
                }
            }
        }
        Err(e) => e,
    };

    tracing::info!(url, "HTTP fetch failed ({light_err}), trying interactive strategy");
    match probe_interactive(url, renderer, config).await {
        Ok(rendered) => ProbeOutcome {
            report: report_from(url, &rendered, config),
            snapshot: Some(rendered),
        },
        Err(e) => {
            tracing::warn!(url, "page unreachable: {light_err}; {e}");
            ProbeOutcome {
                report: unreachable_report(url, &light_err, &e),
                snapshot: None,
            }
        }
    }
}

/// Load through a rendering context and wait out any challenge.
async fn probe_interactive(
    url: &str,
    renderer: &dyn Renderer,
    config: &EngineConfig,
) -> FetchResult<PageSnapshot> {
    let mut ctx = renderer.new_context().await?;
    let result = load_rendered(ctx.as_mut(), url, config).await;
    if let Err(e) = ctx.close().await {
        tracing::debug!("closing probe context failed: {e}");
    }
    result
}

async fn load_rendered(
    ctx: &mut dyn RenderContext,
    url: &str,
    config: &EngineConfig,
) -> FetchResult<PageSnapshot> {
    let start = Instant::now();
    let nav = ctx.navigate(url, config.probe.interactive_timeout_ms).await?;

    match wait_out_challenge(ctx, &config.probe).await {
        Ok(ChallengeOutcome::Persisted { waited_ms, clicked }) => {
            tracing::warn!(url, waited_ms, clicked, "challenge still present");
        }
        Ok(_) => {}
        Err(e) => tracing::debug!(url, "challenge check failed: {e}"),
    }

    let html = ctx.get_html().await?;
    let final_url = ctx.get_url().await.unwrap_or(nav.final_url);
    Ok(PageSnapshot {
        requested_url: url.to_string(),
        final_url,
        status: nav.status,
        html,
        load_time_ms: nav.load_time_ms.max(start.elapsed().as_millis() as u64),
        strategy: FetchStrategy::Interactive,
    })
}

/// Score a snapshot with the penalty table.
fn report_from(url: &str, snapshot: &PageSnapshot, config: &EngineConfig) -> AccessibilityReport {
    let scan = scan_page(snapshot.status, &snapshot.html, &snapshot.final_url);
    let score = success_probability(
        &scan.barriers,
        scan.forms_found,
        snapshot.load_time_ms,
        &config.probe,
    );
    AccessibilityReport {
        url: truncate(url, MAX_DIAGNOSTIC_CHARS),
        final_url: Some(snapshot.final_url.clone()),
        reachable: snapshot.status.map_or(true, |s| s < 400),
        accessible: false,
        status_code: snapshot.status,
        strategy: snapshot.strategy,
        recommendations: recommendations(&scan.barriers, scan.forms_found),
        barriers: scan.barriers,
        success_probability: score,
        forms_found: scan.forms_found,
        load_time_ms: snapshot.load_time_ms,
        error: None,
    }
}

fn unreachable_report(url: &str, light: &FetchError, rendered: &FetchError) -> AccessibilityReport {
    AccessibilityReport {
        url: truncate(url, MAX_DIAGNOSTIC_CHARS),
        final_url: None,
        reachable: false,
        accessible: false,
        status_code: None,
        strategy: FetchStrategy::Lightweight,
        barriers: Vec::new(),
        success_probability: 0.0,
        recommendations: vec!["Page could not be fetched - verify the URL and network access".to_string()],
        forms_found: 0,
        load_time_ms: 0,
        error: Some(truncate(
            &format!("{light}; interactive: {rendered}"),
            MAX_DIAGNOSTIC_CHARS,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Barrier;

    fn snapshot(status: u16, html: &str, load_time_ms: u64) -> PageSnapshot {
        PageSnapshot {
            requested_url: "https://example.com/".into(),
            final_url: "https://example.com/".into(),
            status: Some(status),
            html: html.into(),
            load_time_ms,
            strategy: FetchStrategy::Lightweight,
        }
    }

    #[test]
    fn test_report_from_error_page() {
        let cfg = EngineConfig::default();
        let report = report_from("https://example.com/", &snapshot(403, "Forbidden", 20), &cfg);
        assert!(!report.reachable);
        assert_eq!(report.barriers, vec![Barrier::HttpError(403)]);
        assert!(report.success_probability <= 0.3);
        assert!(!report.is_accessible(cfg.probe.accessible_threshold));
    }

    #[test]
    fn test_report_from_captcha_form() {
        let cfg = EngineConfig::default();
        let html = r#"<form><input name=a><div class="h-captcha"></div></form>"#;
        let report = report_from("https://example.com/", &snapshot(200, html, 2_000), &cfg);
        assert!(report.reachable);
        assert_eq!(report.forms_found, 1);
        assert!((report.success_probability - 0.7).abs() < 1e-6);
        assert!(report.is_accessible(cfg.probe.accessible_threshold));
    }

    #[test]
    fn test_unreachable_report() {
        let report = unreachable_report(
            "https://nowhere.invalid/",
            &FetchError::Network("dns error".into()),
            &FetchError::ContextCreation("no browser".into()),
        );
        assert!(!report.reachable);
        assert_eq!(report.success_probability, 0.0);
        assert!(report.error.unwrap().contains("dns error"));
    }
}
