// Copyright 2026 Formpilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Engine configuration: every tunable constant in one place.
//!
//! The heuristics (barrier penalties, score weights, phrase lists) are
//! hand-tuned and meant to be adjusted per deployment. A JSON file may
//! override any subset; everything missing falls back to the defaults
//! below.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Env var naming a config file.
pub const CONFIG_ENV: &str = "FORMPILOT_CONFIG";
/// Env var naming the Chromium binary.
pub const CHROMIUM_PATH_ENV: &str = "FORMPILOT_CHROMIUM_PATH";
/// Env var; `0` or `false` shows the browser window.
pub const HEADLESS_ENV: &str = "FORMPILOT_HEADLESS";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
                                  AppleWebKit/537.36 (KHTML, like Gecko) \
                                  Chrome/131.0.0.0 Safari/537.36";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub user_agent: String,
    pub probe: ProbeConfig,
    pub submit: SubmitConfig,
    pub classify: ClassifyConfig,
    pub browser: BrowserSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            probe: ProbeConfig::default(),
            submit: SubmitConfig::default(),
            classify: ClassifyConfig::default(),
            browser: BrowserSettings::default(),
        }
    }
}

/// Barrier detection and success-probability scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub lightweight_timeout_ms: u64,
    pub interactive_timeout_ms: u64,
    /// Ceiling for waiting out a challenge interstitial.
    pub challenge_max_wait_ms: u64,
    pub challenge_poll_ms: u64,
    pub base_score: f32,
    /// Score returned when the lightweight fetch finds forms and no barriers.
    pub clear_score: f32,
    /// Reports scoring above this are treated as accessible.
    pub accessible_threshold: f32,
    /// Lightweight reports scoring at least this keep the lightweight strategy.
    pub lightweight_preference: f32,
    /// Penalty per barrier tag (`http_error_403`) or family (`http_error`).
    pub penalties: BTreeMap<String, f32>,
    pub default_penalty: f32,
    pub form_bonus: f32,
    pub no_form_penalty: f32,
    pub fast_load_ms: u64,
    pub fast_load_penalty: f32,
    pub slow_load_ms: u64,
    pub slow_load_penalty: f32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        let penalties = [
            ("captcha_detected", 0.3),
            ("challenge_page", 0.1),
            ("credential_wall", 0.4),
            ("access_denied", 0.6),
            ("rate_limited", 0.3),
            ("no_content", 0.2),
            ("http_error_403", 0.7),
            ("http_error_404", 0.8),
            ("http_error", 0.5),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            lightweight_timeout_ms: 15_000,
            interactive_timeout_ms: 30_000,
            challenge_max_wait_ms: 30_000,
            challenge_poll_ms: 1_000,
            base_score: 0.8,
            clear_score: 0.9,
            accessible_threshold: 0.6,
            lightweight_preference: 0.8,
            penalties,
            default_penalty: 0.2,
            form_bonus: 0.2,
            no_form_penalty: 0.3,
            fast_load_ms: 1_000,
            fast_load_penalty: 0.1,
            slow_load_ms: 30_000,
            slow_load_penalty: 0.2,
        }
    }
}

impl ProbeConfig {
    /// Penalty for one barrier: exact tag, then family, then the default.
    pub fn penalty_for(&self, tag: &str, family: &str) -> f32 {
        self.penalties
            .get(tag)
            .or_else(|| self.penalties.get(family))
            .copied()
            .unwrap_or(self.default_penalty)
    }
}

/// Fill, submit and retry timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitConfig {
    pub max_retries: u32,
    pub backoff_step_secs: u64,
    pub backoff_cap_secs: u64,
    pub navigation_timeout_ms: u64,
    /// Wait after navigation for dynamic content.
    pub navigation_settle_ms: u64,
    pub navigation_retry_delay_ms: u64,
    /// Wait after each submit tactic.
    pub submit_settle_ms: u64,
    /// Wait before reading the post-submission page.
    pub result_settle_ms: u64,
    /// Ceiling for any single element operation.
    pub element_timeout_ms: u64,
    pub typing_delay_min_ms: u64,
    pub typing_delay_max_ms: u64,
    pub pre_fill_delay_min_ms: u64,
    pub pre_fill_delay_max_ms: u64,
    /// Capacity of the attempt-history ring.
    pub max_history: usize,
}

impl Default for SubmitConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_step_secs: 2,
            backoff_cap_secs: 10,
            navigation_timeout_ms: 30_000,
            navigation_settle_ms: 3_000,
            navigation_retry_delay_ms: 2_000,
            submit_settle_ms: 2_000,
            result_settle_ms: 3_000,
            element_timeout_ms: 10_000,
            typing_delay_min_ms: 50,
            typing_delay_max_ms: 150,
            pre_fill_delay_min_ms: 100,
            pre_fill_delay_max_ms: 300,
            max_history: 50,
        }
    }
}

impl SubmitConfig {
    /// Delay after the failed attempt with 0-based index `n`:
    /// `min((n + 1) * step, cap)`.
    pub fn backoff_delay(&self, n: u32) -> Duration {
        let secs = (u64::from(n) + 1)
            .saturating_mul(self.backoff_step_secs)
            .min(self.backoff_cap_secs);
        Duration::from_secs(secs)
    }
}

/// Outcome classification evidence and thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyConfig {
    pub success_phrases: Vec<String>,
    pub error_phrases: Vec<String>,
    /// Keywords marking a line as confirmation text.
    pub confirmation_keywords: Vec<String>,
    /// URL substrings that mark a confirmation page.
    pub confirmation_url_tokens: Vec<String>,
    pub success_threshold: u32,
    pub confirmation_url_bonus: u32,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            success_phrases: strings(&[
                "thank you",
                "thanks",
                "message sent",
                "form submitted",
                "successfully submitted",
                "submission successful",
                "sent successfully",
                "we have received",
                "received your message",
                "confirmation",
            ]),
            error_phrases: strings(&[
                "error",
                "failed",
                "invalid",
                "required field",
                "missing",
                "try again",
                "problem",
                "incorrect",
                "not allowed",
                "forbidden",
            ]),
            confirmation_keywords: strings(&[
                "thank you",
                "success",
                "sent",
                "received",
                "confirmation",
            ]),
            confirmation_url_tokens: strings(&["thank", "success", "confirm", "complete"]),
            success_threshold: 50,
            confirmation_url_bonus: 10,
        }
    }
}

/// Interactive strategy browser launch settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub chromium_path: Option<PathBuf>,
    pub extra_args: Vec<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            chromium_path: None,
            extra_args: strings(&[
                "--disable-blink-features=AutomationControlled",
                "--disable-dev-shm-usage",
                "--no-sandbox",
                "--window-size=1366,768",
            ]),
        }
    }
}

impl EngineConfig {
    /// Load from the first config file found, else defaults; then apply
    /// environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match resolve_config_path(explicit) {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded engine config");
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(p) = std::env::var(CHROMIUM_PATH_ENV) {
            self.browser.chromium_path = Some(PathBuf::from(p));
        }
        if let Ok(v) = std::env::var(HEADLESS_ENV) {
            self.browser.headless = !matches!(v.trim(), "0" | "false" | "no");
        }
    }
}

/// Resolve the config file: explicit path, then `FORMPILOT_CONFIG`, then
/// `./formpilot.json`, then `~/.formpilot/config.json`.
///
/// An explicit or env-named path is returned even if missing so that the
/// caller reports it.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        if !env_path.is_empty() {
            return Some(PathBuf::from(env_path));
        }
    }

    let cwd = PathBuf::from("formpilot.json");
    if cwd.exists() {
        return Some(cwd);
    }

    dirs::home_dir()
        .map(|home| home.join(".formpilot").join("config.json"))
        .filter(|p| p.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_backoff_is_capped() {
        let cfg = SubmitConfig::default();
        assert_eq!(cfg.backoff_delay(0), Duration::from_secs(2));
        assert_eq!(cfg.backoff_delay(1), Duration::from_secs(4));
        assert_eq!(cfg.backoff_delay(3), Duration::from_secs(8));
        assert_eq!(cfg.backoff_delay(4), Duration::from_secs(10));
        assert_eq!(cfg.backoff_delay(40), Duration::from_secs(10));
    }

    #[test]
    fn test_penalty_lookup_order() {
        let cfg = ProbeConfig::default();
        assert_eq!(cfg.penalty_for("http_error_403", "http_error"), 0.7);
        assert_eq!(cfg.penalty_for("http_error_500", "http_error"), 0.5);
        assert_eq!(cfg.penalty_for("something_new", "something_new"), 0.2);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"submit": {{"max_retries": 5}}, "probe": {{"accessible_threshold": 0.5}}}}"#
        )
        .unwrap();

        let cfg = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(cfg.submit.max_retries, 5);
        assert_eq!(cfg.submit.backoff_cap_secs, 10);
        assert_eq!(cfg.probe.accessible_threshold, 0.5);
        assert_eq!(cfg.probe.clear_score, 0.9);
        assert!(cfg.classify.success_phrases.contains(&"thank you".to_string()));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let err = EngineConfig::load(Some(&missing)).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read config file"));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(EngineConfig::from_file(file.path()).is_err());
    }
}
