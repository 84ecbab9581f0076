// Copyright 2026 Formpilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Ordered submission tactics.
//!
//! Ranked submit controls first, then implicit submission (Enter in the
//! last text field), then the form's native submit. The first tactic that
//! runs without error wins.

use crate::error::SubmissionError;
use crate::fetch::PageSession;
use crate::types::{FormDescriptor, InputType, SubmitControl};
use std::fmt;

const SUBMIT_WORDS: &[&str] = &["submit", "send", "apply"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitTactic {
    Click { position: usize, text: String },
    Enter { position: usize },
    Native,
}

impl fmt::Display for SubmitTactic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitTactic::Click { text, .. } => write!(f, "click '{text}'"),
            SubmitTactic::Enter { position } => write!(f, "enter in control {position}"),
            SubmitTactic::Native => f.write_str("native submit"),
        }
    }
}

fn control_rank(control: &SubmitControl) -> u8 {
    let text = control.text.to_lowercase();
    let value = control.value.as_deref().unwrap_or_default().to_lowercase();
    if SUBMIT_WORDS
        .iter()
        .any(|w| text.contains(w) || value.contains(w))
    {
        0
    } else if control.input_type.is_submit_like() {
        1
    } else {
        2
    }
}

/// Tactics for `form`, in the order they are tried.
pub fn plan(form: &FormDescriptor) -> Vec<SubmitTactic> {
    let mut controls: Vec<&SubmitControl> = form.submit_controls.iter().collect();
    controls.sort_by_key(|c| control_rank(c));

    let mut tactics: Vec<SubmitTactic> = controls
        .into_iter()
        .map(|c| SubmitTactic::Click {
            position: c.position,
            text: c.text.clone(),
        })
        .collect();

    if let Some(last) = form
        .fields
        .iter()
        .rev()
        .find(|f| f.is_writable() && f.input_type.is_text_like() && f.input_type != InputType::Textarea)
    {
        tactics.push(SubmitTactic::Enter {
            position: last.position,
        });
    }
    tactics.push(SubmitTactic::Native);
    tactics
}

/// Try each tactic until one runs, waiting `settle_ms` after it.
pub async fn submit_form(
    session: &mut dyn PageSession,
    form: &FormDescriptor,
    settle_ms: u64,
) -> Result<SubmitTactic, SubmissionError> {
    for tactic in plan(form) {
        let outcome = match &tactic {
            SubmitTactic::Click { position, .. } => session.click(form.index, *position).await,
            SubmitTactic::Enter { position } => session.press_enter(form.index, *position).await,
            SubmitTactic::Native => session.submit_native(form.index).await,
        };
        match outcome {
            Ok(()) => {
                session.settle(settle_ms).await;
                tracing::info!(form = form.index, %tactic, "form submitted");
                return Ok(tactic);
            }
            Err(e) => tracing::debug!(%tactic, "tactic failed: {e}"),
        }
    }
    Err(SubmissionError::NoSubmitTactic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_form;
    use crate::submit::testing::RecordingSession;

    #[test]
    fn test_plan_ranks_controls() {
        let html = r#"<form>
            <input name="q">
            <textarea name="notes"></textarea>
            <button type="button">Preview</button>
            <input type="image" name="img" src="go.png" alt="Go">
            <button>Send message</button>
        </form>"#;
        let form = extract_form(html, "https://example.com/", 0).unwrap();
        let tactics = plan(&form);
        assert_eq!(
            tactics,
            vec![
                SubmitTactic::Click {
                    position: 4,
                    text: "Send message".into()
                },
                SubmitTactic::Click {
                    position: 3,
                    text: "Go".into()
                },
                SubmitTactic::Click {
                    position: 2,
                    text: "Preview".into()
                },
                SubmitTactic::Enter { position: 0 },
                SubmitTactic::Native,
            ]
        );
    }

    #[test]
    fn test_plan_without_controls() {
        let form = extract_form(r#"<form><input type="checkbox" name="c"></form>"#, "https://example.com/", 0)
            .unwrap();
        assert_eq!(plan(&form), vec![SubmitTactic::Native]);
    }

    #[tokio::test]
    async fn test_falls_through_failed_tactics() {
        let form = extract_form(
            r#"<form><input name="q"><button>Go</button></form>"#,
            "https://example.com/",
            0,
        )
        .unwrap();
        let mut session = RecordingSession {
            fail_clicks: true,
            ..RecordingSession::default()
        };
        let tactic = submit_form(&mut session, &form, 0).await.unwrap();
        assert_eq!(tactic, SubmitTactic::Enter { position: 0 });
        assert_eq!(session.ops, vec!["enter 0"]);
    }

    #[tokio::test]
    async fn test_all_tactics_fail() {
        let form = extract_form(r#"<form><button>Go</button></form>"#, "https://example.com/", 0)
            .unwrap();
        let mut session = RecordingSession {
            fail_clicks: true,
            fail_submits: true,
            ..RecordingSession::default()
        };
        assert_eq!(
            submit_form(&mut session, &form, 0).await,
            Err(SubmissionError::NoSubmitTactic)
        );
    }
}
