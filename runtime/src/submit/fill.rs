// Copyright 2026 Formpilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Type-aware field filling.

use crate::config::SubmitConfig;
use crate::error::FetchResult;
use crate::fetch::PageSession;
use crate::matcher::bind_form;
use crate::types::{FetchStrategy, FieldData, FieldDescriptor, FillStats, FormDescriptor, InputType};
use rand::Rng;

const TRUTHY: &[&str] = &["true", "1", "yes", "on", "checked"];

/// Whether a supplied value asks for a checked box.
pub fn is_truthy(value: &str) -> bool {
    let v = value.trim();
    TRUTHY.iter().any(|t| v.eq_ignore_ascii_case(t))
}

/// Random delay in `[min, max]`. The RNG is dropped before any await.
fn jitter(min: u64, max: u64) -> u64 {
    if max <= min {
        return min;
    }
    rand::thread_rng().gen_range(min..=max)
}

enum FieldAction {
    Filled,
    Skipped,
}

/// Fill every matched field of `form`.
///
/// Never fails as a whole: per-field failures are counted and described in
/// the returned stats, alongside matcher warnings.
pub async fn fill_form(
    session: &mut dyn PageSession,
    form: &FormDescriptor,
    data: &FieldData,
    cfg: &SubmitConfig,
) -> (FillStats, Vec<String>) {
    let binding = bind_form(form, data);
    let mut stats = FillStats::default();

    for (field, matched) in form.fields.iter().zip(&binding.matches) {
        let Some(m) = matched else {
            stats.skipped += 1;
            continue;
        };
        if !field.is_writable() {
            tracing::debug!(field = %field.identifier, "not writable, skipping");
            stats.skipped += 1;
            continue;
        }

        session
            .settle(jitter(cfg.pre_fill_delay_min_ms, cfg.pre_fill_delay_max_ms))
            .await;

        match fill_field(session, form.index, field, &m.value, cfg).await {
            Ok(FieldAction::Filled) => stats.filled += 1,
            Ok(FieldAction::Skipped) => stats.skipped += 1,
            Err(e) => {
                tracing::debug!(field = %field.identifier, "fill failed: {e}");
                stats.errored += 1;
                stats.errors.push(format!("{}: {e}", field.label));
            }
        }
    }

    tracing::info!(
        form = form.index,
        filled = stats.filled,
        skipped = stats.skipped,
        errored = stats.errored,
        "form filled"
    );
    (stats, binding.warnings)
}

async fn fill_field(
    session: &mut dyn PageSession,
    form: usize,
    field: &FieldDescriptor,
    value: &str,
    cfg: &SubmitConfig,
) -> FetchResult<FieldAction> {
    let pos = field.position;
    match field.input_type {
        InputType::Checkbox => {
            let want = is_truthy(value);
            if session.is_checked(form, pos).await? != want {
                session.click(form, pos).await?;
            }
            Ok(FieldAction::Filled)
        }
        InputType::Radio => {
            let v = value.trim();
            let hit = field
                .value
                .as_deref()
                .is_some_and(|rv| rv.eq_ignore_ascii_case(v))
                || field.label.eq_ignore_ascii_case(v)
                || is_truthy(v);
            if !hit {
                return Ok(FieldAction::Skipped);
            }
            session.click(form, pos).await?;
            Ok(FieldAction::Filled)
        }
        InputType::Select => {
            let v = value.trim();
            let option = field
                .options
                .iter()
                .find(|o| o.value.eq_ignore_ascii_case(v) || o.text.eq_ignore_ascii_case(v))
                .ok_or_else(|| {
                    crate::error::FetchError::ElementNotFound(format!("no option matching '{v}'"))
                })?;
            session.select_option(form, pos, &option.value).await?;
            Ok(FieldAction::Filled)
        }
        t if t.is_text_like() => {
            session.clear(form, pos).await?;
            if session.strategy() == FetchStrategy::Interactive {
                let mut buf = [0u8; 4];
                for c in value.chars() {
                    session.type_text(form, pos, c.encode_utf8(&mut buf)).await?;
                    session
                        .settle(jitter(cfg.typing_delay_min_ms, cfg.typing_delay_max_ms))
                        .await;
                }
            } else {
                session.type_text(form, pos, value).await?;
            }
            Ok(FieldAction::Filled)
        }
        _ => Ok(FieldAction::Skipped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_form;
    use crate::submit::testing::RecordingSession;

    const FORM: &str = r#"<form>
        <input name="name">
        <input type="checkbox" name="newsletter" checked>
        <input type="checkbox" name="terms">
        <input type="radio" name="size" value="s">
        <input type="radio" name="size" value="l">
        <select name="color"><option value="r">Red</option><option value="g">Green</option></select>
        <input type="file" name="cv">
        <input name="locked" readonly>
        <input name="unused">
    </form>"#;

    fn data(pairs: &[(&str, &str)]) -> FieldData {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_fill_semantics() {
        let form = extract_form(FORM, "https://example.com/", 0).unwrap();
        let mut session = RecordingSession::default();
        session.checked.insert(1, true);

        let (stats, warnings) = fill_form(
            &mut session,
            &form,
            &data(&[
                ("name", "Ada"),
                ("newsletter", "yes"),
                ("terms", "true"),
                ("size", "L"),
                ("color", "green"),
                ("cv", "/tmp/cv.pdf"),
                ("locked", "x"),
            ]),
            &SubmitConfig::default(),
        )
        .await;

        assert!(warnings.is_empty());
        assert_eq!(
            session.ops,
            vec!["clear 0", "type 0 Ada", "click 2", "click 4", "select 5 g"]
        );
        // name, newsletter (already checked), terms, radio l, color
        assert_eq!(stats.filled, 5);
        // radio s, cv, locked, unused
        assert_eq!(stats.skipped, 4);
        assert_eq!(stats.errored, 0);
    }

    #[tokio::test]
    async fn test_unknown_option_is_an_error() {
        let form = extract_form(FORM, "https://example.com/", 0).unwrap();
        let mut session = RecordingSession::default();
        let (stats, _) = fill_form(
            &mut session,
            &form,
            &data(&[("color", "purple")]),
            &SubmitConfig::default(),
        )
        .await;
        assert_eq!(stats.errored, 1);
        assert!(stats.errors[0].starts_with("Color: "));
    }

    #[tokio::test]
    async fn test_interactive_types_per_character() {
        let form = extract_form(FORM, "https://example.com/", 0).unwrap();
        let mut session = RecordingSession {
            strategy: Some(FetchStrategy::Interactive),
            ..RecordingSession::default()
        };
        fill_form(&mut session, &form, &data(&[("name", "Bo")]), &SubmitConfig::default()).await;
        assert_eq!(session.ops, vec!["clear 0", "type 0 B", "type 0 o"]);
    }

    #[test]
    fn test_truthy_tokens() {
        assert!(is_truthy("Yes"));
        assert!(is_truthy(" checked "));
        assert!(!is_truthy("no"));
        assert!(!is_truthy(""));
    }
}
