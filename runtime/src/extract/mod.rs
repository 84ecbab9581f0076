// Copyright 2026 Formpilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Form and field extraction from fetched HTML.
//!
//! Controls are enumerated with the selector `input, textarea, select,
//! button` inside each `<form>`, in document order. The browser session
//! tags controls with the same selector, so a control's `position` means
//! the same thing under both fetch strategies.
//!
//! All entry points are synchronous: `scraper::Html` is not `Send`, so
//! parsing never spans an await point.

pub mod label;

use crate::error::ExtractionError;
use crate::types::{
    FieldConstraints, FieldDescriptor, FieldTag, FormDescriptor, FormMethod, HiddenField,
    InputType, PageType, SelectOption, SubmitControl,
};
use crate::util::{collapse_whitespace, resolve_url, visible_text};
use label::LabelIndex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;

/// Selector enumerating form controls, shared with the browser session.
pub const CONTROL_SELECTOR: &str = "input, textarea, select, button";

struct Selectors {
    form: Selector,
    control: Selector,
    option: Selector,
    title: Selector,
}

fn selectors() -> &'static Selectors {
    static SELECTORS: OnceLock<Selectors> = OnceLock::new();
    SELECTORS.get_or_init(|| Selectors {
        form: Selector::parse("form").expect("form selector is valid"),
        control: Selector::parse(CONTROL_SELECTOR).expect("control selector is valid"),
        option: Selector::parse("option").expect("option selector is valid"),
        title: Selector::parse("title").expect("title selector is valid"),
    })
}

// ── Public API ──────────────────────────────────────────────────────────────

/// Parse every form on the page.
pub fn parse_forms(html: &str, base_url: &str) -> Vec<FormDescriptor> {
    let document = Html::parse_document(html);
    let labels = LabelIndex::build(&document);
    document
        .select(&selectors().form)
        .enumerate()
        .map(|(index, form)| parse_form(index, form, base_url, &labels))
        .collect()
}

/// Number of `<form>` elements on the page.
pub fn count_forms(html: &str) -> usize {
    Html::parse_document(html).select(&selectors().form).count()
}

/// Extract the form at `index`.
pub fn extract_form(
    html: &str,
    base_url: &str,
    index: usize,
) -> Result<FormDescriptor, ExtractionError> {
    if html.trim().is_empty() {
        return Err(ExtractionError::Unparsable("empty document".to_string()));
    }
    let mut forms = parse_forms(html, base_url);
    let count = forms.len();
    if count == 0 {
        return Err(ExtractionError::NoFormsFound);
    }
    if index >= count {
        return Err(ExtractionError::FormIndexOutOfRange { index, count });
    }
    Ok(forms.swap_remove(index))
}

/// Document `<title>`, whitespace-collapsed.
pub fn page_title(html: &str) -> Option<String> {
    Html::parse_document(html)
        .select(&selectors().title)
        .next()
        .map(|t| collapse_whitespace(&t.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

/// Classify a page by its forms and visible wording.
pub fn page_type(html: &str, forms: &[FormDescriptor]) -> PageType {
    if forms.is_empty() {
        return PageType::NoForms;
    }
    let text = visible_text(html).to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|w| text.contains(w));

    if forms.iter().any(FormDescriptor::has_file_upload)
        || mentions(&["job", "career", "position", "application", "apply now", "resume"])
    {
        return PageType::JobApplication;
    }
    if mentions(&["contact", "message", "inquiry", "get in touch"]) {
        return PageType::ContactForm;
    }
    if mentions(&["register", "sign up", "create account", "join"]) {
        return PageType::Registration;
    }
    let has_password = forms
        .iter()
        .flat_map(|f| f.fields.iter())
        .any(|f| f.input_type == InputType::Password);
    if has_password || mentions(&["login", "log in", "sign in", "authenticate"]) {
        return PageType::Login;
    }
    PageType::GeneralForm
}

// ── Internals ───────────────────────────────────────────────────────────────

fn attr(el: ElementRef<'_>, name: &str) -> Option<String> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn has_attr(el: ElementRef<'_>, name: &str) -> bool {
    el.value().attr(name).is_some()
}

fn element_text(el: ElementRef<'_>) -> String {
    collapse_whitespace(&el.text().collect::<String>())
}

fn parse_form(
    index: usize,
    form: ElementRef<'_>,
    base_url: &str,
    labels: &LabelIndex,
) -> FormDescriptor {
    let action = match form.value().attr("action").map(str::trim) {
        Some(a) if !a.is_empty() => resolve_url(base_url, a),
        _ => base_url.to_string(),
    };
    let method = FormMethod::from_attr(form.value().attr("method"));
    let enctype = attr(form, "enctype")
        .unwrap_or_else(|| "application/x-www-form-urlencoded".to_string());

    let mut fields = Vec::new();
    let mut hidden_fields = Vec::new();
    let mut submit_controls = Vec::new();

    for (position, control) in form.select(&selectors().control).enumerate() {
        let tag = control.value().name();
        match tag {
            "button" => {
                let input_type = InputType::from_attr(Some(
                    control.value().attr("type").unwrap_or("submit"),
                ));
                if input_type == InputType::Reset {
                    continue;
                }
                let input_type = if input_type == InputType::Submit {
                    InputType::Submit
                } else {
                    InputType::Button
                };
                submit_controls.push(SubmitControl {
                    position,
                    tag: "button".to_string(),
                    input_type,
                    name: attr(control, "name"),
                    value: control.value().attr("value").map(str::to_string),
                    text: element_text(control),
                });
            }
            "input" => {
                let input_type = InputType::from_attr(control.value().attr("type"));
                match input_type {
                    InputType::Hidden => {
                        if let Some(name) = attr(control, "name") {
                            hidden_fields.push(HiddenField {
                                name,
                                value: control.value().attr("value").unwrap_or("").to_string(),
                            });
                        }
                    }
                    InputType::Submit | InputType::Image | InputType::Button => {
                        let value = control.value().attr("value").map(str::to_string);
                        let text = value
                            .clone()
                            .or_else(|| attr(control, "alt"))
                            .unwrap_or_else(|| {
                                if input_type == InputType::Button {
                                    String::new()
                                } else {
                                    "Submit".to_string()
                                }
                            });
                        submit_controls.push(SubmitControl {
                            position,
                            tag: "input".to_string(),
                            input_type,
                            name: attr(control, "name"),
                            value,
                            text,
                        });
                    }
                    InputType::Reset => {}
                    _ => {
                        let n = fields.len();
                        fields.push(field_descriptor(
                            control,
                            position,
                            FieldTag::Input,
                            input_type,
                            n,
                            labels,
                        ))
                    }
                }
            }
            "textarea" => {
                let n = fields.len();
                let mut field = field_descriptor(
                    control,
                    position,
                    FieldTag::Textarea,
                    InputType::Textarea,
                    n,
                    labels,
                );
                let content = control.text().collect::<String>();
                field.value = Some(content).filter(|c| !c.is_empty());
                fields.push(field);
            }
            "select" => {
                let n = fields.len();
                let mut field = field_descriptor(
                    control,
                    position,
                    FieldTag::Select,
                    InputType::Select,
                    n,
                    labels,
                );
                field.options = control
                    .select(&selectors().option)
                    .map(|opt| {
                        let text = element_text(opt);
                        SelectOption {
                            value: opt
                                .value()
                                .attr("value")
                                .map(str::to_string)
                                .unwrap_or_else(|| text.clone()),
                            text,
                            selected: has_attr(opt, "selected"),
                        }
                    })
                    .collect();
                fields.push(field);
            }
            _ => {}
        }
    }

    FormDescriptor {
        index,
        id: attr(form, "id"),
        name: attr(form, "name"),
        action,
        method,
        enctype,
        fields,
        hidden_fields,
        submit_controls,
    }
}

fn field_descriptor(
    el: ElementRef<'_>,
    position: usize,
    tag: FieldTag,
    input_type: InputType,
    visible_index: usize,
    labels: &LabelIndex,
) -> FieldDescriptor {
    let name = attr(el, "name");
    let element_id = attr(el, "id");
    let identifier = element_id
        .clone()
        .or_else(|| name.clone())
        .unwrap_or_else(|| format!("field_{visible_index}"));

    FieldDescriptor {
        position,
        tag,
        input_type,
        identifier,
        label: labels.resolve(el),
        placeholder: attr(el, "placeholder"),
        value: el.value().attr("value").map(str::to_string),
        checked: has_attr(el, "checked"),
        required: has_attr(el, "required") || el.value().attr("aria-required") == Some("true"),
        disabled: has_attr(el, "disabled"),
        readonly: has_attr(el, "readonly"),
        constraints: FieldConstraints {
            pattern: el.value().attr("pattern").map(str::to_string),
            min_length: attr(el, "minlength").and_then(|v| v.parse().ok()),
            max_length: attr(el, "maxlength").and_then(|v| v.parse().ok()),
        },
        options: Vec::new(),
        name,
        element_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTACT: &str = r#"<html><head><title> Contact   us </title></head><body>
        <form id="contact" action="/send" method="post">
            <input type="hidden" name="csrf" value="tok123">
            <label for="name">Full name</label>
            <input id="name" name="full_name" required>
            <input type="email" name="email" placeholder="you@example.com" required>
            <input type="tel" name="phone" pattern="[0-9]+" maxlength="12">
            <select name="topic">
                <option value="">Choose</option>
                <option value="sales" selected>Sales</option>
                <option>Support</option>
            </select>
            <textarea name="message">Hi</textarea>
            <input type="checkbox" name="newsletter" value="yes" checked>
            <input type="reset">
            <input type="image" src="go.png" alt="Go">
            <button type="submit" name="action" value="send">Send message</button>
        </form>
        <form action="https://search.example.com/q"><input name="q"></form>
        </body></html>"#;

    #[test]
    fn test_parse_contact_form() {
        let forms = parse_forms(CONTACT, "https://example.com/contact/");
        assert_eq!(forms.len(), 2);

        let form = &forms[0];
        assert_eq!(form.action, "https://example.com/send");
        assert_eq!(form.method, FormMethod::Post);
        assert_eq!(form.enctype, "application/x-www-form-urlencoded");
        assert_eq!(
            form.hidden_fields,
            vec![HiddenField {
                name: "csrf".into(),
                value: "tok123".into()
            }]
        );

        let ids: Vec<&str> = form.fields.iter().map(|f| f.identifier.as_str()).collect();
        assert_eq!(ids, vec!["name", "email", "phone", "topic", "message", "newsletter"]);

        let name = &form.fields[0];
        assert_eq!(name.label, "Full name");
        assert_eq!(name.name.as_deref(), Some("full_name"));
        assert!(name.required);

        assert_eq!(form.fields[1].label, "you@example.com");
        assert_eq!(form.fields[2].constraints.pattern.as_deref(), Some("[0-9]+"));
        assert_eq!(form.fields[2].constraints.max_length, Some(12));

        let topic = &form.fields[3];
        assert_eq!(topic.input_type, InputType::Select);
        assert_eq!(topic.options.len(), 3);
        assert_eq!(topic.options[2].value, "Support");
        assert!(topic.options[1].selected);

        assert_eq!(form.fields[4].value.as_deref(), Some("Hi"));
        assert!(form.fields[5].checked);

        assert_eq!(form.submit_controls.len(), 2);
        assert_eq!(form.submit_controls[0].text, "Go");
        assert_eq!(form.submit_controls[1].text, "Send message");
        assert_eq!(form.submit_controls[1].name.as_deref(), Some("action"));
    }

    #[test]
    fn test_positions_follow_document_order() {
        let forms = parse_forms(CONTACT, "https://example.com/");
        let form = &forms[0];
        // hidden input occupies position 0
        assert_eq!(form.fields[0].position, 1);
        assert_eq!(form.fields[5].position, 6);
        assert_eq!(form.submit_controls[1].position, 9);
    }

    #[test]
    fn test_excluded_types_never_listed() {
        let html = r#"<form>
            <input type="hidden" name="h"><input type="submit"><input type="button" value="x">
            <input type="image"><input type="reset"><input name="keep">
        </form>"#;
        let form = extract_form(html, "https://example.com/", 0).unwrap();
        assert_eq!(form.fields.len(), 1);
        assert!(form.fields.iter().all(|f| !f.input_type.is_excluded()));
    }

    #[test]
    fn test_identifier_never_empty() {
        let html = r#"<form><input><input id=""><textarea></textarea><input name="n"></form>"#;
        let form = extract_form(html, "https://example.com/", 0).unwrap();
        let ids: Vec<&str> = form.fields.iter().map(|f| f.identifier.as_str()).collect();
        assert_eq!(ids, vec!["field_0", "field_1", "field_2", "n"]);
        assert!(form.fields.iter().all(|f| !f.identifier.is_empty()));
    }

    #[test]
    fn test_missing_action_targets_page() {
        let form = extract_form(CONTACT, "https://example.com/contact", 1).unwrap();
        assert_eq!(form.action, "https://search.example.com/q");
        assert_eq!(form.method, FormMethod::Get);

        let html = "<form><input name=a></form>";
        let form = extract_form(html, "https://example.com/page?x=1", 0).unwrap();
        assert_eq!(form.action, "https://example.com/page?x=1");
    }

    #[test]
    fn test_extraction_errors() {
        assert_eq!(
            extract_form("<p>nothing</p>", "https://example.com/", 0),
            Err(ExtractionError::NoFormsFound)
        );
        assert_eq!(
            extract_form(CONTACT, "https://example.com/", 5),
            Err(ExtractionError::FormIndexOutOfRange { index: 5, count: 2 })
        );
        assert!(matches!(
            extract_form("   ", "https://example.com/", 0),
            Err(ExtractionError::Unparsable(_))
        ));
    }

    #[test]
    fn test_page_title_and_type() {
        assert_eq!(page_title(CONTACT).as_deref(), Some("Contact us"));
        let forms = parse_forms(CONTACT, "https://example.com/");
        assert_eq!(page_type(CONTACT, &forms), PageType::ContactForm);
        assert_eq!(page_type("<p>hi</p>", &[]), PageType::NoForms);

        let login = r#"<form><input name="user"><input type="password" name="pw"></form>"#;
        let forms = parse_forms(login, "https://example.com/");
        assert_eq!(page_type(login, &forms), PageType::Login);
    }
}
