// Copyright 2026 Formpilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Value types crossing the engine boundary.
//!
//! Everything here is produced fresh per call and is plain serializable
//! data. No engine-internal handle leaks out through these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Caller-supplied field data: key to value, keys unique and case-preserving.
pub type FieldData = BTreeMap<String, String>;

/// How page content is retrieved and interacted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStrategy {
    /// Direct HTTP request, no script execution.
    Lightweight,
    /// Scriptable rendering context (headless Chromium).
    Interactive,
}

impl FetchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStrategy::Lightweight => "lightweight",
            FetchStrategy::Interactive => "interactive",
        }
    }
}

impl fmt::Display for FetchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Element kind of a form control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldTag {
    Input,
    Textarea,
    Select,
}

/// Control subtype.
///
/// Unknown `type` attribute values fall back to `Text`, which is what
/// browsers do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InputType {
    Text,
    Email,
    Password,
    Url,
    Tel,
    Number,
    Search,
    Date,
    DatetimeLocal,
    Month,
    Week,
    Time,
    Color,
    Range,
    Checkbox,
    Radio,
    File,
    Hidden,
    Submit,
    Button,
    Image,
    Reset,
    Textarea,
    Select,
}

impl InputType {
    /// Parse an `<input type=...>` attribute value.
    pub fn from_attr(value: Option<&str>) -> InputType {
        let v = value.unwrap_or("text").trim().to_ascii_lowercase();
        match v.as_str() {
            "email" => InputType::Email,
            "password" => InputType::Password,
            "url" => InputType::Url,
            "tel" => InputType::Tel,
            "number" => InputType::Number,
            "search" => InputType::Search,
            "date" => InputType::Date,
            "datetime-local" => InputType::DatetimeLocal,
            "month" => InputType::Month,
            "week" => InputType::Week,
            "time" => InputType::Time,
            "color" => InputType::Color,
            "range" => InputType::Range,
            "checkbox" => InputType::Checkbox,
            "radio" => InputType::Radio,
            "file" => InputType::File,
            "hidden" => InputType::Hidden,
            "submit" => InputType::Submit,
            "button" => InputType::Button,
            "image" => InputType::Image,
            "reset" => InputType::Reset,
            _ => InputType::Text,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::Text => "text",
            InputType::Email => "email",
            InputType::Password => "password",
            InputType::Url => "url",
            InputType::Tel => "tel",
            InputType::Number => "number",
            InputType::Search => "search",
            InputType::Date => "date",
            InputType::DatetimeLocal => "datetime-local",
            InputType::Month => "month",
            InputType::Week => "week",
            InputType::Time => "time",
            InputType::Color => "color",
            InputType::Range => "range",
            InputType::Checkbox => "checkbox",
            InputType::Radio => "radio",
            InputType::File => "file",
            InputType::Hidden => "hidden",
            InputType::Submit => "submit",
            InputType::Button => "button",
            InputType::Image => "image",
            InputType::Reset => "reset",
            InputType::Textarea => "textarea",
            InputType::Select => "select",
        }
    }

    /// Subtypes never exposed in the visible field list.
    pub fn is_excluded(&self) -> bool {
        matches!(
            self,
            InputType::Hidden
                | InputType::Submit
                | InputType::Button
                | InputType::Image
                | InputType::Reset
        )
    }

    /// Subtypes that activate form submission when clicked.
    pub fn is_submit_like(&self) -> bool {
        matches!(self, InputType::Submit | InputType::Image)
    }

    /// Subtypes filled by clearing and typing.
    pub fn is_text_like(&self) -> bool {
        !matches!(
            self,
            InputType::Checkbox
                | InputType::Radio
                | InputType::File
                | InputType::Select
                | InputType::Hidden
                | InputType::Submit
                | InputType::Button
                | InputType::Image
                | InputType::Reset
        )
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `<option>` of a select field, in declared order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub text: String,
    pub selected: bool,
}

/// Validation metadata, captured verbatim from the markup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConstraints {
    pub pattern: Option<String>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

/// Structured metadata for one visible form control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Position among all controls of the form, in document order.
    /// Sessions address controls by this position.
    pub position: usize,
    pub tag: FieldTag,
    pub input_type: InputType,
    pub name: Option<String>,
    pub element_id: Option<String>,
    /// Element id, else name, else a positional fallback. Never empty.
    pub identifier: String,
    pub label: String,
    pub placeholder: Option<String>,
    /// The `value` attribute (checkbox and radio values, text defaults).
    pub value: Option<String>,
    /// Initial checked state of a checkbox or radio.
    pub checked: bool,
    pub required: bool,
    pub disabled: bool,
    pub readonly: bool,
    pub constraints: FieldConstraints,
    pub options: Vec<SelectOption>,
}

impl FieldDescriptor {
    /// Keys used for exact and case-insensitive matching, in priority order.
    pub fn primary_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::with_capacity(3);
        if let Some(id) = self.element_id.as_deref() {
            keys.push(id);
        }
        if let Some(name) = self.name.as_deref() {
            keys.push(name);
        }
        keys.push(&self.identifier);
        keys
    }

    /// Keys used by the containment layer (primary keys plus placeholder).
    pub fn containment_keys(&self) -> Vec<&str> {
        let mut keys = self.primary_keys();
        if let Some(p) = self.placeholder.as_deref() {
            keys.push(p);
        }
        keys.retain(|k| !k.is_empty());
        keys
    }

    /// Disabled, readonly and file fields are never written to.
    pub fn is_writable(&self) -> bool {
        !self.disabled && !self.readonly && self.input_type != InputType::File
    }
}

/// A hidden input whose name/value pair is replayed on submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiddenField {
    pub name: String,
    pub value: String,
}

/// A control that can trigger submission (submit input, image input, button).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitControl {
    pub position: usize,
    pub tag: String,
    pub input_type: InputType,
    pub name: Option<String>,
    pub value: Option<String>,
    /// Visible text (button content or input value).
    pub text: String,
}

/// HTTP method of a form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FormMethod {
    Get,
    Post,
}

impl FormMethod {
    pub fn from_attr(value: Option<&str>) -> FormMethod {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("post") => FormMethod::Post,
            _ => FormMethod::Get,
        }
    }
}

/// One form on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDescriptor {
    /// 0-based, stable only for one fetch of one page.
    pub index: usize,
    pub id: Option<String>,
    pub name: Option<String>,
    /// Absolute action target.
    pub action: String,
    pub method: FormMethod,
    pub enctype: String,
    pub fields: Vec<FieldDescriptor>,
    pub hidden_fields: Vec<HiddenField>,
    pub submit_controls: Vec<SubmitControl>,
}

impl FormDescriptor {
    pub fn field(&self, identifier: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.identifier == identifier)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.required)
    }

    pub fn has_file_upload(&self) -> bool {
        self.fields.iter().any(|f| f.input_type == InputType::File)
    }

    /// Whether the form posts `multipart/form-data`.
    pub fn is_multipart(&self) -> bool {
        self.enctype.trim().eq_ignore_ascii_case("multipart/form-data")
    }
}

/// A detected obstacle to automated interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Barrier {
    HttpError(u16),
    CaptchaDetected,
    ChallengePage,
    CredentialWall,
    AccessDenied,
    RateLimited,
    NoContent,
}

impl Barrier {
    /// Coarse tag used to look up a fallback penalty.
    pub fn family(&self) -> &'static str {
        match self {
            Barrier::HttpError(_) => "http_error",
            Barrier::CaptchaDetected => "captcha_detected",
            Barrier::ChallengePage => "challenge_page",
            Barrier::CredentialWall => "credential_wall",
            Barrier::AccessDenied => "access_denied",
            Barrier::RateLimited => "rate_limited",
            Barrier::NoContent => "no_content",
        }
    }
}

impl fmt::Display for Barrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Barrier::HttpError(code) => write!(f, "http_error_{code}"),
            other => f.write_str(other.family()),
        }
    }
}

impl FromStr for Barrier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(code) = s.strip_prefix("http_error_") {
            return code
                .parse::<u16>()
                .map(Barrier::HttpError)
                .map_err(|_| format!("invalid status in barrier tag: {s}"));
        }
        match s {
            "captcha_detected" => Ok(Barrier::CaptchaDetected),
            "challenge_page" => Ok(Barrier::ChallengePage),
            "credential_wall" => Ok(Barrier::CredentialWall),
            "access_denied" => Ok(Barrier::AccessDenied),
            "rate_limited" => Ok(Barrier::RateLimited),
            "no_content" => Ok(Barrier::NoContent),
            _ => Err(format!("unknown barrier tag: {s}")),
        }
    }
}

impl Serialize for Barrier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Barrier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Reachability and automation-readiness assessment of one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessibilityReport {
    pub url: String,
    pub final_url: Option<String>,
    pub reachable: bool,
    /// Score above the configured accessibility threshold.
    pub accessible: bool,
    pub status_code: Option<u16>,
    pub strategy: FetchStrategy,
    pub barriers: Vec<Barrier>,
    /// Likelihood that automated interaction succeeds, in [0, 1].
    pub success_probability: f32,
    pub recommendations: Vec<String>,
    pub forms_found: usize,
    pub load_time_ms: u64,
    pub error: Option<String>,
}

impl AccessibilityReport {
    pub fn is_accessible(&self, threshold: f32) -> bool {
        self.success_probability > threshold
    }
}

/// Counts of what happened while filling a form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillStats {
    pub filled: usize,
    pub skipped: usize,
    pub errored: usize,
    /// One line per errored field.
    pub errors: Vec<String>,
}

/// Outcome of a submit call, or of classifying one post-submission page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub success: bool,
    /// Evidence score in [0, 100].
    pub score: u32,
    /// `score` scaled to [0, 1].
    pub confidence: f32,
    pub original_url: String,
    pub final_url: String,
    pub url_changed: bool,
    pub success_indicators: Vec<String>,
    pub error_indicators: Vec<String>,
    pub confirmation: Option<String>,
    pub message: String,
    pub attempts: u32,
    pub strategy: Option<FetchStrategy>,
    pub fill: FillStats,
    pub warnings: Vec<String>,
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl SubmissionResult {
    /// A failed result carrying only a diagnostic.
    pub fn failed(url: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            success: false,
            score: 0,
            confidence: 0.0,
            original_url: url.to_string(),
            final_url: url.to_string(),
            url_changed: false,
            success_indicators: Vec::new(),
            error_indicators: Vec::new(),
            confirmation: None,
            error: Some(crate::util::truncate(&message, crate::util::MAX_DIAGNOSTIC_CHARS)),
            message,
            attempts: 0,
            strategy: None,
            fill: FillStats::default(),
            warnings: Vec::new(),
            elapsed_ms: 0,
        }
    }
}

/// One entry of the bounded attempt history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionAttempt {
    pub timestamp: DateTime<Utc>,
    /// Target URL, truncated.
    pub url: String,
    /// 1-based ordinal within one submit call.
    pub attempt: u32,
    pub success: bool,
    /// Error text, truncated.
    pub error: Option<String>,
    pub strategy: FetchStrategy,
    pub elapsed_ms: u64,
    pub field_count: usize,
}

/// Result of checking supplied data against a form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
    pub fields_checked: usize,
    /// Supplied keys that bound to some field.
    pub matched_fields: usize,
    pub total_fields: usize,
    /// `matched_fields` over supplied keys.
    pub match_score: f32,
}

/// Page classification by the forms it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    NoForms,
    JobApplication,
    ContactForm,
    Registration,
    Login,
    GeneralForm,
}

/// Short description of one form for page analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormSummary {
    pub index: usize,
    pub action: String,
    pub method: FormMethod,
    pub field_count: usize,
    pub required_count: usize,
    pub has_file_upload: bool,
    pub submit_controls: usize,
}

/// Overview of a page: type, forms and accessibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageAnalysis {
    pub url: String,
    pub title: Option<String>,
    pub page_type: PageType,
    pub forms: Vec<FormSummary>,
    pub accessibility: AccessibilityReport,
}

/// Aggregate view of the attempt history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub total: usize,
    pub recent: Vec<SubmissionAttempt>,
    pub success_rate: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_barrier_tags() {
        assert_eq!(Barrier::HttpError(403).to_string(), "http_error_403");
        assert_eq!(Barrier::CredentialWall.to_string(), "credential_wall");
        assert_eq!("http_error_429".parse::<Barrier>(), Ok(Barrier::HttpError(429)));
        assert_eq!("challenge_page".parse::<Barrier>(), Ok(Barrier::ChallengePage));
        assert!("nonsense".parse::<Barrier>().is_err());
    }

    #[test]
    fn test_barrier_serializes_as_tag() {
        let json = serde_json::to_string(&vec![Barrier::HttpError(403), Barrier::RateLimited])
            .unwrap();
        assert_eq!(json, r#"["http_error_403","rate_limited"]"#);
        let back: Vec<Barrier> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, vec![Barrier::HttpError(403), Barrier::RateLimited]);
    }

    #[test]
    fn test_input_type_parsing() {
        assert_eq!(InputType::from_attr(None), InputType::Text);
        assert_eq!(InputType::from_attr(Some("EMAIL")), InputType::Email);
        assert_eq!(InputType::from_attr(Some("fancy")), InputType::Text);
        assert!(InputType::Hidden.is_excluded());
        assert!(InputType::Reset.is_excluded());
        assert!(!InputType::Checkbox.is_excluded());
        assert!(InputType::Textarea.is_text_like());
        assert!(!InputType::Select.is_text_like());
    }

    #[test]
    fn test_form_method() {
        assert_eq!(FormMethod::from_attr(Some("post")), FormMethod::Post);
        assert_eq!(FormMethod::from_attr(Some("dialog")), FormMethod::Get);
        assert_eq!(FormMethod::from_attr(None), FormMethod::Get);
    }
}
