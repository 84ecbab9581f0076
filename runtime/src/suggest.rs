// Copyright 2026 Formpilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Content hints for a single field: what kind of value it expects,
//! examples, constraints and practical advice.

use crate::types::{FieldDescriptor, InputType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Email,
    Phone,
    Url,
    CoverLetter,
    Selection,
    ExperienceYears,
    Salary,
    FreeText,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSuggestion {
    pub identifier: String,
    pub label: String,
    pub content_type: ContentType,
    pub examples: Vec<String>,
    pub constraints: Vec<String>,
    pub best_practices: Vec<String>,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Describe what a field expects.
pub fn suggest_for_field(field: &FieldDescriptor) -> FieldSuggestion {
    let name = field.name.as_deref().unwrap_or(&field.identifier).to_lowercase();
    let label = field.label.to_lowercase();
    let mentions = |words: &[&str]| words.iter().any(|w| name.contains(w) || label.contains(w));

    let (content_type, examples, mut constraints, best_practices) = match field.input_type {
        InputType::Email => (
            ContentType::Email,
            owned(&["jane.doe@example.com"]),
            owned(&["Must be a valid email address"]),
            owned(&["Use an address you check regularly"]),
        ),
        InputType::Tel => phone(),
        _ if mentions(&["phone", "mobile"]) => phone(),
        InputType::Url => (
            ContentType::Url,
            owned(&["https://example.com"]),
            owned(&["Must start with http://, https:// or www."]),
            owned(&["Link to a page you control"]),
        ),
        InputType::Textarea if mentions(&["cover", "letter", "motivation", "why"]) => (
            ContentType::CoverLetter,
            owned(&["Dear Hiring Manager, I am excited to apply..."]),
            Vec::new(),
            owned(&["Personalize for the specific role", "Highlight relevant experience"]),
        ),
        InputType::Select => (
            ContentType::Selection,
            field
                .options
                .iter()
                .filter(|o| !o.value.is_empty())
                .map(|o| o.text.clone())
                .collect(),
            owned(&["Must choose from available options"]),
            owned(&["Choose the option that best matches the profile"]),
        ),
        _ if mentions(&["experience", "years"]) => (
            ContentType::ExperienceYears,
            owned(&["3-5 years", "5+ years", "Entry level"]),
            owned(&["Should match actual experience"]),
            owned(&["Be honest about experience level"]),
        ),
        _ if mentions(&["salary", "compensation"]) => (
            ContentType::Salary,
            owned(&["$80,000", "$70,000 - $90,000", "Negotiable"]),
            owned(&["Research market rates"]),
            owned(&["Consider location and experience level"]),
        ),
        InputType::Textarea | InputType::Text => (
            ContentType::FreeText,
            field.placeholder.iter().cloned().collect(),
            Vec::new(),
            Vec::new(),
        ),
        _ => (ContentType::Unknown, Vec::new(), Vec::new(), Vec::new()),
    };

    if field.required {
        constraints.push("Required".to_string());
    }
    if let Some(max) = field.constraints.max_length {
        constraints.push(format!("Max length: {max}"));
    }
    if let Some(min) = field.constraints.min_length {
        constraints.push(format!("Min length: {min}"));
    }
    if let Some(pattern) = &field.constraints.pattern {
        constraints.push(format!("Must match pattern: {pattern}"));
    }

    FieldSuggestion {
        identifier: field.identifier.clone(),
        label: field.label.clone(),
        content_type,
        examples,
        constraints,
        best_practices,
    }
}

fn phone() -> (ContentType, Vec<String>, Vec<String>, Vec<String>) {
    (
        ContentType::Phone,
        owned(&["(555) 123-4567", "+1-555-123-4567"]),
        owned(&["Include area code"]),
        owned(&["Use a consistent format"]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_form;

    fn fields() -> Vec<FieldDescriptor> {
        let html = r#"<form>
            <input type="email" name="email">
            <input name="mobile_number">
            <textarea name="cover_letter" maxlength="2000" required></textarea>
            <select name="level"><option value="">Pick</option><option value="jr">Junior</option></select>
            <input name="years_experience">
            <input type="number" name="expected_salary">
            <input type="date" name="start">
        </form>"#;
        extract_form(html, "https://example.com/", 0).unwrap().fields
    }

    #[test]
    fn test_content_types() {
        let types: Vec<ContentType> = fields().iter().map(|f| suggest_for_field(f).content_type).collect();
        assert_eq!(
            types,
            vec![
                ContentType::Email,
                ContentType::Phone,
                ContentType::CoverLetter,
                ContentType::Selection,
                ContentType::ExperienceYears,
                ContentType::Salary,
                ContentType::Unknown,
            ]
        );
    }

    #[test]
    fn test_constraints_and_options() {
        let fs = fields();
        let cover = suggest_for_field(&fs[2]);
        assert!(cover.constraints.contains(&"Required".to_string()));
        assert!(cover.constraints.contains(&"Max length: 2000".to_string()));

        let level = suggest_for_field(&fs[3]);
        assert_eq!(level.examples, vec!["Junior".to_string()]);
    }
}
