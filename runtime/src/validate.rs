// Copyright 2026 Formpilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pre-flight validation of supplied data against a form's constraints.
//!
//! Issues make the report invalid; warnings and suggestions never do. The
//! orchestrator surfaces all three without blocking a submission.

use crate::matcher::{bind_form, closest_key};
use crate::types::{FieldData, FieldDescriptor, FormDescriptor, InputType, ValidationReport};
use regex::Regex;
use std::collections::HashSet;

/// Check `data` against `form`.
pub fn validate_data(form: &FormDescriptor, data: &FieldData) -> ValidationReport {
    let binding = bind_form(form, data);
    let mut report = ValidationReport {
        fields_checked: form.fields.len(),
        total_fields: form.fields.len(),
        warnings: binding.warnings.clone(),
        ..ValidationReport::default()
    };

    let mut reported_groups: HashSet<&str> = HashSet::new();
    for (i, field) in form.fields.iter().enumerate() {
        if field.disabled {
            continue;
        }
        let value = binding.matches[i]
            .as_ref()
            .map(|m| m.value.as_str())
            .filter(|v| !v.trim().is_empty());

        if field.required && value.is_none() {
            if field.input_type == InputType::Radio {
                let group = field.name.as_deref().unwrap_or(&field.identifier);
                if radio_group_answered(form, &binding.matches, group)
                    || !reported_groups.insert(group)
                {
                    continue;
                }
            }
            report
                .issues
                .push(format!("Required field missing: {}", field.label));
            report
                .suggestions
                .push(format!("Provide value for: {}", field.identifier));
            continue;
        }

        if let Some(v) = value {
            let (issues, warnings) = check_value(field, v);
            report.issues.extend(issues);
            report.warnings.extend(warnings);
        }
    }

    let matched_keys = binding.matched_keys();
    let known: Vec<&str> = {
        let mut seen = HashSet::new();
        form.fields
            .iter()
            .flat_map(|f| f.primary_keys())
            .filter(|k| seen.insert(*k))
            .collect()
    };
    for key in data.keys() {
        if matched_keys.contains(key.as_str()) {
            continue;
        }
        match closest_key(key, &known) {
            Some(best) => report
                .suggestions
                .push(format!("'{key}' might be '{best}'")),
            None => report.warnings.push(format!("Unknown field: {key}")),
        }
    }

    report.matched_fields = matched_keys.len();
    report.match_score = report.matched_fields as f32 / data.len().max(1) as f32;
    report.valid = report.issues.is_empty();
    report
}

fn radio_group_answered(
    form: &FormDescriptor,
    matches: &[Option<crate::matcher::FieldMatch>],
    group: &str,
) -> bool {
    form.fields.iter().zip(matches).any(|(f, m)| {
        f.input_type == InputType::Radio
            && f.name.as_deref().unwrap_or(&f.identifier) == group
            && m.as_ref().is_some_and(|m| !m.value.trim().is_empty())
    })
}

/// Format and constraint checks for one supplied value.
///
/// Returns `(issues, warnings)`.
pub fn check_value(field: &FieldDescriptor, value: &str) -> (Vec<String>, Vec<String>) {
    let mut issues = Vec::new();
    let mut warnings = Vec::new();
    let label = &field.label;

    match field.input_type {
        InputType::Email => {
            let domain_ok = value
                .rsplit_once('@')
                .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
            if !domain_ok {
                issues.push(format!("{label}: Invalid email format"));
            }
        }
        InputType::Url => {
            if !(value.starts_with("http://")
                || value.starts_with("https://")
                || value.starts_with("www."))
            {
                issues.push(format!("{label}: Invalid URL format"));
            }
        }
        InputType::Tel => {
            let kept = value
                .chars()
                .filter(|c| c.is_ascii_digit() || "+-() ".contains(*c))
                .count();
            if kept < 7 {
                issues.push(format!("{label}: Phone number seems too short"));
            }
        }
        InputType::Select => {
            let known = field.options.iter().any(|o| {
                o.value.eq_ignore_ascii_case(value) || o.text.eq_ignore_ascii_case(value)
            });
            if !field.options.is_empty() && !known {
                warnings.push(format!("{label}: '{value}' is not one of the available options"));
            }
        }
        _ => {}
    }

    let len = value.chars().count();
    if let Some(max) = field.constraints.max_length {
        if len > max {
            issues.push(format!("{label}: Value too long (max {max} characters)"));
        }
    }
    if let Some(min) = field.constraints.min_length {
        if len < min {
            issues.push(format!("{label}: Value too short (min {min} characters)"));
        }
    }

    if let Some(pattern) = field.constraints.pattern.as_deref() {
        match Regex::new(&format!("^(?:{pattern})$")) {
            Ok(re) if !re.is_match(value) => {
                issues.push(format!("{label}: Value doesn't match required pattern"));
            }
            Ok(_) => {}
            Err(_) => warnings.push(format!("{label}: pattern '{pattern}' could not be checked")),
        }
    }

    (issues, warnings)
}
