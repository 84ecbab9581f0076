// Copyright 2026 Formpilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Human-readable and JSON rendering of command results (stdout).

use crate::suggest::FieldSuggestion;
use crate::types::{
    AccessibilityReport, FormDescriptor, PageAnalysis, SubmissionResult, ValidationReport,
};
use anyhow::Result;
use serde::Serialize;

/// Print `value` as pretty JSON, or through `human`.
pub fn emit<T: Serialize + ?Sized>(json: bool, value: &T, human: impl Fn(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        human(value);
    }
    Ok(())
}

fn mark(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "!!"
    }
}

fn list(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("  {title}:");
    for item in items {
        println!("    - {item}");
    }
}

pub fn print_probe(r: &AccessibilityReport) {
    println!("  [{}] {}", mark(r.reachable), r.url);
    if let Some(final_url) = r.final_url.as_deref().filter(|u| *u != r.url) {
        println!("  Final URL:   {final_url}");
    }
    if let Some(status) = r.status_code {
        println!("  Status:      {status}");
    }
    println!("  Strategy:    {}", r.strategy);
    println!("  Forms:       {}", r.forms_found);
    println!("  Load time:   {} ms", r.load_time_ms);
    println!(
        "  Probability: {:.2} ({})",
        r.success_probability,
        if r.accessible { "accessible" } else { "not accessible" }
    );
    if !r.barriers.is_empty() {
        let tags: Vec<String> = r.barriers.iter().map(|b| b.to_string()).collect();
        println!("  Barriers:    {}", tags.join(", "));
    }
    if let Some(err) = &r.error {
        println!("  Error:       {err}");
    }
    list("Recommendations", &r.recommendations);
}

pub fn print_analysis(a: &PageAnalysis) {
    println!("  {}", a.title.as_deref().unwrap_or("(untitled)"));
    println!("  Page type:   {:?}", a.page_type);
    for f in &a.forms {
        println!(
            "  Form {}: {:?} {} ({} fields, {} required{})",
            f.index,
            f.method,
            f.action,
            f.field_count,
            f.required_count,
            if f.has_file_upload { ", file upload" } else { "" }
        );
    }
    println!();
    print_probe(&a.accessibility);
}

pub fn print_form(form: &FormDescriptor) {
    println!("  Form {}: {:?} {}", form.index, form.method, form.action);
    for f in &form.fields {
        let flags = [
            (f.required, "required"),
            (f.disabled, "disabled"),
            (f.readonly, "readonly"),
        ]
        .iter()
        .filter(|(on, _)| *on)
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join(", ");
        println!(
            "    {:<24} {:<10} {}{}",
            f.identifier,
            f.input_type.as_str(),
            f.label,
            if flags.is_empty() {
                String::new()
            } else {
                format!(" [{flags}]")
            }
        );
        for o in &f.options {
            println!("        · {} ({})", o.text, o.value);
        }
    }
    if !form.hidden_fields.is_empty() {
        println!("    + {} hidden field(s)", form.hidden_fields.len());
    }
    for c in &form.submit_controls {
        println!("    > {} [{}]", c.text, c.input_type.as_str());
    }
}

pub fn print_suggestions(suggestions: &[FieldSuggestion]) {
    for s in suggestions {
        println!("  {} ({:?})", s.label, s.content_type);
        if !s.examples.is_empty() {
            println!("    e.g. {}", s.examples.join(" | "));
        }
        for c in &s.constraints {
            println!("    * {c}");
        }
        for b in &s.best_practices {
            println!("    tip: {b}");
        }
    }
}

pub fn print_validation(r: &ValidationReport) {
    println!(
        "  [{}] {} supplied key(s) matched ({:.0}%), {} field(s) in form",
        mark(r.valid),
        r.matched_fields,
        r.match_score * 100.0,
        r.total_fields
    );
    list("Issues", &r.issues);
    list("Warnings", &r.warnings);
    list("Suggestions", &r.suggestions);
}

pub fn print_submission(r: &SubmissionResult) {
    println!("  [{}] {}", mark(r.success), r.message);
    println!("  Score:       {} ({} attempt(s))", r.score, r.attempts);
    if let Some(strategy) = r.strategy {
        println!("  Strategy:    {strategy}");
    }
    if r.url_changed {
        println!("  Final URL:   {}", r.final_url);
    }
    println!(
        "  Fields:      {} filled, {} skipped, {} errored",
        r.fill.filled, r.fill.skipped, r.fill.errored
    );
    if let Some(c) = &r.confirmation {
        println!("  Confirmation: {c}");
    }
    list("Success indicators", &r.success_indicators);
    list("Error indicators", &r.error_indicators);
    list("Warnings", &r.warnings);
    list("Field errors", &r.fill.errors);
}
