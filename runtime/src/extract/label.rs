// Copyright 2026 Formpilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Layered label resolution.
//!
//! Order, first non-empty wins: `<label for=id>` or a wrapping `<label>`,
//! `aria-label`, `placeholder`, then the humanized name or id.

use scraper::{ElementRef, Html, Node, Selector};
use std::collections::HashMap;

/// Label text keyed by the `for` attribute, first label wins.
pub struct LabelIndex {
    by_for: HashMap<String, String>,
}

impl LabelIndex {
    pub fn build(document: &Html) -> Self {
        let mut by_for = HashMap::new();
        if let Ok(sel) = Selector::parse("label[for]") {
            for label in document.select(&sel) {
                let Some(target) = label.value().attr("for") else {
                    continue;
                };
                let text = label_text(label);
                if !text.is_empty() {
                    by_for.entry(target.to_string()).or_insert(text);
                }
            }
        }
        Self { by_for }
    }

    /// Resolve the label of one control.
    pub fn resolve(&self, control: ElementRef<'_>) -> String {
        let attr = |name: &str| {
            control
                .value()
                .attr(name)
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        if let Some(text) = attr("id").and_then(|id| self.by_for.get(id)) {
            return text.clone();
        }
        if let Some(text) = wrapping_label(control) {
            return text;
        }
        if let Some(aria) = attr("aria-label") {
            return aria.to_string();
        }
        if let Some(placeholder) = attr("placeholder") {
            return placeholder.to_string();
        }
        attr("name")
            .or_else(|| attr("id"))
            .map(humanize)
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "Unnamed field".to_string())
    }
}

fn wrapping_label(control: ElementRef<'_>) -> Option<String> {
    control
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "label")
        .map(label_text)
        .filter(|t| !t.is_empty())
}

/// Text of a label, ignoring nested option/textarea content and the
/// trailing required marker.
fn label_text(label: ElementRef<'_>) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for node in label.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let inside_control = node
            .ancestors()
            .take_while(|a| a.id() != label.id())
            .any(|a| match a.value() {
                Node::Element(e) => matches!(e.name(), "select" | "option" | "textarea"),
                _ => false,
            });
        if !inside_control {
            parts.push(text);
        }
    }
    let joined = crate::util::collapse_whitespace(&parts.concat());
    joined
        .trim_end_matches(|c: char| c == '*' || c == ':' || c.is_whitespace())
        .to_string()
}

/// `user_email` → "User Email", `firstName` → "First Name",
/// `contact-URLField` → "Contact Url Field".
pub fn humanize(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut spaced = String::with_capacity(raw.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c == '.' {
            spaced.push(' ');
            continue;
        }
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower)
            {
                spaced.push(' ');
            }
        }
        spaced.push(c);
    }

    spaced
        .split_whitespace()
        .map(|word| {
            let mut cs = word.chars();
            match cs.next() {
                Some(first) => first.to_uppercase().chain(cs.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
