// Copyright 2026 Formpilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Small text and URL helpers shared across stages.

use scraper::{ElementRef, Html, Node};

/// Ceiling for URLs and error text crossing the engine boundary.
pub const MAX_DIAGNOSTIC_CHARS: usize = 200;

/// Truncate to at most `max` characters without splitting a code point.
pub fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Resolve a possibly-relative URL against a base URL.
pub fn resolve_url(base: &str, relative: &str) -> String {
    if relative.starts_with("http://") || relative.starts_with("https://") {
        return relative.to_string();
    }
    match url::Url::parse(base) {
        Ok(base_url) => base_url
            .join(relative)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| relative.to_string()),
        Err(_) => relative.to_string(),
    }
}

/// Compare two URLs ignoring fragment and a trailing slash.
pub fn same_url(a: &str, b: &str) -> bool {
    normalize_url(a) == normalize_url(b)
}

fn normalize_url(raw: &str) -> String {
    let mut s = match url::Url::parse(raw) {
        Ok(mut u) => {
            u.set_fragment(None);
            u.to_string()
        }
        Err(_) => raw.to_string(),
    };
    while s.ends_with('/') {
        s.pop();
    }
    s
}

/// Elements that start a new line of rendered text.
const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "br", "dd", "details", "dialog", "div",
    "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2", "h3", "h4",
    "h5", "h6", "head", "header", "hr", "html", "label", "legend", "li", "main", "nav", "ol",
    "option", "p", "pre", "section", "summary", "table", "td", "th", "title", "tr", "ul",
];

const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Human-visible text of a document, one block per line.
///
/// Inline markup inside a block (`<strong>`, `<a>`, `<span>`) stays on the
/// block's line. Script, style, noscript and template content is dropped.
pub fn visible_text(html: &str) -> String {
    let doc = Html::parse_document(html);
    let mut lines = TextLines::default();
    lines.walk(doc.root_element());
    lines.flush();
    lines.done.join("\n")
}

#[derive(Default)]
struct TextLines {
    current: String,
    done: Vec<String>,
}

impl TextLines {
    fn walk(&mut self, el: ElementRef<'_>) {
        let name = el.value().name();
        if HIDDEN_ELEMENTS.contains(&name) {
            return;
        }
        let block = BLOCK_ELEMENTS.contains(&name);
        if block {
            self.flush();
        }
        for child in el.children() {
            match child.value() {
                Node::Text(text) => self.current.push_str(text),
                Node::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        self.walk(child_el);
                    }
                }
                _ => {}
            }
        }
        if block {
            self.flush();
        }
    }

    fn flush(&mut self) {
        let line = collapse_whitespace(&self.current);
        if !line.is_empty() {
            self.done.push(line);
        }
        self.current.clear();
    }
}

/// Collapse runs of whitespace into single spaces.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
