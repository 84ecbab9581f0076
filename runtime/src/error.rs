// Copyright 2026 Formpilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy for the form engine.
//!
//! Every layer returns one of these typed errors. The engine's public
//! operations convert them into result objects carrying a truncated
//! diagnostic, so none of them escape past [`crate::engine::Engine`].

use thiserror::Error;

/// Failure of a fetch strategy (lightweight HTTP or interactive browser).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("could not create fetch context: {0}")]
    ContextCreation(String),

    #[error("navigation to {url} timed out after {timeout_ms}ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("{operation} is not supported by the {strategy} strategy")]
    Unsupported { strategy: String, operation: String },
}

impl FetchError {
    /// Stable machine-readable reason tag.
    pub fn reason(&self) -> &'static str {
        match self {
            FetchError::ContextCreation(_) => "context_creation",
            FetchError::NavigationTimeout { .. } => "navigation_timeout",
            FetchError::Navigation(_) => "navigation",
            FetchError::Network(_) => "network",
            FetchError::Timeout { .. } => "timeout",
            FetchError::Script(_) => "script",
            FetchError::ElementNotFound(_) => "element_not_found",
            FetchError::Unsupported { .. } => "unsupported",
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            FetchError::NavigationTimeout { .. } | FetchError::Timeout { .. }
        )
    }

    pub fn is_context_creation(&self) -> bool {
        matches!(self, FetchError::ContextCreation(_))
    }
}

/// Failure to produce a [`crate::types::FormDescriptor`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("No forms found on the page")]
    NoFormsFound,

    #[error("Form index {index} not found. Found {count} forms.")]
    FormIndexOutOfRange { index: usize, count: usize },

    #[error("unparsable content: {0}")]
    Unparsable(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl ExtractionError {
    pub fn code(&self) -> &'static str {
        match self {
            ExtractionError::NoFormsFound => "no_forms_found",
            ExtractionError::FormIndexOutOfRange { .. } => "form_index_out_of_range",
            ExtractionError::Unparsable(_) => "unparsable_content",
            ExtractionError::Fetch(_) => "fetch_failed",
        }
    }
}

/// More than one supplied key matched a field equally well.
///
/// Never fatal: the field resolves to "no match" and this is reported as a
/// warning.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("ambiguous match for field '{field}': candidates {candidates:?}")]
pub struct MatchAmbiguous {
    pub field: String,
    pub candidates: Vec<String>,
}

/// Failure of one fill-and-submit attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("navigation failed after retry: {0}")]
    Navigation(FetchError),

    #[error("{0}")]
    FormNotFound(ExtractionError),

    #[error("no submit tactic succeeded")]
    NoSubmitTactic,

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl SubmissionError {
    pub fn code(&self) -> &'static str {
        match self {
            SubmissionError::Navigation(_) => "navigation_failed",
            SubmissionError::FormNotFound(e) => e.code(),
            SubmissionError::NoSubmitTactic => "no_submit_tactic",
            SubmissionError::Fetch(e) => e.reason(),
        }
    }

    /// Whether another attempt with the same form index can help.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SubmissionError::FormNotFound(ExtractionError::FormIndexOutOfRange { .. })
        )
    }
}

pub type FetchResult<T> = Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_reasons_are_distinct() {
        let ctx = FetchError::ContextCreation("no browser".into());
        let nav = FetchError::NavigationTimeout {
            url: "https://example.com".into(),
            timeout_ms: 100,
        };
        assert_ne!(ctx.reason(), nav.reason());
        assert!(ctx.is_context_creation());
        assert!(!ctx.is_timeout());
        assert!(nav.is_timeout());
    }

    #[test]
    fn test_extraction_error_messages() {
        let err = ExtractionError::FormIndexOutOfRange { index: 3, count: 1 };
        assert_eq!(err.to_string(), "Form index 3 not found. Found 1 forms.");
        assert_eq!(err.code(), "form_index_out_of_range");
        assert_eq!(ExtractionError::NoFormsFound.code(), "no_forms_found");
    }

    #[test]
    fn test_index_out_of_range_is_terminal() {
        let err = SubmissionError::FormNotFound(ExtractionError::FormIndexOutOfRange {
            index: 2,
            count: 1,
        });
        assert!(err.is_terminal());
        assert!(!SubmissionError::NoSubmitTactic.is_terminal());
    }

    #[test]
    fn test_missing_forms_and_navigation_are_retryable() {
        assert!(!SubmissionError::FormNotFound(ExtractionError::NoFormsFound).is_terminal());
        let nav = SubmissionError::Navigation(FetchError::Network("connection refused".into()));
        assert!(!nav.is_terminal());
    }
}
