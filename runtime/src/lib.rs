// Copyright 2026 Formpilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Formpilot: web form automation engine.
//!
//! Probes pages for barriers, extracts form structure, matches caller data
//! onto fields, fills and submits through a plain-HTTP or a Chromium
//! strategy, and classifies the outcome. [`Engine`] is the entry point.

pub mod classify;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod matcher;
pub mod probe;
pub mod renderer;
pub mod submit;
pub mod suggest;
pub mod types;
pub mod util;
pub mod validate;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{ExtractionError, FetchError, MatchAmbiguous, SubmissionError};
pub use types::*;
