// Copyright 2026 Formpilot Contributors
// SPDX-License-Identifier: Apache-2.0

//! Command-line shell over the engine.

pub mod output;

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::{NoopRenderer, Renderer};
use crate::types::FieldData;
use anyhow::{bail, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "formpilot",
    about = "Probe, extract, fill and submit web forms",
    version,
    after_help = "Run 'formpilot <command> --help' for details on each command."
)]
pub struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Never launch Chromium; use plain HTTP only
    #[arg(long, global = true)]
    pub http_only: bool,

    /// Path to a JSON config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check whether a page is reachable and automatable
    Probe {
        /// Page URL
        url: String,
    },
    /// Classify a page and summarize its forms
    Analyze {
        /// Page URL
        url: String,
    },
    /// Describe the fields of one form
    Extract {
        /// Page URL
        url: String,
        /// 0-based form index
        #[arg(long, default_value = "0")]
        form: usize,
    },
    /// Show what each field of a form expects
    Suggest {
        /// Page URL
        url: String,
        /// 0-based form index
        #[arg(long, default_value = "0")]
        form: usize,
    },
    /// Check field data against a form without submitting
    Validate {
        /// Page URL
        url: String,
        #[command(flatten)]
        input: FormInput,
    },
    /// Fill and submit a form
    Submit {
        /// Page URL
        url: String,
        #[command(flatten)]
        input: FormInput,
        /// Maximum attempts (defaults to the configured value)
        #[arg(long)]
        retries: Option<u32>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

/// Form selection plus field data.
#[derive(Args)]
pub struct FormInput {
    /// 0-based form index
    #[arg(long, default_value = "0")]
    pub form: usize,

    /// Field value as key=value. Can be repeated.
    #[arg(long = "data", short = 'd')]
    pub pairs: Vec<String>,

    /// JSON file holding an object of field values
    #[arg(long)]
    pub data_file: Option<PathBuf>,
}

impl FormInput {
    /// Merge the data file with `--data` pairs; pairs win.
    pub fn field_data(&self) -> Result<FieldData> {
        let mut data = match &self.data_file {
            Some(path) => read_data_file(path)?,
            None => FieldData::new(),
        };
        for pair in &self.pairs {
            let (key, value) = parse_pair(pair)?;
            data.insert(key, value);
        }
        Ok(data)
    }
}

/// Parse a `key=value` argument. The value may contain `=`.
pub fn parse_pair(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => bail!("invalid field data '{raw}': expected key=value"),
    }
}

fn read_data_file(path: &Path) -> Result<FieldData> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read data file {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("invalid data file {}", path.display()))?;
    let Some(object) = value.as_object() else {
        bail!("data file {} must hold a JSON object", path.display());
    };
    Ok(object
        .iter()
        .map(|(k, v)| {
            let value = match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), value)
        })
        .collect())
}

/// Install the tracing subscriber. Logs go to stderr.
pub fn init_logging(verbose: bool, log_json: bool) {
    let default = if verbose { "formpilot=debug" } else { "formpilot=info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn build_renderer(config: &EngineConfig, http_only: bool) -> Arc<dyn Renderer> {
    if http_only {
        return Arc::new(NoopRenderer);
    }
    match ChromiumRenderer::new(&config.browser, &config.user_agent).await {
        Ok(r) => Arc::new(r),
        Err(e) => {
            tracing::warn!("{e}; continuing with HTTP only");
            Arc::new(NoopRenderer)
        }
    }
}

/// Execute a parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "formpilot", &mut std::io::stdout());
        return Ok(());
    }

    let config = EngineConfig::load(cli.config.as_deref())?;
    let renderer = build_renderer(&config, cli.http_only).await;
    let engine = Engine::new(config, renderer);
    let json = cli.json;

    let result = dispatch(&engine, cli.command, json).await;
    engine.close().await;
    result
}

async fn dispatch(engine: &Engine, command: Commands, json: bool) -> Result<()> {
    match command {
        Commands::Probe { url } => {
            let report = engine.probe(&url).await;
            output::emit(json, &report, output::print_probe)
        }
        Commands::Analyze { url } => {
            let analysis = engine.analyze(&url).await;
            output::emit(json, &analysis, output::print_analysis)
        }
        Commands::Extract { url, form } => {
            let descriptor = engine.extract_form(&url, form).await?;
            output::emit(json, &descriptor, output::print_form)
        }
        Commands::Suggest { url, form } => {
            let suggestions = engine.suggest(&url, form).await?;
            output::emit(json, suggestions.as_slice(), output::print_suggestions)
        }
        Commands::Validate { url, input } => {
            let data = input.field_data()?;
            let report = engine.validate(&url, input.form, &data).await;
            output::emit(json, &report, output::print_validation)?;
            if !report.valid {
                bail!("validation found {} issue(s)", report.issues.len());
            }
            Ok(())
        }
        Commands::Submit {
            url,
            input,
            retries,
        } => {
            let data = input.field_data()?;
            let retries = retries.unwrap_or(engine.config().submit.max_retries);
            let result = engine.submit(&url, input.form, &data, retries).await;
            output::emit(json, &result, output::print_submission)?;
            if !result.success {
                bail!("{}", result.message);
            }
            Ok(())
        }
        Commands::Completions { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_pair() {
        assert_eq!(
            parse_pair("email=a@b.co").unwrap(),
            ("email".to_string(), "a@b.co".to_string())
        );
        assert_eq!(
            parse_pair("q=a=b").unwrap(),
            ("q".to_string(), "a=b".to_string())
        );
        assert!(parse_pair("novalue").is_err());
        assert!(parse_pair("=x").is_err());
    }

    #[test]
    fn test_field_data_merges_file_and_pairs() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"name": "Ada", "age": 36, "email": "old@example.com"}}"#).unwrap();
        let input = FormInput {
            form: 0,
            pairs: vec!["email=ada@example.com".into()],
            data_file: Some(file.path().to_path_buf()),
        };
        let data = input.field_data().unwrap();
        assert_eq!(data["name"], "Ada");
        assert_eq!(data["age"], "36");
        assert_eq!(data["email"], "ada@example.com");
    }

    #[test]
    fn test_cli_parses_submit() {
        let cli = Cli::try_parse_from([
            "formpilot",
            "--json",
            "submit",
            "https://example.com/contact",
            "--form",
            "1",
            "-d",
            "name=Ada",
            "--retries",
            "2",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Commands::Submit {
                url,
                input,
                retries,
            } => {
                assert_eq!(url, "https://example.com/contact");
                assert_eq!(input.form, 1);
                assert_eq!(input.pairs, vec!["name=Ada".to_string()]);
                assert_eq!(retries, Some(2));
            }
            _ => panic!("expected submit"),
        }
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
