// Copyright 2026 Formpilot Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::Parser;
use formpilot::cli::{self, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli::init_logging(cli.verbose, cli.log_json);
    let json = cli.json;

    // 0 = success, 1 = error or failed submission
    if let Err(e) = cli::run(cli).await {
        if json {
            println!(
                "{}",
                serde_json::json!({ "error": true, "message": format!("{e:#}") })
            );
        } else {
            eprintln!("  Error: {e:#}");
        }
        std::process::exit(1);
    }
    Ok(())
}
