// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! codejson-sync CLI - keeps code.json in step with the repository

use anyhow::Result;
use clap::builder::FalseyValueParser;
use clap::{Args, CommandFactory, Parser, Subcommand};
use codejson_sync::commands;
use codejson_sync::config::{Overrides, Settings};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "codejson-sync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(short, long, global = true, env = "CODEJSON_CONFIG")]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR", value_parser = FalseyValueParser::new())]
    no_color: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect, reconcile, validate and publish code.json
    Run(RunArgs),

    /// Validate a code.json file against the schema
    Validate {
        /// Manifest to check
        #[arg(default_value = "code.json")]
        path: PathBuf,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: clap_complete::Shell,
    },
}

#[derive(Args)]
struct RunArgs {
    /// Repository as owner/repo
    #[arg(long, env = "GITHUB_REPOSITORY")]
    repository: Option<String>,

    /// API access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Token allowed to push to the target branch
    #[arg(long, env = "ADMIN_TOKEN", hide_env_values = true)]
    admin_token: Option<String>,

    /// Target branch (repository default when omitted)
    #[arg(long, env = "BRANCH")]
    branch: Option<String>,

    /// Commit directly instead of opening a pull request
    #[arg(long, env = "SKIP_PR", value_parser = FalseyValueParser::new())]
    skip_pr: bool,

    /// Checkout directory
    #[arg(long, env = "GITHUB_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Manifest path relative to the workspace
    #[arg(long)]
    manifest: Option<String>,

    /// REST API base URL
    #[arg(long, env = "GITHUB_API_URL")]
    api_url: Option<String>,

    /// Triggering CI event
    #[arg(long, env = "GITHUB_EVENT_NAME")]
    event_name: Option<String>,

    /// Write the manifest to this file instead of publishing it
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// CI step output file
    #[arg(long, env = "GITHUB_OUTPUT", hide = true)]
    step_output: Option<PathBuf>,
}

impl RunArgs {
    fn into_overrides(self, config_file: Option<PathBuf>) -> Overrides {
        Overrides {
            config_file,
            repository: self.repository,
            token: self.token,
            admin_token: self.admin_token,
            branch: self.branch,
            skip_pr: self.skip_pr.then_some(true),
            workspace: self.workspace,
            manifest_path: self.manifest,
            api_url: self.api_url,
            event_name: self.event_name,
            output: self.output,
            step_output: self.step_output,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color)
        .with_target(false)
        .init();

    let color = !cli.no_color;

    // Execute command
    match cli.command {
        Commands::Run(args) => {
            let settings = Settings::load(&args.into_overrides(cli.config))?;
            commands::run::run(&settings, cli.json, color).await
        }
        Commands::Validate { path } => commands::validate::run(&path, cli.json, color).await,
        Commands::Completions { shell } => {
            commands::completions::run(shell, &mut Cli::command())
        }
    }
}
