// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use rendition_runtime::cli::{self, output, RunArgs};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "rendition",
    about = "Rendition: prerender a built web app into static HTML",
    version,
    after_help = "Run 'rendition <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover routes, render them in Chromium and write static HTML
    Render(RunArgs),
    /// Print the resolved route set without writing anything
    Routes(RunArgs),
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

fn init_tracing(verbose: bool, json: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("rendition={level}").parse()?)
        .add_directive(format!("rendition_runtime={level}").parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
    Ok(())
}

async fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Render(args) => {
            let config = args.load_config()?;
            init_tracing(cli.verbose || config.verbose, cli.log_json)?;
            cli::render_cmd::run(&args, config).await
        }
        Commands::Routes(args) => {
            let config = args.load_config()?;
            init_tracing(cli.verbose || config.verbose, cli.log_json)?;
            cli::routes_cmd::run(&args, config).await
        }
        Commands::Doctor => {
            init_tracing(cli.verbose, cli.log_json)?;
            cli::doctor::run().await
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "rendition", &mut std::io::stdout());
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    output::init(output::OutputFlags {
        json: cli.json,
        quiet: cli.quiet,
        no_color: cli.no_color,
    });

    let result = dispatch(cli).await;

    // Consistent exit codes: 0=success, 1=error
    if let Err(e) = &result {
        if output::is_json() {
            output::print_json(&serde_json::json!({
                "error": true,
                "message": format!("{e:#}"),
            }));
        } else if !output::is_quiet() {
            eprintln!("  Error: {e:#}");
        }
        std::process::exit(1);
    }

    result
}
