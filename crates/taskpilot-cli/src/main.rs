//! # taskpilot-cli
//!
//! Command-line interface for taskpilot.

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use taskpilot_agent::Copilot;
use taskpilot_core::Config;

mod commands;
mod repl;

/// Taskpilot - conversational copilot for project status, email drafts,
/// and daily planning
#[derive(Parser)]
#[command(name = "taskpilot")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Initial query to send (starts interactive mode after)
    #[arg(value_name = "QUERY")]
    query: Option<String>,

    /// Print mode - answer one query and exit (non-interactive)
    #[arg(short, long)]
    print: bool,

    /// Model to use (e.g. gemini-2.5-flash)
    #[arg(short, long)]
    model: Option<String>,

    /// Force demo mode (canned tracker and calendar data)
    #[arg(long)]
    demo: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show version information
    Version,
    /// Diagnose configuration and integration issues
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let mut config = Config::load_validated()?;
    if let Some(model) = &cli.model {
        config.general.model = model.clone();
    }
    if cli.demo {
        config.general.demo = true;
    }

    match cli.command {
        Some(Commands::Config { action }) => match action {
            ConfigAction::Show => commands::config::show(&config)?,
        },
        Some(Commands::Version) => {
            println!("taskpilot {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Doctor) => {
            commands::doctor::run(&config).await?;
        }
        None => {
            let mut copilot = Copilot::from_config(config).await?;

            if cli.print {
                let Some(query) = &cli.query else {
                    anyhow::bail!("Print mode requires a query");
                };
                let response = copilot.process(query).await?;
                println!("{}", response.text);
                for warning in &response.warnings {
                    eprintln!("warning: {warning}");
                }
            } else {
                repl::run(copilot, cli.query).await?;
            }
        }
    }

    Ok(())
}
