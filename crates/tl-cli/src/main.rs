use std::io::Write;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tl_cli::commands::{claude, codex, cursor, git, timeline, util, wakatime};
use tl_cli::{Cli, Commands, Config};

fn run<W: Write>(cli: &Cli, writer: &mut W) -> Result<()> {
    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config =
        Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    match command {
        Commands::Claude {
            project,
            claude_dir,
        } => {
            let dir = claude_dir.as_deref().unwrap_or(&config.claude_dir);
            claude::run(writer, dir, &project.query()?)
        }
        Commands::Codex { project, codex_dir } => {
            let dir = codex_dir.as_deref().unwrap_or(&config.codex_dir);
            codex::run(writer, dir, &project.query()?)
        }
        Commands::Cursor {
            project,
            cursor_dir,
        } => {
            let dir = cursor_dir.as_deref().unwrap_or(&config.cursor_dir);
            cursor::run(writer, dir, &project.query()?)
        }
        Commands::Git { repo, dates } => git::run(writer, repo, &dates.range(), &config.clustering),
        Commands::Timeline { project, dates } => {
            timeline::run(writer, &config, &project.query()?, &dates.range())
        }
        Commands::Wakatime {
            start,
            end,
            project,
        } => wakatime::run(writer, &config, *start, *end, project.as_deref()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support; stdout carries only JSON
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let stdout = std::io::stdout();
    let mut writer = stdout.lock();

    match run(&cli, &mut writer) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::debug!(error = ?error, "command failed");
            if let Err(e) = util::write_error(&mut writer, &error) {
                eprintln!("error: {error:#} ({e})");
            }
            ExitCode::FAILURE
        }
    }
}
