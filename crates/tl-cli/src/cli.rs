//! Command-line argument definitions.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use tl_core::git::DateRange;
use tl_core::{ProjectQuery, QueryError};

/// Developer activity timeline.
///
/// Reconstructs when you worked on a project from the logs your AI coding
/// tools, editor, and git already keep, and estimates hours from them.
#[derive(Debug, Parser)]
#[command(name = "tl", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Which project to report on.
///
/// Both are optional at the parser level so a missing selection can be
/// reported as a JSON error like every other failure.
#[derive(Debug, Clone, Args)]
pub struct ProjectArgs {
    /// Absolute path to the project (exact match).
    #[arg(long)]
    pub project_path: Option<String>,

    /// Case-insensitive substring match on the project's directory name.
    #[arg(long)]
    pub filter: Option<String>,
}

impl ProjectArgs {
    pub fn query(&self) -> Result<ProjectQuery, QueryError> {
        ProjectQuery::from_args(self.project_path.as_deref(), self.filter.as_deref())
    }
}

/// Inclusive date bounds.
#[derive(Debug, Clone, Args)]
pub struct DateArgs {
    /// First day to include (YYYY-MM-DD).
    #[arg(long)]
    pub since: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD).
    #[arg(long)]
    pub until: Option<NaiveDate>,
}

impl DateArgs {
    pub const fn range(&self) -> DateRange {
        DateRange {
            since: self.since,
            until: self.until,
        }
    }
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Count Claude Code prompts per day.
    Claude {
        #[command(flatten)]
        project: ProjectArgs,

        /// Claude data directory (default: ~/.claude).
        #[arg(long)]
        claude_dir: Option<PathBuf>,
    },

    /// Count Codex CLI prompts per day.
    Codex {
        #[command(flatten)]
        project: ProjectArgs,

        /// Codex data directory (default: ~/.codex).
        #[arg(long)]
        codex_dir: Option<PathBuf>,
    },

    /// Count Cursor prompts per day.
    Cursor {
        #[command(flatten)]
        project: ProjectArgs,

        /// Cursor `User` directory (default: platform location).
        #[arg(long)]
        cursor_dir: Option<PathBuf>,
    },

    /// Estimate work sessions and hours from git commits.
    Git {
        /// Path to the repository.
        repo: PathBuf,

        #[command(flatten)]
        dates: DateArgs,
    },

    /// Combine every tool into one timeline with estimated sessions.
    Timeline {
        #[command(flatten)]
        project: ProjectArgs,

        #[command(flatten)]
        dates: DateArgs,
    },

    /// Fetch coding time from WakaTime.
    Wakatime {
        /// First day (YYYY-MM-DD).
        #[arg(long)]
        start: NaiveDate,

        /// Last day (YYYY-MM-DD).
        #[arg(long)]
        end: NaiveDate,

        /// Restrict to one WakaTime project name.
        #[arg(long)]
        project: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_project_flags() {
        let cli = Cli::try_parse_from(["tl", "claude", "--project-path", "/work/app"]).unwrap();
        let Some(Commands::Claude { project, claude_dir }) = cli.command else {
            panic!("expected claude command");
        };
        assert_eq!(
            project.query(),
            Ok(ProjectQuery::Path("/work/app".to_string()))
        );
        assert!(claude_dir.is_none());
    }

    #[test]
    fn test_cli_accepts_missing_project_selection() {
        let cli = Cli::try_parse_from(["tl", "codex"]).unwrap();
        let Some(Commands::Codex { project, .. }) = cli.command else {
            panic!("expected codex command");
        };
        assert_eq!(project.query(), Err(QueryError::Missing));
    }

    #[test]
    fn test_cli_parses_dates() {
        let cli = Cli::try_parse_from(["tl", "-v", "git", "/repo", "--since", "2026-01-01"])
            .unwrap();
        assert!(cli.verbose);
        let Some(Commands::Git { repo, dates }) = cli.command else {
            panic!("expected git command");
        };
        assert_eq!(repo, PathBuf::from("/repo"));
        assert_eq!(dates.since, NaiveDate::from_ymd_opt(2026, 1, 1));
        assert!(dates.until.is_none());
    }

    #[test]
    fn test_cli_rejects_bad_date() {
        assert!(Cli::try_parse_from(["tl", "git", "/repo", "--until", "last week"]).is_err());
    }
}
