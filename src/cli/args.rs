//! CLI argument definitions.
//!
//! This module defines all CLI arguments using clap's derive macros.
//! The main entry point is the [`Cli`] struct.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Rehearse - run playbooks against pluggable runners.
#[derive(Debug, Parser)]
#[command(name = "rehearse")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a playbook against an environment
    Run(PlaybookArgs),

    /// Check that an environment supports every command of a playbook
    Check(PlaybookArgs),

    /// List registered runners and the commands they support
    Runners,
}

/// Playbook and environment selection.
#[derive(Debug, Clone, Args)]
pub struct PlaybookArgs {
    /// Playbook file (YAML)
    #[arg(short, long, env = "REHEARSE_PLAYBOOK")]
    pub playbook: PathBuf,

    /// Environment file (YAML)
    #[arg(short, long, env = "REHEARSE_ENVIRONMENT")]
    pub environment: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run() {
        let cli = Cli::parse_from(["rehearse", "run", "-p", "pb.yml", "-e", "env.yml"]);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.playbook, PathBuf::from("pb.yml"));
                assert_eq!(args.environment, PathBuf::from("env.yml"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn debug_is_global() {
        let cli = Cli::parse_from(["rehearse", "runners", "--debug"]);
        assert!(cli.debug);
        assert!(matches!(cli.command, Commands::Runners));
    }

    #[test]
    fn run_requires_files() {
        assert!(Cli::try_parse_from(["rehearse", "run"]).is_err());
    }
}
