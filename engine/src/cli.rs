//! CLI interface for Agrocrew
//!
//! This module provides the command-line interface using clap's derive API.
//! It defines all commands and global flags for running crews.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::crew::UnknownToolPolicy;

/// Agrocrew task-execution engine
///
/// Runs declarative crews of tasks, each dispatching named tools and feeding
/// its output to later tasks.
#[derive(Parser, Debug)]
#[command(name = "agrocrew")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Crew document selection shared by every command
#[derive(clap::Args, Debug, Clone, Default)]
pub struct CrewArgs {
    /// Agents document (overrides the settings file)
    #[arg(long, value_name = "PATH")]
    pub agents: Option<PathBuf>,

    /// Tasks document (overrides the settings file)
    #[arg(long, value_name = "PATH")]
    pub tasks: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a crew and print every task's output
    Run {
        #[command(flatten)]
        crew: CrewArgs,

        /// Image to analyse (repeatable); sets `image_paths` on tasks that declare it
        #[arg(long = "image", value_name = "PATH")]
        images: Vec<PathBuf>,

        /// Analyse every .jpg/.jpeg/.png in a directory
        #[arg(long, value_name = "DIR")]
        image_dir: Option<PathBuf>,

        /// Override a task input parameter (repeatable); values parse as JSON, else string
        #[arg(long = "set", value_name = "KEY=VALUE")]
        overrides: Vec<String>,

        /// Behaviour for tools that are not registered
        #[arg(long, value_enum)]
        unknown_tool: Option<UnknownToolPolicy>,
    },

    /// List the crew's agents and tasks
    Tasks {
        #[command(flatten)]
        crew: CrewArgs,
    },

    /// Check the crew against the registered tools
    Validate {
        #[command(flatten)]
        crew: CrewArgs,
    },

    /// List registered tools
    Tools,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_overrides() {
        let cli = Cli::parse_from([
            "agrocrew",
            "--json",
            "run",
            "--tasks",
            "tasks.yaml",
            "--image",
            "a.png",
            "--image",
            "b.png",
            "--set",
            "threshold=0.5",
            "--unknown-tool",
            "fail",
        ]);

        assert!(cli.json);
        match cli.command {
            Command::Run {
                crew,
                images,
                overrides,
                unknown_tool,
                ..
            } => {
                assert_eq!(crew.tasks, Some(PathBuf::from("tasks.yaml")));
                assert_eq!(images.len(), 2);
                assert_eq!(overrides, vec!["threshold=0.5".to_string()]);
                assert_eq!(unknown_tool, Some(UnknownToolPolicy::Fail));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["agrocrew", "tools", "--log", "debug"]);
        assert_eq!(cli.log.as_deref(), Some("debug"));
        assert!(matches!(cli.command, Command::Tools));
    }
}
