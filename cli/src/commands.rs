//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

/// CLI arguments for conductor
#[derive(Parser, Debug)]
#[command(name = "conductor")]
#[command(author, version, about = "Inspect the conductor agent orchestration core offline")]
#[command(long_about = r#"
conductor classifies messages, routes them, plans multi-step work for
specialised workers and asks before anything risky runs. This binary runs
the pure core offline, without an LLM: fast-path classification, template
plans and the heuristic summarizer.

Configuration files are loaded from (in priority order):
1. CONDUCTOR_* environment variables (e.g. CONDUCTOR_EXECUTOR__MAX_PARALLELISM=8)
2. --config <path>     Explicit config file
3. ./conductor.toml    Project-level config
4. ~/.config/conductor/config.toml   Global config

Example:
  conductor classify "refactor the parser function"
  conductor route --pending 1 "yes"
  conductor plan-check plan.json
  conductor compact history.json
  echo "/status" | conductor session
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also write logs to a daily-rotated file in this directory
    #[arg(long, value_name = "DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Classify a message with the fast-path rules
    Classify {
        /// Message text
        text: String,

        /// Confirmations currently pending in the session
        #[arg(long, default_value_t = 0)]
        pending: usize,

        /// Estimated tokens already in the conversation
        #[arg(long, default_value_t = 0)]
        history_tokens: usize,
    },

    /// Classify a message and show the handler it is routed to
    Route {
        /// Message text
        text: String,

        /// Confirmations currently pending in the session
        #[arg(long, default_value_t = 0)]
        pending: usize,
    },

    /// Parse and validate a plan, then show its dependency levels
    PlanCheck {
        /// Plan file (JSON or model output containing JSON); `-` reads stdin
        #[arg(required_unless_present = "template")]
        file: Option<PathBuf>,

        /// Show the built-in template for a category instead
        #[arg(long, value_name = "CATEGORY")]
        template: Option<String>,
    },

    /// Compact a conversation stored as a JSON array of messages
    Compact {
        /// Message file; `-` reads stdin
        file: PathBuf,

        /// Session id recorded with the summary
        #[arg(long, default_value = "cli")]
        session: String,

        /// Append the summary to the configured compaction log
        #[arg(long)]
        persist: bool,
    },

    /// Run messages from stdin through one offline session, line by line
    Session {
        /// Session id
        #[arg(long, default_value = "cli")]
        session: String,
    },

    /// Show configuration sources and the effective configuration
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_classify_with_globals() {
        let cli = Cli::parse_from([
            "conductor", "-vv", "classify", "hi", "--pending", "2", "-o", "json",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.output, OutputFormat::Json);
        match cli.command {
            Command::Classify { text, pending, .. } => {
                assert_eq!(text, "hi");
                assert_eq!(pending, 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_plan_check_needs_file_or_template() {
        assert!(Cli::try_parse_from(["conductor", "plan-check"]).is_err());
        assert!(Cli::try_parse_from(["conductor", "plan-check", "--template", "research"]).is_ok());
    }
}
