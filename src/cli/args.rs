//! CLI argument definitions.
//!
//! All Clap derive structs for `vigil` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

// ============================================================================
// Root CLI
// ============================================================================

/// Sequence and phase detection engine for game server anti-cheat.
#[derive(Parser, Debug)]
#[command(name = "vigil", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log output format.
    #[arg(long, default_value = "human", global = true, env = "VIGIL_LOG_FORMAT")]
    pub log_format: OutputFormat,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "VIGIL_COLOR")]
    pub color: ColorChoice,
}

// ============================================================================
// Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate engine configuration files.
    Validate(ValidateArgs),

    /// Replay recorded domain events through the configured detections.
    Replay(ReplayArgs),
}

/// Arguments for `vigil validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Configuration files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Treat warnings as errors.
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for `vigil replay`.
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Engine configuration file.
    #[arg(short, long, env = "VIGIL_CONFIG")]
    pub config: PathBuf,

    /// Domain events, one JSON object per line.
    #[arg(short, long)]
    pub events: PathBuf,

    /// Prior punishment records as a JSON array.
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Write the event stream to a file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Expose Prometheus metrics on 127.0.0.1:<PORT> while replaying.
    #[arg(long, env = "VIGIL_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

// ============================================================================
// Value Enums
// ============================================================================

/// Log output format.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// Newline-delimited JSON.
    Json,
}

/// Color output control.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_multiple_files() {
        let cli = Cli::try_parse_from(["vigil", "validate", "a.yaml", "b.yaml"]).unwrap();
        let Commands::Validate(args) = cli.command else {
            panic!("expected validate");
        };
        assert_eq!(args.files.len(), 2);
        assert!(!args.strict);
    }

    #[test]
    fn test_validate_requires_file() {
        assert!(Cli::try_parse_from(["vigil", "validate"]).is_err());
    }

    #[test]
    fn test_replay_args() {
        let cli = Cli::try_parse_from([
            "vigil",
            "replay",
            "--config",
            "vigil.yaml",
            "--events",
            "events.jsonl",
            "--history",
            "history.json",
            "--metrics-port",
            "9100",
        ])
        .unwrap();
        let Commands::Replay(args) = cli.command else {
            panic!("expected replay");
        };
        assert_eq!(args.config, PathBuf::from("vigil.yaml"));
        assert_eq!(args.events, PathBuf::from("events.jsonl"));
        assert_eq!(args.history, Some(PathBuf::from("history.json")));
        assert_eq!(args.metrics_port, Some(9100));
        assert!(args.output.is_none());
    }

    #[test]
    fn test_replay_requires_events() {
        assert!(Cli::try_parse_from(["vigil", "replay", "--config", "vigil.yaml"]).is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from([
            "vigil",
            "validate",
            "a.yaml",
            "-vv",
            "--color",
            "never",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.color, ColorChoice::Never);
        assert_eq!(cli.log_format, OutputFormat::Json);
    }

    #[test]
    fn test_help_output() {
        let err = Cli::try_parse_from(["vigil", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_output() {
        let err = Cli::try_parse_from(["vigil", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }
}
