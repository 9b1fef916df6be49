#![forbid(unsafe_code)]

mod cmd;
mod gitlab;
mod output;
mod snapshot;

use clap::{CommandFactory, Parser, Subcommand};
use labeltime_core::config::resolve_config;
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use std::env;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "glt",
    author,
    version,
    about = "glt: how long do GitLab issues spend under each label?",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging and per-issue tables.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (defaults to pretty on a TTY, text otherwise).
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Analysis",
        about = "Average time per label",
        long_about = "Reconstruct how long every label stayed on each issue and report the mean per label.",
        after_help = "EXAMPLES:\n    # Last two weeks of project 4750040\n    glt analyze --project 4750040\n\n    # One issue, with its own label table\n    glt analyze 123 --per-item\n\n    # Offline, from a snapshot, pinned to an instant\n    glt analyze --input snap.json --as-of 2024-05-01T00:00:00Z --json"
    )]
    Analyze(cmd::analyze::AnalyzeArgs),

    #[command(
        next_help_heading = "Analysis",
        about = "Save issues and label events to a file",
        long_about = "Fetch issues and their label events and write them as a snapshot for offline analysis.",
        after_help = "EXAMPLES:\n    # Snapshot the last 30 days\n    glt snapshot --days 30 --output snap.json"
    )]
    Snapshot(cmd::snapshot::SnapshotArgs),

    #[command(
        next_help_heading = "Project Maintenance",
        about = "Show or edit configuration",
        after_help = "EXAMPLES:\n    # Effective configuration\n    glt config\n\n    # Pin the project for this directory\n    glt config set gitlab.project acme/widgets"
    )]
    Config(cmd::config::ConfigArgs),

    #[command(
        next_help_heading = "Project Maintenance",
        about = "Generate shell completion scripts",
        long_about = "Generate shell completion scripts for supported shells.",
        after_help = "EXAMPLES:\n    # Generate bash completions\n    glt completions bash"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn default_filter(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else if verbose || env::var("DEBUG").is_ok() {
        "glt=debug,labeltime_core=debug,info"
    } else {
        "glt=info,labeltime_core=info,warn"
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_env("GLT_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose, quiet)));

    let format = env::var("GLT_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let project_root = env::current_dir()?;
    let config = resolve_config(&project_root)?;
    let output = resolve_output_mode(cli.format, cli.json, config.user.output.as_deref());
    debug!(?output, root = %project_root.display(), "resolved configuration");

    match cli.command {
        Commands::Analyze(args) => {
            cmd::analyze::run_analyze(&args, &config, output, cli.verbose)
        }
        Commands::Snapshot(args) => cmd::snapshot::run_snapshot(&args, &config, output),
        Commands::Config(args) => cmd::config::run_config(&args, &project_root, output),
        Commands::Completions(args) => {
            let mut command = Cli::command();
            cmd::completions::run_completions(args.shell, &mut command)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    // Config may be what failed, so errors render with flags and env only.
    let error_mode = resolve_output_mode(cli.format, cli.json, None);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if render_error(error_mode, &CliError::from_anyhow(&err)).is_err() {
                eprintln!("error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_parses_before_and_after_subcommand() {
        let cli = Cli::parse_from(["glt", "--json", "analyze"]);
        assert!(cli.json);
        let cli = Cli::parse_from(["glt", "analyze", "--json"]);
        assert!(cli.json);
    }

    #[test]
    fn format_flag_parses() {
        let cli = Cli::parse_from(["glt", "--format", "text", "config"]);
        assert_eq!(cli.format, Some(OutputMode::Text));
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        assert!(Cli::try_parse_from(["glt", "-q", "-v", "analyze"]).is_err());
        let cli = Cli::parse_from(["glt", "-q", "analyze"]);
        assert!(cli.quiet);
    }

    #[test]
    fn analyze_arguments_parse() {
        let cli = Cli::parse_from([
            "glt",
            "analyze",
            "123",
            "-d",
            "30",
            "--file",
            "out.txt",
            "--lanes",
            "--per-item",
            "--as-of",
            "2024-05-01T00:00:00Z",
            "--project",
            "acme/widgets",
        ]);
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.source.issue_id, Some(123));
        assert_eq!(args.source.days, Some(30));
        assert_eq!(args.source.project.as_deref(), Some("acme/widgets"));
        assert!(args.lanes);
        assert!(args.per_item);
        assert_eq!(
            args.as_of.map(|at| at.to_rfc3339()),
            Some("2024-05-01T00:00:00+00:00".to_string())
        );
    }

    #[test]
    fn bad_as_of_is_rejected() {
        assert!(Cli::try_parse_from(["glt", "analyze", "--as-of", "yesterday"]).is_err());
    }

    #[test]
    fn snapshot_requires_output() {
        assert!(Cli::try_parse_from(["glt", "snapshot"]).is_err());
        let cli = Cli::parse_from(["glt", "snapshot", "--output", "snap.json", "--days", "7"]);
        assert!(matches!(cli.command, Commands::Snapshot(_)));
    }

    #[test]
    fn config_subcommands_parse() {
        for args in [
            vec!["glt", "config"],
            vec!["glt", "config", "show", "--project"],
            vec!["glt", "config", "set", "gitlab.project", "7"],
            vec!["glt", "config", "unset", "--scope", "user", "user.output"],
        ] {
            let result = Cli::try_parse_from(args.iter());
            assert!(result.is_ok(), "failed to parse {args:?}: {:?}", result.err());
        }
    }

    #[test]
    fn completions_subcommand_parses() {
        let cli = Cli::parse_from(["glt", "completions", "bash"]);
        assert!(matches!(
            cli.command,
            Commands::Completions(cmd::completions::CompletionsArgs {
                shell: clap_complete::Shell::Bash,
            })
        ));
    }

    #[test]
    fn verbose_filter_enables_both_crates() {
        assert_eq!(default_filter(false, true), "error");

        let verbose = default_filter(true, false);
        assert!(verbose.contains("glt=debug"));
        assert!(verbose.contains("labeltime_core=debug"));
        assert!(EnvFilter::try_new(verbose).is_ok());
        assert!(EnvFilter::try_new(default_filter(false, false)).is_ok());
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
