use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "echo",
    about = "Echo memory ledger: append, inspect, and snapshot recorded thoughts",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Ledger directory (overrides the config file)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Record a new thought
    Append(AppendArgs),
    /// Show recorded thoughts, oldest first
    Log(LogArgs),
    /// Show a single entry
    Show(ShowArgs),
    /// Verify every stored checksum
    Verify(VerifyArgs),
    /// Save a labeled snapshot of the current history
    Snapshot(SnapshotArgs),
    /// List stored snapshots
    Snapshots(SnapshotsArgs),
    /// Print the entries held by a snapshot
    Restore(RestoreArgs),
    /// Print the continuity context for a new session
    Context(ContextArgs),
    /// Show ledger statistics
    Summary(SummaryArgs),
    /// Summarize what one session recorded
    Reflect(ReflectArgs),
}

#[derive(Args)]
pub struct AppendArgs {
    pub category: String,
    pub thought: String,
    /// Context entry as key=value (repeatable)
    #[arg(long = "context", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub context: Vec<(String, String)>,
    /// Context as a JSON object
    #[arg(long, value_name = "JSON")]
    pub context_json: Option<String>,
    /// Session to record the thought under
    #[arg(long, value_name = "ID")]
    pub session: Option<String>,
}

#[derive(Args)]
pub struct LogArgs {
    #[arg(short = 'n', long, default_value = "20")]
    pub limit: usize,
    #[arg(long)]
    pub category: Option<String>,
    #[arg(long)]
    pub oneline: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    pub id: u64,
}

#[derive(Args)]
pub struct VerifyArgs {}

#[derive(Args)]
pub struct SnapshotArgs {
    pub label: String,
}

#[derive(Args)]
pub struct SnapshotsArgs {}

#[derive(Args)]
pub struct RestoreArgs {
    pub label: String,
}

#[derive(Args)]
pub struct ContextArgs {}

#[derive(Args)]
pub struct SummaryArgs {}

#[derive(Args)]
pub struct ReflectArgs {
    /// Session to reflect on (defaults to the most recent one)
    #[arg(long, value_name = "ID")]
    pub session: Option<String>,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {s:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_append() {
        let cli =
            Cli::try_parse_from(["echo", "append", "milestone", "Switched to FastAPI"]).unwrap();
        if let Command::Append(args) = cli.command {
            assert_eq!(args.category, "milestone");
            assert_eq!(args.thought, "Switched to FastAPI");
            assert!(args.context.is_empty());
            assert!(args.session.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_append_with_context() {
        let cli = Cli::try_parse_from([
            "echo", "append", "decision", "use json",
            "--context", "reason=readable", "--context", "url=a=b",
            "--context-json", r#"{"n": 1}"#,
        ])
        .unwrap();
        if let Command::Append(args) = cli.command {
            assert_eq!(
                args.context,
                vec![
                    ("reason".to_string(), "readable".to_string()),
                    ("url".to_string(), "a=b".to_string()),
                ]
            );
            assert_eq!(args.context_json.as_deref(), Some(r#"{"n": 1}"#));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn reject_context_without_key() {
        assert!(Cli::try_parse_from(["echo", "append", "a", "b", "--context", "=x"]).is_err());
        assert!(Cli::try_parse_from(["echo", "append", "a", "b", "--context", "novalue"]).is_err());
    }

    #[test]
    fn parse_log_oneline() {
        let cli = Cli::try_parse_from([
            "echo", "log", "--oneline", "-n", "5", "--category", "milestone",
        ])
        .unwrap();
        if let Command::Log(args) = cli.command {
            assert!(args.oneline);
            assert_eq!(args.limit, 5);
            assert_eq!(args.category.as_deref(), Some("milestone"));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn log_defaults() {
        let cli = Cli::try_parse_from(["echo", "log"]).unwrap();
        if let Command::Log(args) = cli.command {
            assert_eq!(args.limit, 20);
            assert!(!args.oneline);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_show_requires_numeric_id() {
        assert!(Cli::try_parse_from(["echo", "show", "abc"]).is_err());
        let cli = Cli::try_parse_from(["echo", "show", "3"]).unwrap();
        assert!(matches!(cli.command, Command::Show(ShowArgs { id: 3 })));
    }

    #[test]
    fn parse_snapshot_commands() {
        let cli = Cli::try_parse_from(["echo", "snapshot", "before-refactor"]).unwrap();
        assert!(matches!(cli.command, Command::Snapshot(_)));
        let cli = Cli::try_parse_from(["echo", "snapshots"]).unwrap();
        assert!(matches!(cli.command, Command::Snapshots(_)));
        let cli = Cli::try_parse_from(["echo", "restore", "v1"]).unwrap();
        assert!(matches!(cli.command, Command::Restore(_)));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "echo", "verify", "--format", "json", "--root", "/tmp/mem", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/mem")));
        assert!(matches!(cli.command, Command::Verify(_)));
    }

    #[test]
    fn parse_context_and_summary() {
        let cli = Cli::try_parse_from(["echo", "--config", "echo.toml", "context"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("echo.toml")));
        assert!(matches!(cli.command, Command::Context(_)));
        let cli = Cli::try_parse_from(["echo", "summary"]).unwrap();
        assert!(matches!(cli.command, Command::Summary(_)));
    }

    #[test]
    fn parse_sessions() {
        let cli = Cli::try_parse_from(["echo", "append", "a", "b", "--session", "s1"]).unwrap();
        if let Command::Append(args) = cli.command {
            assert_eq!(args.session.as_deref(), Some("s1"));
        } else { panic!("wrong command"); }

        let cli = Cli::try_parse_from(["echo", "reflect"]).unwrap();
        assert!(matches!(cli.command, Command::Reflect(ReflectArgs { session: None })));
        let cli = Cli::try_parse_from(["echo", "reflect", "--session", "s1"]).unwrap();
        if let Command::Reflect(args) = cli.command {
            assert_eq!(args.session.as_deref(), Some("s1"));
        } else { panic!("wrong command"); }
    }
}
