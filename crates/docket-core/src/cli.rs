use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "docket",
    version,
    about = "Docket: a personal task tracker with steps and recurring tasks",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "docketrc", global = true)]
    pub docketrc: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create a task
    Add(AddArgs),
    /// Change fields of a task; omitted fields are kept
    Edit(EditArgs),
    /// Toggle whether a task is completed
    Done(IdArg),
    /// Toggle one step of a task (steps are numbered from 1)
    Step {
        id: String,
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        number: u32,
    },
    /// Remove a task
    #[command(alias = "rm")]
    Delete(IdArg),
    /// Show tasks, optionally filtered by importance and name
    #[command(alias = "ls")]
    List(ListArgs),
    /// Show every field of one task
    Info(IdArg),
}

#[derive(Args, Debug, Clone)]
pub struct IdArg {
    /// Task id or a unique prefix of it
    pub id: String,
}

#[derive(Args, Debug, Clone)]
pub struct AddArgs {
    pub name: String,

    #[arg(short = 'i', long)]
    pub importance: String,

    /// Due date as YYYY-MM-DD
    #[arg(short = 'd', long)]
    pub due: Option<String>,

    /// Due time as HH:MM; ignored without --due
    #[arg(short = 't', long)]
    pub time: Option<String>,

    /// none, daily, weekly or monthly
    #[arg(short = 'r', long, conflicts_with = "repeat")]
    pub recurring: Option<String>,

    /// Shorthand for a daily recurrence
    #[arg(long)]
    pub repeat: bool,

    #[arg(short = 's', long = "step")]
    pub steps: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    pub id: String,

    #[arg(short = 'n', long)]
    pub name: Option<String>,

    #[arg(short = 'i', long)]
    pub importance: Option<String>,

    #[arg(short = 'd', long, conflicts_with = "no_due")]
    pub due: Option<String>,

    #[arg(short = 't', long, conflicts_with = "no_due")]
    pub time: Option<String>,

    #[arg(long)]
    pub no_due: bool,

    #[arg(short = 'r', long)]
    pub recurring: Option<String>,

    /// Appends a step; combine with --clear-steps to replace the list
    #[arg(short = 's', long = "step")]
    pub steps: Vec<String>,

    #[arg(long)]
    pub clear_steps: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// all, high, medium or low
    #[arg(short = 'i', long)]
    pub importance: Option<String>,

    #[arg(short = 's', long)]
    pub search: Option<String>,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls `rc.key=value` / `rc.key:value` words out of the argument list.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = if let Some((k, v)) = rest.split_once('=') {
                Some((format!("rc.{k}"), v.to_string()))
            } else if let Some((k, v)) = rest.split_once(':') {
                Some((format!("rc.{k}"), v.to_string()))
            } else {
                None
            };

            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k, v));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn strips_positional_rc_overrides() {
        let pre = preprocess_args(&os(&["docket", "rc.color:off", "list", "rc.data.location=/tmp/x"]))
            .expect("preprocess");
        assert_eq!(pre.cleaned_args, os(&["docket", "list"]));
        assert_eq!(
            pre.rc_overrides,
            vec![
                ("rc.color".to_string(), "off".to_string()),
                ("rc.data.location".to_string(), "/tmp/x".to_string()),
            ]
        );
    }

    #[test]
    fn parses_add_with_steps() {
        let cli = GlobalCli::try_parse_from([
            "docket", "add", "Pay bills", "-i", "high", "--due", "2024-01-15", "-r", "monthly",
            "--step", "gather", "--step", "pay",
        ])
        .expect("parse add");
        let Some(Command::Add(args)) = cli.command else {
            panic!("expected add command");
        };
        assert_eq!(args.name, "Pay bills");
        assert_eq!(args.recurring.as_deref(), Some("monthly"));
        assert_eq!(args.steps, ["gather", "pay"]);
    }

    #[test]
    fn step_numbers_start_at_one() {
        assert!(GlobalCli::try_parse_from(["docket", "step", "abc", "0"]).is_err());
        assert!(GlobalCli::try_parse_from(["docket", "step", "abc", "1"]).is_ok());
    }
}
