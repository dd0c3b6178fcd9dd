use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::datetime::parse_iso_date;
use crate::record::{Category, Priority};

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
    name = "planner",
    version,
    about = "Weekly planner for daily tasks, habits, goals and notes",
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

    #[arg(long = "plannerrc", global = true)]
    pub plannerrc: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    /// Pin "today" (YYYY-MM-DD) instead of reading the clock.
    #[arg(long = "today", value_parser = parse_today, global = true)]
    pub today: Option<NaiveDate>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Add a record; daily tasks default to today.
    Add {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,

        #[arg(short = 'c', long = "category", default_value = "daily", value_parser = parse_category)]
        category: Category,

        #[arg(short = 'p', long = "priority", value_parser = parse_priority)]
        priority: Option<Priority>,

        #[arg(long = "due")]
        due: Option<String>,
    },
    /// Monday to Sunday of the current week.
    Week,
    /// Daily tasks for one date.
    Day { date: Option<String> },
    Habits,
    Goals,
    Notes,
    Backlog,
    /// Flip the completed flag.
    Toggle { id: String },
    Delete { id: String },
    /// Move an active record to the backlog.
    Shelve { id: String },
    /// Give a record a new date, pulling it out of the backlog if needed.
    Move { id: String, date: String },
    /// Advance or backlog stale daily tasks.
    #[command(visible_alias = "refresh")]
    Rollover,
    /// Print the planner document as JSON.
    Export,
}

impl Command {
    /// Maps `default.command` onto one of the read-only views.
    pub fn from_default_name(name: &str) -> anyhow::Result<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "week" => Ok(Command::Week),
            "day" => Ok(Command::Day { date: None }),
            "habits" => Ok(Command::Habits),
            "goals" => Ok(Command::Goals),
            "notes" => Ok(Command::Notes),
            "backlog" => Ok(Command::Backlog),
            "export" => Ok(Command::Export),
            other => Err(anyhow!("default.command must be a view, got: {other}")),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Add { .. } => "add",
            Command::Week => "week",
            Command::Day { .. } => "day",
            Command::Habits => "habits",
            Command::Goals => "goals",
            Command::Notes => "notes",
            Command::Backlog => "backlog",
            Command::Toggle { .. } => "toggle",
            Command::Delete { .. } => "delete",
            Command::Shelve { .. } => "shelve",
            Command::Move { .. } => "move",
            Command::Rollover => "rollover",
            Command::Export => "export",
        }
    }
}

fn parse_category(s: &str) -> Result<Category, String> {
    s.parse().map_err(|e: anyhow::Error| e.to_string())
}

fn parse_priority(s: &str) -> Result<Priority, String> {
    s.parse().map_err(|e: anyhow::Error| e.to_string())
}

fn parse_today(s: &str) -> Result<NaiveDate, String> {
    parse_iso_date(s).map_err(|e| e.to_string())
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
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}
