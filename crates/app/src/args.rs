use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DB_URL: &str = "sqlite://progress.db";
pub const DEFAULT_TIME_BUDGET_MS: u64 = 5_000;
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, PartialEq, Eq)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    UnknownSubcommand(String),
    InvalidDbUrl { raw: String },
    InvalidTimeBudget { raw: String },
    MissingLesson,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownSubcommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidTimeBudget { raw } => {
                write!(f, "invalid --time-budget-ms value: {raw}")
            }
            ArgsError::MissingLesson => write!(f, "run requires --lesson <id>"),
        }
    }
}

impl std::error::Error for ArgsError {}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  codify [ui]     [options]");
    eprintln!("  codify progress [options]");
    eprintln!("  codify reset    [options]");
    eprintln!("  codify lessons");
    eprintln!(
        "  codify run --lesson <id> [--file <path>] [--input <text>] [--submit] [--json] [options]"
    );
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         default {DEFAULT_DB_URL}");
    eprintln!("  --time-budget-ms <ms>     default {DEFAULT_TIME_BUDGET_MS}");
    eprintln!("  --log <filter>            default {DEFAULT_LOG_FILTER}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  CODIFY_DB_URL, CODIFY_TIME_BUDGET_MS, RUST_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArgs {
    pub lesson: String,
    /// Program to execute; the lesson's reference solution when absent.
    pub file: Option<PathBuf>,
    pub input: String,
    pub submit: bool,
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ui,
    Progress,
    Reset,
    Lessons,
    Run(RunArgs),
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub command: Command,
    pub db_url: String,
    pub time_budget: Duration,
    pub log_filter: String,
}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_time_budget(raw: String) -> Result<Duration, ArgsError> {
    match raw.trim().parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(ArgsError::InvalidTimeBudget { raw }),
    }
}

impl Args {
    /// Parse `argv` (without the program name), falling back to `env` for
    /// settings that were not passed as flags.
    ///
    /// # Errors
    ///
    /// Returns `ArgsError` for unknown arguments, missing values and values
    /// that do not parse.
    pub fn parse(
        argv: Vec<String>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ArgsError> {
        let mut iter = argv.into_iter().peekable();

        // Launching the UI is the default when no subcommand is given.
        let mut command = match iter.peek().map(String::as_str) {
            None => Command::Ui,
            Some(first) if first.starts_with('-') => Command::Ui,
            Some(_) => {
                let name = iter.next().unwrap_or_default();
                match name.as_str() {
                    "ui" => Command::Ui,
                    "progress" => Command::Progress,
                    "reset" => Command::Reset,
                    "lessons" => Command::Lessons,
                    "run" => Command::Run(RunArgs {
                        lesson: String::new(),
                        file: None,
                        input: String::new(),
                        submit: false,
                        json: false,
                    }),
                    "help" => Command::Help,
                    _ => return Err(ArgsError::UnknownSubcommand(name)),
                }
            }
        };

        let mut db_url = None;
        let mut time_budget = None;
        let mut log_filter = None;
        let mut help = false;

        while let Some(arg) = iter.next() {
            match (arg.as_str(), &mut command) {
                ("--db", _) => {
                    let value = require_value(&mut iter, "--db")?;
                    db_url = Some(normalize_sqlite_url(value)?);
                }
                ("--time-budget-ms", _) => {
                    let value = require_value(&mut iter, "--time-budget-ms")?;
                    time_budget = Some(parse_time_budget(value)?);
                }
                ("--log", _) => log_filter = Some(require_value(&mut iter, "--log")?),
                ("--help" | "-h", _) => help = true,
                ("--lesson", Command::Run(run)) => {
                    run.lesson = require_value(&mut iter, "--lesson")?;
                }
                ("--file", Command::Run(run)) => {
                    run.file = Some(PathBuf::from(require_value(&mut iter, "--file")?));
                }
                ("--input", Command::Run(run)) => {
                    run.input = require_value(&mut iter, "--input")?;
                }
                ("--submit", Command::Run(run)) => run.submit = true,
                ("--json", Command::Run(run)) => run.json = true,
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        if help {
            command = Command::Help;
        }
        if matches!(&command, Command::Run(run) if run.lesson.trim().is_empty()) {
            return Err(ArgsError::MissingLesson);
        }

        let db_url = match db_url {
            Some(url) => url,
            None => normalize_sqlite_url(
                env("CODIFY_DB_URL").unwrap_or_else(|| DEFAULT_DB_URL.to_string()),
            )?,
        };
        let time_budget = match time_budget {
            Some(budget) => budget,
            None => env("CODIFY_TIME_BUDGET_MS")
                .map(parse_time_budget)
                .transpose()?
                .unwrap_or(Duration::from_millis(DEFAULT_TIME_BUDGET_MS)),
        };
        let log_filter = log_filter
            .or_else(|| env("RUST_LOG"))
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            command,
            db_url,
            time_budget,
            log_filter,
        })
    }
}

/// Turn a path or relative `sqlite:` URL into an absolute `sqlite://` URL.
///
/// # Errors
///
/// Returns `ArgsError::InvalidDbUrl` for an empty value.
pub fn normalize_sqlite_url(raw: String) -> Result<String, ArgsError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "sqlite:" || trimmed == "sqlite://" {
        return Err(ArgsError::InvalidDbUrl { raw });
    }
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite:file:") {
        return Ok(trimmed.to_string());
    }

    let path_str = trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    Ok(format!("sqlite://{}", absolute.display()))
}

/// Create the database file and its parent directory when missing.
///
/// # Errors
///
/// Returns an error if the URL is not a file URL or the file cannot be created.
pub fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" || db_url.starts_with("sqlite:file:") {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}
