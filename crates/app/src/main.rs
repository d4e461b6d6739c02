use std::fmt;

use chrono::NaiveDate;
use services::{AppServices, Clock};
use spark_core::model::{CoachPersona, GoalDraft, ParseIdError, Priority, TaskDraft, TaskId};

mod commands;

const DEFAULT_DB_URL: &str = "sqlite://spark.sqlite3";
const DEFAULT_HISTORY: u32 = 20;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArgument { what: &'static str },
    UnknownArg(String),
    UnknownSubcommand(String),
    InvalidDbUrl { raw: String },
    InvalidDate { flag: &'static str, raw: String },
    InvalidNumber { flag: &'static str, raw: String },
    InvalidPriority { raw: String },
    InvalidPersona { raw: String },
    InvalidId(ParseIdError),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArgument { what } => write!(f, "missing {what}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownSubcommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidDate { flag, raw } => {
                write!(f, "invalid {flag} value (expected YYYY-MM-DD): {raw}")
            }
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidPriority { raw } => {
                write!(f, "invalid priority (high, medium, low): {raw}")
            }
            ArgsError::InvalidPersona { raw } => write!(
                f,
                "unknown coach persona (encouraging, strict, socratic, playful): {raw}"
            ),
            ArgsError::InvalidId(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_date(raw: String, flag: &'static str) -> Result<NaiveDate, ArgsError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ArgsError::InvalidDate { flag, raw })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  spark [overview]                          [--db <sqlite_url>] [-v]");
    eprintln!("  spark seed                                # sample goal and tasks");
    eprintln!("  spark add-goal <title> [--subject s] [--target YYYY-MM-DD] [--description d]");
    eprintln!("  spark add-task <title> --subject s [--due YYYY-MM-DD] [--priority p]");
    eprintln!("                 [--goal <goal-id>] [--tag t]... [--notes n]");
    eprintln!("  spark toggle <task-id>");
    eprintln!("  spark set-status <task-id> <complete|partial|incorrect|none>");
    eprintln!("  spark chat <message...> | --history [n] | --clear");
    eprintln!("  spark coach [persona]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db {DEFAULT_DB_URL}");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  SPARK_DB_URL, SPARK_LOG");
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ChatAction {
    Send(String),
    History(u32),
    Clear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Overview,
    Seed,
    AddGoal(GoalDraft),
    AddTask(TaskDraft),
    Toggle(TaskId),
    SetStatus { id: TaskId, status: String },
    Chat(ChatAction),
    Coach(Option<CoachPersona>),
}

#[derive(Debug)]
struct Options {
    db_url: String,
    verbose: bool,
}

impl Options {
    fn from_env() -> Self {
        let db_url = std::env::var("SPARK_DB_URL")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| DEFAULT_DB_URL.into(), normalize_sqlite_url);
        Self {
            db_url,
            verbose: false,
        }
    }

    /// Consume a flag shared by every subcommand. Returns `false` if `arg` is
    /// not one of them.
    fn take_flag(
        &mut self,
        arg: &str,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<bool, ArgsError> {
        match arg {
            "--db" => {
                let value = require_value(args, "--db")?;
                if value.trim().is_empty() {
                    return Err(ArgsError::InvalidDbUrl { raw: value });
                }
                self.db_url = normalize_sqlite_url(value);
                Ok(true)
            }
            "--verbose" | "-v" => {
                self.verbose = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

struct Args {
    options: Options,
    command: Command,
}

/// Result of reading the command line: something to run, or a usage request.
enum Parsed {
    Run(Args),
    Help,
}

impl Args {
    fn parse(argv: Vec<String>, mut options: Options) -> Result<Parsed, ArgsError> {
        if argv.iter().any(|arg| arg == "--help" || arg == "-h") {
            return Ok(Parsed::Help);
        }

        let mut args = argv.into_iter().peekable();
        let explicit = args.peek().is_some_and(|first| !first.starts_with('-'));
        let name = if explicit {
            args.next().unwrap_or_default()
        } else {
            "overview".to_string()
        };

        let command = match name.as_str() {
            "overview" => {
                no_positionals(&mut args, &mut options)?;
                Command::Overview
            }
            "seed" => {
                no_positionals(&mut args, &mut options)?;
                Command::Seed
            }
            "add-goal" => Command::AddGoal(parse_add_goal(&mut args, &mut options)?),
            "add-task" => Command::AddTask(parse_add_task(&mut args, &mut options)?),
            "toggle" => {
                let mut positionals = positionals(&mut args, &mut options)?.into_iter();
                let id = parse_task_id(positionals.next())?;
                reject_extra(positionals)?;
                Command::Toggle(id)
            }
            "set-status" => {
                let mut positionals = positionals(&mut args, &mut options)?.into_iter();
                let id = parse_task_id(positionals.next())?;
                let status = positionals.next().ok_or(ArgsError::MissingArgument {
                    what: "status (complete, partial, incorrect or none)",
                })?;
                reject_extra(positionals)?;
                Command::SetStatus { id, status }
            }
            "chat" => Command::Chat(parse_chat(&mut args, &mut options)?),
            "coach" => {
                let mut positionals = positionals(&mut args, &mut options)?.into_iter();
                let persona = positionals
                    .next()
                    .map(|raw| {
                        raw.parse::<CoachPersona>()
                            .map_err(|_| ArgsError::InvalidPersona { raw })
                    })
                    .transpose()?;
                reject_extra(positionals)?;
                Command::Coach(persona)
            }
            other => return Err(ArgsError::UnknownSubcommand(other.to_string())),
        };

        Ok(Parsed::Run(Self { options, command }))
    }
}

fn positionals(
    args: &mut impl Iterator<Item = String>,
    options: &mut Options,
) -> Result<Vec<String>, ArgsError> {
    let mut out = Vec::new();
    while let Some(arg) = args.next() {
        if options.take_flag(&arg, args)? {
            continue;
        }
        if arg.starts_with("--") {
            return Err(ArgsError::UnknownArg(arg));
        }
        out.push(arg);
    }
    Ok(out)
}

fn no_positionals(
    args: &mut impl Iterator<Item = String>,
    options: &mut Options,
) -> Result<(), ArgsError> {
    reject_extra(positionals(args, options)?.into_iter())
}

fn reject_extra(mut rest: impl Iterator<Item = String>) -> Result<(), ArgsError> {
    match rest.next() {
        Some(arg) => Err(ArgsError::UnknownArg(arg)),
        None => Ok(()),
    }
}

fn parse_task_id(raw: Option<String>) -> Result<TaskId, ArgsError> {
    let raw = raw.ok_or(ArgsError::MissingArgument { what: "task id" })?;
    raw.parse().map_err(ArgsError::InvalidId)
}

fn parse_add_goal(
    args: &mut impl Iterator<Item = String>,
    options: &mut Options,
) -> Result<GoalDraft, ArgsError> {
    let mut draft = GoalDraft::default();
    let mut title: Option<String> = None;

    while let Some(arg) = args.next() {
        if options.take_flag(&arg, args)? {
            continue;
        }
        match arg.as_str() {
            "--subject" => draft.subject = Some(require_value(args, "--subject")?),
            "--description" => draft.description = Some(require_value(args, "--description")?),
            "--target" => {
                draft.target_date = Some(parse_date(require_value(args, "--target")?, "--target")?);
            }
            _ if arg.starts_with("--") || title.is_some() => {
                return Err(ArgsError::UnknownArg(arg));
            }
            _ => title = Some(arg),
        }
    }

    draft.title = title.ok_or(ArgsError::MissingArgument { what: "goal title" })?;
    Ok(draft)
}

fn parse_add_task(
    args: &mut impl Iterator<Item = String>,
    options: &mut Options,
) -> Result<TaskDraft, ArgsError> {
    let mut title: Option<String> = None;
    let mut subject: Option<String> = None;
    let mut due = None;
    let mut priority = None;
    let mut tags = Vec::new();
    let mut notes = None;

    while let Some(arg) = args.next() {
        if options.take_flag(&arg, args)? {
            continue;
        }
        match arg.as_str() {
            "--subject" => subject = Some(require_value(args, "--subject")?),
            "--due" => due = Some(parse_date(require_value(args, "--due")?, "--due")?),
            "--priority" => {
                let raw = require_value(args, "--priority")?;
                priority = Some(
                    raw.parse::<Priority>()
                        .map_err(|_| ArgsError::InvalidPriority { raw })?,
                );
            }
            "--goal" => {
                let raw = require_value(args, "--goal")?;
                let goal = raw
                    .parse::<spark_core::model::GoalId>()
                    .map_err(ArgsError::InvalidId)?;
                tags.push(goal.as_tag());
            }
            "--tag" => tags.push(require_value(args, "--tag")?),
            "--notes" => notes = Some(require_value(args, "--notes")?),
            _ if arg.starts_with("--") || title.is_some() => {
                return Err(ArgsError::UnknownArg(arg));
            }
            _ => title = Some(arg),
        }
    }

    Ok(TaskDraft {
        title: title.ok_or(ArgsError::MissingArgument { what: "task title" })?,
        subject: subject.ok_or(ArgsError::MissingValue { flag: "--subject" })?,
        due_date: due,
        priority,
        tags,
        notes,
    })
}

fn parse_chat(
    args: &mut impl Iterator<Item = String>,
    options: &mut Options,
) -> Result<ChatAction, ArgsError> {
    let mut words = Vec::new();
    let mut action = None;
    let mut args = args.peekable();

    while let Some(arg) = args.next() {
        if options.take_flag(&arg, &mut args)? {
            continue;
        }
        match arg.as_str() {
            "--clear" => action = Some(ChatAction::Clear),
            "--history" => {
                let limit = match args.next_if(|next| !next.starts_with('-')) {
                    Some(raw) => raw.parse::<u32>().map_err(|_| ArgsError::InvalidNumber {
                        flag: "--history",
                        raw,
                    })?,
                    None => DEFAULT_HISTORY,
                };
                action = Some(ChatAction::History(limit));
            }
            _ if arg.starts_with("--") => return Err(ArgsError::UnknownArg(arg)),
            _ => words.push(arg),
        }
    }

    match (action, words.is_empty()) {
        (Some(action), true) => Ok(action),
        (Some(_), false) => Err(ArgsError::UnknownArg(words.join(" "))),
        (None, false) => Ok(ChatAction::Send(words.join(" "))),
        (None, true) => Ok(ChatAction::History(DEFAULT_HISTORY)),
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
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

    let path = std::path::Path::new(path);
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

fn init_tracing(verbose: bool) {
    let level = if verbose { "info" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_env("SPARK_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // A subscriber installed elsewhere wins.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let parsed = Args::parse(argv, Options::from_env()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    let Args { options, command } = match parsed {
        Parsed::Run(args) => args,
        Parsed::Help => {
            print_usage();
            return Ok(());
        }
    };

    init_tracing(options.verbose);
    tracing::debug!(db_url = %options.db_url, ?command, "starting");

    // Open + migrate SQLite here so the library crates never touch the filesystem.
    prepare_sqlite_file(&options.db_url)?;
    let services = AppServices::new_sqlite(&options.db_url, Clock::default_clock()).await?;
    if services.first_launch() {
        tracing::info!(db_url = %options.db_url, "initialized new study database");
    }

    commands::execute(&services, command).await
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_raw(args: &[&str]) -> Result<Parsed, ArgsError> {
        let options = Options {
            db_url: DEFAULT_DB_URL.into(),
            verbose: false,
        };
        Args::parse(args.iter().map(|s| (*s).to_string()).collect(), options)
    }

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        match parse_raw(args)? {
            Parsed::Run(args) => Ok(args),
            Parsed::Help => panic!("unexpected help request"),
        }
    }

    #[test]
    fn help_flag_anywhere_requests_usage() {
        assert!(matches!(parse_raw(&["-h"]), Ok(Parsed::Help)));
        assert!(matches!(parse_raw(&["add-task", "--help"]), Ok(Parsed::Help)));
        assert!(matches!(parse_raw(&["seed"]), Ok(Parsed::Run(_))));
    }

    #[test]
    fn no_arguments_means_overview() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.command, Command::Overview);
        assert_eq!(args.options.db_url, DEFAULT_DB_URL);
    }

    #[test]
    fn leading_flags_apply_to_overview() {
        let args = parse(&["--db", "sqlite://study.db", "-v"]).unwrap();
        assert_eq!(args.command, Command::Overview);
        assert_eq!(args.options.db_url, "sqlite://study.db");
        assert!(args.options.verbose);
    }

    #[test]
    fn add_task_collects_flags() {
        let goal = spark_core::model::GoalId::generate();
        let goal_raw = goal.to_string();
        let args = parse(&[
            "add-task",
            "Worksheet 4",
            "--subject",
            "Math",
            "--due",
            "2024-03-01",
            "--priority",
            "high",
            "--goal",
            goal_raw.as_str(),
        ])
        .unwrap();

        let Command::AddTask(draft) = args.command else {
            panic!("expected add-task");
        };
        assert_eq!(draft.title, "Worksheet 4");
        assert_eq!(draft.subject, "Math");
        assert_eq!(draft.due_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(draft.priority, Some(Priority::High));
        assert_eq!(draft.tags, vec![goal.as_tag()]);
    }

    #[test]
    fn add_task_requires_subject() {
        let err = parse(&["add-task", "Essay"]).err().unwrap();
        assert!(matches!(err, ArgsError::MissingValue { flag: "--subject" }));
    }

    #[test]
    fn bad_date_is_reported_with_flag() {
        let err = parse(&["add-goal", "Finals", "--target", "next week"])
            .err()
            .unwrap();
        assert!(matches!(err, ArgsError::InvalidDate { flag: "--target", .. }));
    }

    #[test]
    fn set_status_keeps_raw_value_for_store_validation() {
        let id = TaskId::generate();
        let args = parse(&["set-status", id.to_string().as_str(), "partial"]).unwrap();
        assert_eq!(
            args.command,
            Command::SetStatus {
                id,
                status: "partial".into()
            }
        );
    }

    #[test]
    fn chat_joins_words_or_takes_actions() {
        assert_eq!(
            parse(&["chat", "what", "next?"]).unwrap().command,
            Command::Chat(ChatAction::Send("what next?".into()))
        );
        assert_eq!(
            parse(&["chat", "--history", "5"]).unwrap().command,
            Command::Chat(ChatAction::History(5))
        );
        assert_eq!(
            parse(&["chat", "--clear"]).unwrap().command,
            Command::Chat(ChatAction::Clear)
        );
    }

    #[test]
    fn coach_persona_is_validated() {
        assert_eq!(
            parse(&["coach", "Socratic"]).unwrap().command,
            Command::Coach(Some(CoachPersona::Socratic))
        );
        assert!(matches!(
            parse(&["coach", "grumpy"]).err().unwrap(),
            ArgsError::InvalidPersona { .. }
        ));
    }

    #[test]
    fn unknown_subcommand_is_rejected() {
        assert!(matches!(
            parse(&["launch"]).err().unwrap(),
            ArgsError::UnknownSubcommand(_)
        ));
    }

    #[test]
    fn relative_sqlite_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:data/spark.db".into());
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/spark.db"));
        assert_eq!(
            normalize_sqlite_url("sqlite::memory:".into()),
            "sqlite::memory:"
        );
    }
}
