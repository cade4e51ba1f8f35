use std::fmt;

use exam_core::{Clock, ExamConfigDraft};
use services::{AppServices, HttpGatewayConfig};
use tracing_subscriber::EnvFilter;

mod terminal;

const DEFAULT_DB_URL: &str = "sqlite:exam.sqlite3?mode=rwc";
const DEFAULT_HISTORY_LIMIT: u32 = 20;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidNumber { flag: &'static str, raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
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

fn parse_number(flag: &'static str, raw: String) -> Result<u32, ArgsError> {
    raw.trim()
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Run,
    History,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "run" => Some(Self::Run),
            "history" => Some(Self::History),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    db_url: String,
    server: Option<HttpGatewayConfig>,
    draft: ExamConfigDraft,
    history_limit: u32,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("EXAM_DB_URL").unwrap_or_else(|_| DEFAULT_DB_URL.into());
        let mut server_url = std::env::var("EXAM_SERVER_URL").ok();
        let mut token = std::env::var("EXAM_TOKEN").ok();
        let mut draft = ExamConfigDraft {
            total_duration_secs: env_number("EXAM_DURATION_SECS"),
            question_limit: env_number("EXAM_QUESTION_LIMIT"),
        };
        let mut history_limit = DEFAULT_HISTORY_LIMIT;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--server" => server_url = Some(require_value(args, "--server")?),
                "--token" => token = Some(require_value(args, "--token")?),
                "--duration" => {
                    let value = require_value(args, "--duration")?;
                    draft.total_duration_secs = Some(parse_number("--duration", value)?);
                }
                "--questions" => {
                    let value = require_value(args, "--questions")?;
                    draft.question_limit = Some(parse_number("--questions", value)?);
                }
                "--limit" => {
                    let value = require_value(args, "--limit")?;
                    history_limit = parse_number("--limit", value)?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            db_url,
            server: HttpGatewayConfig::from_values(server_url, token),
            draft,
            history_limit,
        })
    }
}

fn env_number(key: &str) -> Option<u32> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.trim().parse().ok())
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- run     [options]");
    eprintln!("  cargo run -p app -- history [options] [--limit <n>]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>     Local question bank (default: {DEFAULT_DB_URL})");
    eprintln!("  --server <url>        Use a remote exam server instead of the local bank");
    eprintln!("  --token <token>       Bearer token for the remote server");
    eprintln!("  --duration <secs>     Exam duration (default: 1800)");
    eprintln!("  --questions <n>       Questions per exam (default: 10)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EXAM_DB_URL, EXAM_SERVER_URL, EXAM_TOKEN, EXAM_DURATION_SECS, EXAM_QUESTION_LIMIT");
    eprintln!("  RUST_LOG (default: warn)");
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn build_services(args: Args) -> Result<AppServices, Box<dyn std::error::Error>> {
    let clock = Clock::default();
    match args.server {
        Some(http) => {
            tracing::info!(base_url = %http.base_url, "using remote exam server");
            Ok(AppServices::new_http(http, clock, args.draft)?)
        }
        None => {
            tracing::info!(db_url = %args.db_url, "using local question bank");
            Ok(AppServices::new_sqlite(&args.db_url, clock, args.draft).await?)
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    // Default behavior: run an exam when no subcommand is provided.
    let cmd = match argv.first().map(String::as_str) {
        None => Command::Run,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Run,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let parsed = Args::parse(&mut argv.into_iter()).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    let history_limit = parsed.history_limit;
    let services = build_services(parsed).await?;

    match cmd {
        Command::Run => terminal::run_exam(services.exam_runner()).await,
        Command::History => terminal::print_history(&services.history(), history_limit).await,
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
