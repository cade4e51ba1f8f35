use std::fmt;

use exam_core::model::{AnswerOption, Question, QuestionId, QuestionWithAnswer};
use storage::repository::Storage;

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    count: usize,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
    InvalidCount { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
            ArgsError::InvalidCount { raw } => write!(f, "invalid --questions value: {raw}"),
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("EXAM_DB_URL").unwrap_or_else(|_| "sqlite:exam.sqlite3?mode=rwc".into());
        let mut count = SAMPLES.len();

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--questions" => {
                    let value = require_value(&mut args, "--questions")?;
                    count = value
                        .parse::<usize>()
                        .map_err(|_| ArgsError::InvalidCount { raw: value.clone() })?;
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url, count })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>         SQLite URL (default: sqlite:exam.sqlite3?mode=rwc)");
    eprintln!("  --questions <n>           Number of sample questions to upsert (default: all)");
    eprintln!("  -h, --help                Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  EXAM_DB_URL");
}

/// (text, [a, b, c, d], correct)
const SAMPLES: [(&str, [&str; 4], AnswerOption); 12] = [
    ("What is 7 x 8?", ["54", "56", "58", "64"], AnswerOption::B),
    ("Which planet is closest to the Sun?", ["Venus", "Earth", "Mercury", "Mars"], AnswerOption::C),
    ("What is the chemical symbol for gold?", ["Au", "Ag", "Gd", "Go"], AnswerOption::A),
    ("How many sides does a hexagon have?", ["5", "7", "8", "6"], AnswerOption::D),
    ("Which gas do plants absorb?", ["Oxygen", "Carbon dioxide", "Nitrogen", "Helium"], AnswerOption::B),
    ("What is the square root of 81?", ["9", "8", "7", "6"], AnswerOption::A),
    ("Which ocean is the largest?", ["Atlantic", "Indian", "Pacific", "Arctic"], AnswerOption::C),
    ("How many bits are in a byte?", ["4", "16", "2", "8"], AnswerOption::D),
    ("What is the boiling point of water at sea level in Celsius?", ["90", "100", "110", "120"], AnswerOption::B),
    ("Which language has the borrow checker?", ["Rust", "Go", "Python", "Java"], AnswerOption::A),
    ("What is 15% of 200?", ["20", "25", "30", "35"], AnswerOption::C),
    ("Which continent is Egypt in?", ["Asia", "Europe", "Oceania", "Africa"], AnswerOption::D),
];

fn sample_questions(count: usize) -> Result<Vec<QuestionWithAnswer>, exam_core::Error> {
    SAMPLES
        .iter()
        .take(count)
        .zip(1_u64..)
        .map(|((text, options, correct), id)| {
            let question = Question::new(QuestionId::new(id), *text, (*options).map(String::from))?;
            Ok(QuestionWithAnswer::new(question, *correct))
        })
        .collect()
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;
    let questions = sample_questions(args.count)?;
    for record in &questions {
        storage.questions.upsert_question(record).await?;
    }

    println!(
        "Seeded {} questions into {}",
        questions.len(),
        args.db_url
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
