//! Line-based terminal front end for an exam attempt.

use exam_core::grading::LetterGrade;
use exam_core::model::{AnswerOption, ExamResult};
use exam_core::time::{TimeBand, format_clock};
use services::{
    ExamHistoryService, ExamIntent, ExamOutcome, ExamReport, ExamRunner, ExamSession,
    HistoryStats, SubmitState,
};
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Input {
    Intent(ExamIntent),
    Retry,
    Show,
    Help,
    Quit,
}

/// Maps one input line to an action. While a confirmation is pending,
/// `y` confirms and anything else cancels.
fn parse_input(line: &str, awaiting_confirmation: bool) -> Option<Input> {
    let line = line.trim().to_ascii_lowercase();
    if awaiting_confirmation {
        return Some(match line.as_str() {
            "y" | "yes" => Input::Intent(ExamIntent::ConfirmSubmit),
            _ => Input::Intent(ExamIntent::CancelSubmit),
        });
    }

    let mut parts = line.split_whitespace();
    let head = parts.next()?;
    let input = match head {
        "a" | "b" | "c" | "d" => {
            let option = AnswerOption::from_label(head).ok()?;
            Input::Intent(ExamIntent::Select(option))
        }
        "n" | "next" => Input::Intent(ExamIntent::Next),
        "p" | "prev" => Input::Intent(ExamIntent::Previous),
        "g" | "goto" => {
            let number: usize = parts.next()?.parse().ok()?;
            Input::Intent(ExamIntent::GoTo(number.checked_sub(1)?))
        }
        "s" | "submit" => Input::Intent(ExamIntent::Submit),
        "r" | "retry" => Input::Retry,
        "l" | "list" => Input::Show,
        "h" | "help" | "?" => Input::Help,
        "q" | "quit" => Input::Quit,
        _ => return None,
    };
    Some(input)
}

fn print_help() {
    println!("  a/b/c/d   answer the current question");
    println!("  n, p      next / previous question");
    println!("  g <n>     go to question n");
    println!("  s         submit");
    println!("  r         retry a failed submission");
    println!("  l         show the current question again");
    println!("  q         quit without submitting");
}

fn render_question(session: &ExamSession) {
    let Some(question) = session.current_question() else {
        return;
    };
    let progress = session.progress();
    println!();
    println!(
        "[{}] Question {}/{}  answered {} ({}%)",
        format_clock(progress.time_remaining),
        progress.current_index + 1,
        progress.total,
        progress.answered,
        progress.percent,
    );
    println!("{}", question.text());
    let selected = session.answer_for(question.id());
    for (option, text) in question.options() {
        let marker = if selected == Some(option) { '*' } else { ' ' };
        println!(" {marker} {}) {text}", option.label());
    }
}

fn announce_time(remaining: u32, band: TimeBand, previous: TimeBand) {
    let minute_mark = remaining > 0 && remaining % 60 == 0;
    let final_seconds = remaining > 0 && remaining <= 10;
    if band != previous || minute_mark || final_seconds {
        let note = match band {
            TimeBand::Plenty => "",
            TimeBand::Low => " (time is running low)",
            TimeBand::Critical => " (hurry up)",
        };
        println!("  {} left{note}", format_clock(remaining));
    }
}

fn score_line(result: &ExamResult) -> String {
    let grade = LetterGrade::for_percentage(result.percentage);
    format!(
        "Score: {}/{}  {:.2}%  grade {}  {}",
        result.score,
        result.total_questions,
        result.percentage,
        grade.as_str(),
        grade.praise(),
    )
}

fn render_report(report: &ExamReport) {
    let result = &report.result;
    println!();
    if report.auto_submitted {
        println!("Time expired. Your exam was submitted automatically.");
    } else {
        println!("Exam submitted.");
    }
    println!("{}", score_line(result));
    for answer in &result.answers {
        let verdict = if answer.is_correct { "correct" } else { "wrong" };
        println!(
            "  #{:<4} {} {verdict} (answer {})",
            answer.question_id, answer.selected_answer, answer.correct_answer
        );
    }
}

fn render_outcome(runner: &ExamRunner, outcome: &ExamOutcome) -> bool {
    match outcome {
        ExamOutcome::Continue => {
            render_question(runner.session());
            false
        }
        ExamOutcome::Ignored => false,
        ExamOutcome::ConfirmationRequired { answered, total } => {
            println!(
                "You answered {answered} of {total} questions. Submit anyway? [y/N]"
            );
            false
        }
        ExamOutcome::Submitted(report) => {
            render_report(report);
            true
        }
    }
}

/// Run one exam attempt against stdin until it is submitted or abandoned.
///
/// # Errors
///
/// Returns an error if the exam cannot be started or stdin fails.
pub async fn run_exam(mut runner: ExamRunner) -> Result<(), Box<dyn std::error::Error>> {
    runner.start().await?;
    let total = runner.session().total_duration();
    println!(
        "Exam started: {} questions, {} on the clock. Type 'h' for help.",
        runner.session().total_questions(),
        format_clock(total),
    );
    render_question(runner.session());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut band = TimeBand::for_remaining(total, total);

    loop {
        tokio::select! {
            event = runner.next_event() => {
                let outcome = runner.on_timer_event(event).await;
                match outcome {
                    Ok(ExamOutcome::Continue) => {
                        let remaining = runner.session().time_remaining();
                        let next_band = TimeBand::for_remaining(remaining, total);
                        announce_time(remaining, next_band, band);
                        band = next_band;
                    }
                    Ok(outcome) => {
                        if render_outcome(&runner, &outcome) {
                            return Ok(());
                        }
                    }
                    Err(err) => println!("Submission failed: {err}. Type 'r' to retry."),
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    println!("Input closed; exam abandoned.");
                    runner.abandon();
                    return Ok(());
                };
                let awaiting = runner.submit_state() == SubmitState::AwaitingConfirmation;
                let outcome = match parse_input(&line, awaiting) {
                    Some(Input::Intent(intent)) => runner.handle(intent).await,
                    Some(Input::Retry) => runner.retry_submit().await,
                    Some(Input::Show) => Ok(ExamOutcome::Continue),
                    Some(Input::Help) => {
                        print_help();
                        continue;
                    }
                    Some(Input::Quit) => {
                        runner.abandon();
                        println!("Exam abandoned.");
                        return Ok(());
                    }
                    None => {
                        println!("Unknown command. Type 'h' for help.");
                        continue;
                    }
                };
                match outcome {
                    Ok(outcome) => {
                        if render_outcome(&runner, &outcome) {
                            return Ok(());
                        }
                    }
                    Err(err) => println!("Submission failed: {err}. Type 'r' to retry."),
                }
            }
        }
    }
}

/// Print past results and their aggregates.
///
/// # Errors
///
/// Returns an error if the history cannot be loaded.
pub async fn print_history(
    history: &ExamHistoryService,
    limit: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let entries = history.recent(limit).await?;
    let Some(stats) = HistoryStats::from_entries(&entries) else {
        println!("No exams taken yet.");
        return Ok(());
    };

    for (index, entry) in entries.iter().enumerate() {
        let summary = &entry.summary;
        println!(
            "Exam #{:<3} {}  {:>3}/{:<3} {:>6.2}%  {:<2}  {}",
            entries.len() - index,
            summary.submitted_at.format("%Y-%m-%d %H:%M"),
            summary.score,
            summary.total_questions,
            summary.percentage,
            entry.grade.as_str(),
            entry.performance.label(),
        );
    }
    println!();
    println!(
        "Total exams: {}  average: {:.0}%  best: {:.2}%",
        stats.attempts, stats.average_percentage, stats.best_percentage
    );
    Ok(())
}
