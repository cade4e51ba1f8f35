use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("option {0} cannot be empty")]
    EmptyOption(AnswerOption),

    #[error("invalid answer option: {0:?}")]
    InvalidOption(String),
}

//
// ─── ANSWER OPTION ────────────────────────────────────────────────────────────
//

/// One of the four labeled choices of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnswerOption {
    A,
    B,
    C,
    D,
}

impl AnswerOption {
    /// All options in display order.
    pub const ALL: [AnswerOption; 4] = [Self::A, Self::B, Self::C, Self::D];

    /// Position of this option in `ALL` (A = 0).
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::C => 2,
            Self::D => 3,
        }
    }

    #[must_use]
    pub fn label(self) -> char {
        match self {
            Self::A => 'A',
            Self::B => 'B',
            Self::C => 'C',
            Self::D => 'D',
        }
    }

    /// Parses a single option letter, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::InvalidOption` for anything but A-D.
    pub fn from_label(value: &str) -> Result<Self, QuestionError> {
        match value.trim() {
            "A" | "a" => Ok(Self::A),
            "B" | "b" => Ok(Self::B),
            "C" | "c" => Ok(Self::C),
            "D" | "d" => Ok(Self::D),
            other => Err(QuestionError::InvalidOption(other.to_owned())),
        }
    }
}

impl fmt::Display for AnswerOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for AnswerOption {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s)
    }
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// A multiple-choice question as presented to the examinee.
///
/// Never carries the correct option; see `QuestionWithAnswer` for the
/// bank-side record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuestionWire", into = "QuestionWire")]
pub struct Question {
    id: QuestionId,
    text: String,
    options: [String; 4],
}

impl Question {
    /// # Errors
    ///
    /// Returns `QuestionError` if the text or any option is blank.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        options: [String; 4],
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        for option in AnswerOption::ALL {
            if options[option.index()].trim().is_empty() {
                return Err(QuestionError::EmptyOption(option));
            }
        }
        Ok(Self { id, text, options })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn option(&self, option: AnswerOption) -> &str {
        &self.options[option.index()]
    }

    /// Iterates `(label, text)` pairs in A-D order.
    pub fn options(&self) -> impl Iterator<Item = (AnswerOption, &str)> {
        AnswerOption::ALL
            .into_iter()
            .map(move |option| (option, self.option(option)))
    }
}

/// Question record with its correct option, as held by the question bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionWithAnswer {
    pub question: Question,
    pub correct: AnswerOption,
}

impl QuestionWithAnswer {
    #[must_use]
    pub fn new(question: Question, correct: AnswerOption) -> Self {
        Self { question, correct }
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.question.id()
    }
}

#[derive(Serialize, Deserialize)]
struct QuestionWire {
    id: QuestionId,
    question_text: String,
    option_a: String,
    option_b: String,
    option_c: String,
    option_d: String,
}

impl TryFrom<QuestionWire> for Question {
    type Error = QuestionError;

    fn try_from(wire: QuestionWire) -> Result<Self, Self::Error> {
        Question::new(
            wire.id,
            wire.question_text,
            [wire.option_a, wire.option_b, wire.option_c, wire.option_d],
        )
    }
}

impl From<Question> for QuestionWire {
    fn from(question: Question) -> Self {
        let [option_a, option_b, option_c, option_d] = question.options;
        Self {
            id: question.id,
            question_text: question.text,
            option_a,
            option_b,
            option_c,
            option_d,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
