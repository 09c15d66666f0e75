// src/assessment/error.rs

use std::fmt;

use thiserror::Error;

/// Which column of a MATCHING question an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

/// Shape violations of a CLOSED_ENDED option list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionSetProblem {
    #[error("at least 2 text options are required (got {0})")]
    TooFewTextOptions(usize),
    #[error("at least 2 image options are required (got {0})")]
    TooFewImageOptions(usize),
    #[error("correct answer '{0}' is not one of the options")]
    AnswerNotAnOption(String),
}

/// Shape violations of a MATCHING payload. Indices are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchingProblem {
    #[error("either pairs or leftSide/rightSide must be provided")]
    NoInput,
    #[error("{0} side must contain at least one item")]
    EmptySide(Side),
    #[error("{side} item {index} needs text or an image")]
    EmptyItem { side: Side, index: usize },
    #[error("{side} item {index} duplicates an earlier item")]
    Duplicate { side: Side, index: usize },
    #[error("pair {index} needs both a left and a right value")]
    IncompletePair { index: usize },
    #[error("left side has {left} items but right side only {right}")]
    UnpairedLeft { left: usize, right: usize },
    #[error("right item {index} would be read as the position of right item {ordinal}")]
    AmbiguousOrdinal { index: usize, ordinal: usize },
}

/// A single rule violated by a proposed question.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuestionError {
    #[error("missing required fields: {}", .0.join(", "))]
    MissingField(Vec<&'static str>),

    #[error("{field} must be an integer (got '{value}')")]
    NotAnInteger { field: &'static str, value: String },

    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("invalid options: {0}")]
    InvalidOptionSet(OptionSetProblem),

    #[error("invalid matching structure: {0}")]
    InvalidMatchingStructure(MatchingProblem),

    #[error("at least one sub-question is required")]
    NoSubQuestions,

    #[error("sub-question {index}: {reason}")]
    InvalidSubQuestion {
        index: usize,
        reason: Box<QuestionError>,
    },

    #[error("an auto-scored question requires a correct answer")]
    MissingCorrectAnswer,

    #[error("unknown question type '{0}'")]
    UnknownQuestionType(String),
}

impl From<OptionSetProblem> for QuestionError {
    fn from(problem: OptionSetProblem) -> Self {
        QuestionError::InvalidOptionSet(problem)
    }
}

impl From<MatchingProblem> for QuestionError {
    fn from(problem: MatchingProblem) -> Self {
        QuestionError::InvalidMatchingStructure(problem)
    }
}

/// Every violation found in one validation pass, in rule order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidQuestion(pub Vec<QuestionError>);

impl InvalidQuestion {
    pub fn errors(&self) -> &[QuestionError] {
        &self.0
    }

    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for InvalidQuestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages().join("; "))
    }
}

impl std::error::Error for InvalidQuestion {}

/// Raised (and only logged) when an auto-scored question has no usable
/// canonical answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("auto-scored question has no canonical answer")]
pub struct ScoringInconsistency {
    pub question_id: Option<i64>,
    pub part: Option<usize>,
}

/// Rejections of a manual grading action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GradingError {
    #[error("answer already has a final score; use a re-grade")]
    AlreadyFinal,
    #[error("points must be between 0 and {max} (got {value})")]
    PointsOutOfRange { value: i32, max: i32 },
    #[error("this question has sub-questions; specify which part to grade")]
    PartRequired,
    #[error("this question has no sub-questions")]
    PartNotApplicable,
    #[error("sub-question {0} does not exist")]
    NoSuchPart(usize),
}

/// Rejections of a status change requested by an administrator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("question is already {0}")]
    Unchanged(&'static str),
    #[error("a question cannot be moved back to PENDING")]
    BackToPending,
}
