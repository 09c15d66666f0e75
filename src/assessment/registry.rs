// src/assessment/registry.rs

use std::{collections::BTreeSet, ops::RangeInclusive, str::FromStr};

use serde::Serialize;
use serde_json::Value;

use super::error::QuestionError;
use crate::models::question::{CreateQuestionRequest, QuestionType, non_blank};

pub const POINTS_RANGE: RangeInclusive<i64> = 1..=10;
pub const GRADE_RANGE: RangeInclusive<i64> = 7..=12;
pub const ROUND_RANGE: RangeInclusive<i64> = 1..=3;

/// Fields every question must carry, in the order they are reported.
pub const COMMON_FIELDS: [&str; 6] = ["text", "type", "points", "subjectId", "grade", "round"];

impl QuestionType {
    pub const ALL: [QuestionType; 5] = [
        QuestionType::ClosedEnded,
        QuestionType::Matching,
        QuestionType::TextAnalysis,
        QuestionType::MapAnalysis,
        QuestionType::OpenEnded,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QuestionType::ClosedEnded => "CLOSED_ENDED",
            QuestionType::Matching => "MATCHING",
            QuestionType::TextAnalysis => "TEXT_ANALYSIS",
            QuestionType::MapAnalysis => "MAP_ANALYSIS",
            QuestionType::OpenEnded => "OPEN_ENDED",
        }
    }

    /// OPEN_ENDED answers always go to a human.
    pub fn supports_auto_scoring(self) -> bool {
        !matches!(self, QuestionType::OpenEnded)
    }

    /// Whether the canonical answer is written by the author at the top level.
    /// MATCHING generates its own; analysis types carry one per sub-question.
    pub fn has_authored_answer(self) -> bool {
        matches!(self, QuestionType::ClosedEnded)
    }

    pub fn is_multi_part(self) -> bool {
        matches!(self, QuestionType::TextAnalysis | QuestionType::MapAnalysis)
    }

    /// Type-specific inputs: at least one group must be provided in full.
    pub fn field_groups(self) -> &'static [&'static [&'static str]] {
        match self {
            QuestionType::ClosedEnded => &[&["options"], &["optionImages"]],
            QuestionType::Matching => &[&["pairs"], &["leftSide", "rightSide"]],
            QuestionType::TextAnalysis | QuestionType::MapAnalysis => &[&["subQuestions"]],
            QuestionType::OpenEnded => &[],
        }
    }

    fn optional_fields(self) -> &'static [&'static str] {
        match self {
            QuestionType::ClosedEnded => &["correctAnswer", "isAutoScored", "maxPoints"],
            QuestionType::Matching | QuestionType::TextAnalysis | QuestionType::MapAnalysis => {
                &["isAutoScored", "maxPoints"]
            }
            QuestionType::OpenEnded => &["answerTemplate", "maxPoints"],
        }
    }
}

impl FromStr for QuestionType {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuestionType::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| QuestionError::UnknownQuestionType(s.to_string()))
    }
}

/// Names of the fields a payload of this type must provide. A type with a
/// single field group requires that group; alternatives are listed separately.
pub fn required_fields(question_type: QuestionType) -> BTreeSet<&'static str> {
    let specific: &[&str] = match question_type.field_groups() {
        [only] => *only,
        _ => &[],
    };
    COMMON_FIELDS.iter().chain(specific).copied().collect()
}

/// Alternative field groups, when a type offers a choice.
pub fn one_of(question_type: QuestionType) -> Vec<Vec<&'static str>> {
    match question_type.field_groups() {
        groups @ [_, _, ..] => groups.iter().map(|group| group.to_vec()).collect(),
        _ => Vec::new(),
    }
}

/// Common fields absent from the payload, in reporting order.
pub fn missing_common_fields(payload: &CreateQuestionRequest) -> Vec<&'static str> {
    COMMON_FIELDS
        .into_iter()
        .filter(|field| !is_present(payload, field))
        .collect()
}

/// Whether some field group of the type is fully provided.
pub fn has_type_fields(question_type: QuestionType, payload: &CreateQuestionRequest) -> bool {
    let groups = question_type.field_groups();
    groups.is_empty()
        || groups
            .iter()
            .any(|group| group.iter().all(|field| is_present(payload, field)))
}

/// A field counts as present when it holds something other than null, a
/// blank string or an empty list.
pub fn is_present(payload: &CreateQuestionRequest, field: &str) -> bool {
    fn listed<T>(values: Option<&[T]>) -> bool {
        values.is_some_and(|v| !v.is_empty())
    }

    match field {
        "text" => non_blank(payload.text.as_deref()).is_some(),
        "type" => non_blank(payload.question_type.as_deref()).is_some(),
        "points" => !is_absent(payload.points.as_ref()),
        "maxPoints" => !is_absent(payload.max_points.as_ref()),
        "subjectId" => subject_id_of(payload.subject_id.as_ref()).is_some(),
        "grade" => !is_absent(payload.grade.as_ref()),
        "round" => !is_absent(payload.round.as_ref()),
        "isAutoScored" => payload.is_auto_scored.is_some(),
        "correctAnswer" => non_blank(payload.correct_answer.as_deref()).is_some(),
        "options" => listed(payload.options.as_deref()),
        "optionImages" => listed(payload.option_images.as_deref()),
        "pairs" => listed(payload.pairs.as_deref()),
        "leftSide" => listed(payload.left_side.as_deref()),
        "rightSide" => listed(payload.right_side.as_deref()),
        "subQuestions" => listed(payload.sub_questions.as_deref()),
        "answerTemplate" => non_blank(payload.answer_template.as_deref()).is_some(),
        _ => false,
    }
}

pub(super) fn is_absent(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

pub(super) fn subject_id_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => non_blank(Some(s.as_str())).map(str::to_string),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Whether a raw payload of this type carries enough to be scored without a human.
pub fn is_auto_scorable(question_type: QuestionType, payload: &CreateQuestionRequest) -> bool {
    match question_type {
        QuestionType::ClosedEnded => non_blank(payload.correct_answer.as_deref()).is_some(),
        QuestionType::Matching => has_type_fields(question_type, payload),
        QuestionType::TextAnalysis | QuestionType::MapAnalysis => payload
            .sub_questions
            .as_ref()
            .is_some_and(|subs| {
                subs.iter().any(|sub| {
                    sub.is_auto_scored.unwrap_or(false)
                        && non_blank(sub.correct_answer.as_deref()).is_some()
                })
            }),
        QuestionType::OpenEnded => false,
    }
}

/// Registry entry as served to authoring clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionTypeInfo {
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub required_fields: Vec<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<Vec<&'static str>>,
    pub optional_fields: Vec<&'static str>,
    pub supports_auto_scoring: bool,
    pub multi_part: bool,
}

pub fn describe_all() -> Vec<QuestionTypeInfo> {
    QuestionType::ALL
        .into_iter()
        .map(|t| QuestionTypeInfo {
            question_type: t,
            required_fields: required_fields(t).into_iter().collect(),
            one_of: one_of(t),
            optional_fields: t.optional_fields().to_vec(),
            supports_auto_scoring: t.supports_auto_scoring(),
            multi_part: t.is_multi_part(),
        })
        .collect()
}
