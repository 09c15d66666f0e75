// src/models/question.rs

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{prelude::FromRow, types::Json};
use utoipa::ToSchema;

use crate::assessment::error::LifecycleError;

/// Closed set of question variants. Stored as the `question_type` Postgres enum.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "question_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    ClosedEnded,
    Matching,
    TextAnalysis,
    MapAnalysis,
    OpenEnded,
}

/// Review state of a question.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "question_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionStatus {
    Pending,
    Active,
    Rejected,
}

impl QuestionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionStatus::Pending => "PENDING",
            QuestionStatus::Active => "ACTIVE",
            QuestionStatus::Rejected => "REJECTED",
        }
    }

    /// Status a freshly authored question starts in.
    pub fn initial_for(kind: AuthorKind) -> Self {
        match kind {
            AuthorKind::Admin => QuestionStatus::Active,
            AuthorKind::Teacher => QuestionStatus::Pending,
        }
    }

    /// Administrator decision. Only ACTIVE and REJECTED are reachable.
    pub fn review(self, to: QuestionStatus) -> Result<QuestionStatus, LifecycleError> {
        if to == QuestionStatus::Pending {
            return Err(LifecycleError::BackToPending);
        }
        if to == self {
            return Err(LifecycleError::Unchanged(self.as_str()));
        }
        Ok(to)
    }
}

/// Who authored a question. Teacher-authored questions need approval.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "author_kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorKind {
    Admin,
    Teacher,
}

/// The caller on whose behalf a question is written. Passed explicitly,
/// never read from request-global state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Author {
    pub kind: AuthorKind,
    pub user_id: i64,
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: i64,

    pub text: String,

    /// Mapped from the 'type' column since `type` is a reserved keyword in Rust.
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub question_type: QuestionType,

    pub subject_id: String,

    pub points: i32,

    /// Upper bound for a human grade. Falls back to `points`.
    pub max_points: Option<i32>,

    pub grade: i32,

    pub round: i32,

    pub is_auto_scored: bool,

    pub status: QuestionStatus,

    pub author_kind: AuthorKind,

    pub author_id: i64,

    /// Variant payload, stored as JSONB.
    pub body: Json<QuestionBody>,

    pub review_comment: Option<String>,

    pub created_at: Option<chrono::DateTime<chrono::Utc>>,

    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Question {
    pub fn grading_ceiling(&self) -> i32 {
        self.max_points.unwrap_or(self.points)
    }

    /// Student-facing view without any answer keys.
    pub fn to_public(&self) -> PublicQuestion {
        PublicQuestion {
            id: self.id,
            text: self.text.clone(),
            question_type: self.question_type,
            subject_id: self.subject_id.clone(),
            points: self.points,
            grade: self.grade,
            round: self.round,
            body: self.body.0.to_public(),
        }
    }
}

/// Type-specific payload. Each variant carries only its own fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum QuestionBody {
    ClosedEnded {
        options: ChoiceOptions,
        correct_answer: Option<String>,
    },
    Matching {
        left: Vec<MatchItem>,
        right: Vec<MatchItem>,
        /// Generated when the question is validated; never author-supplied.
        correct_answer: MatchingKey,
    },
    TextAnalysis {
        sub_questions: Vec<SubQuestion>,
    },
    MapAnalysis {
        sub_questions: Vec<SubQuestion>,
    },
    OpenEnded {
        answer_template: Option<String>,
    },
}

impl QuestionBody {
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionBody::ClosedEnded { .. } => QuestionType::ClosedEnded,
            QuestionBody::Matching { .. } => QuestionType::Matching,
            QuestionBody::TextAnalysis { .. } => QuestionType::TextAnalysis,
            QuestionBody::MapAnalysis { .. } => QuestionType::MapAnalysis,
            QuestionBody::OpenEnded { .. } => QuestionType::OpenEnded,
        }
    }

    pub fn sub_questions(&self) -> Option<&[SubQuestion]> {
        match self {
            QuestionBody::TextAnalysis { sub_questions }
            | QuestionBody::MapAnalysis { sub_questions } => Some(sub_questions),
            _ => None,
        }
    }

    pub fn to_public(&self) -> PublicBody {
        match self {
            QuestionBody::ClosedEnded { options, .. } => PublicBody::ClosedEnded {
                options: options.clone(),
            },
            QuestionBody::Matching { left, right, .. } => {
                let left = left
                    .iter()
                    .enumerate()
                    .map(|(i, item)| LabelledItem {
                        label: item_label(i),
                        text: item.text.clone(),
                        image: item.image.clone(),
                    })
                    .collect();
                // Authored order would reveal the pairing, so the column is
                // shown sorted and each item keeps the ordinal answers refer to.
                let mut right: Vec<NumberedItem> = right
                    .iter()
                    .enumerate()
                    .map(|(i, item)| NumberedItem {
                        ordinal: i as u32 + 1,
                        text: item.text.clone(),
                        image: item.image.clone(),
                    })
                    .collect();
                right.sort_by(|a, b| a.key().cmp(&b.key()));
                PublicBody::Matching { left, right }
            }
            QuestionBody::TextAnalysis { sub_questions } => PublicBody::TextAnalysis {
                sub_questions: sub_questions.iter().map(SubQuestion::to_public).collect(),
            },
            QuestionBody::MapAnalysis { sub_questions } => PublicBody::MapAnalysis {
                sub_questions: sub_questions.iter().map(SubQuestion::to_public).collect(),
            },
            QuestionBody::OpenEnded { .. } => PublicBody::OpenEnded,
        }
    }
}

/// CLOSED_ENDED options: either plain text or image references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "lowercase")]
pub enum ChoiceOptions {
    Text(Vec<String>),
    Images(Vec<String>),
}

impl ChoiceOptions {
    pub fn values(&self) -> &[String] {
        match self {
            ChoiceOptions::Text(values) | ChoiceOptions::Images(values) => values,
        }
    }
}

/// One side entry of a MATCHING question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl MatchItem {
    /// Trimmed text, or the trimmed image reference when there is no text.
    pub fn key(&self) -> Option<&str> {
        non_blank(self.text.as_deref()).or_else(|| non_blank(self.image.as_deref()))
    }
}

/// Canonical MATCHING answer: left label ("A", "B", ...) to 1-based right ordinal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchingKey(pub BTreeMap<String, u32>);

impl MatchingKey {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<u32> {
        self.0.get(label).copied()
    }
}

impl fmt::Display for MatchingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(label, ordinal)| format!("{label}-{ordinal}"))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

/// Spreadsheet-style label for a 0-based left item index: A..Z, AA, AB, ...
pub fn item_label(index: usize) -> String {
    let mut n = index + 1;
    let mut label = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        label.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    label.reverse();
    String::from_utf8(label).unwrap_or_default()
}

/// A simplified question inside TEXT_ANALYSIS / MAP_ANALYSIS.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubQuestion {
    pub text: String,
    pub points: i32,
    pub is_auto_scored: bool,
    #[serde(flatten)]
    pub kind: SubQuestionKind,
}

impl SubQuestion {
    fn to_public(&self) -> PublicSubQuestion {
        let (question_type, options) = match &self.kind {
            SubQuestionKind::ClosedEnded { options, .. } => {
                (QuestionType::ClosedEnded, Some(options.clone()))
            }
            SubQuestionKind::OpenEnded => (QuestionType::OpenEnded, None),
        };
        PublicSubQuestion {
            text: self.text.clone(),
            question_type,
            points: self.points,
            options,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum SubQuestionKind {
    ClosedEnded {
        options: Vec<String>,
        correct_answer: Option<String>,
    },
    OpenEnded,
}

/// A question that passed validation and is ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestion {
    pub text: String,
    pub subject_id: String,
    pub points: i32,
    pub max_points: Option<i32>,
    pub grade: i32,
    pub round: i32,
    pub is_auto_scored: bool,
    pub body: QuestionBody,
}

impl NewQuestion {
    pub fn question_type(&self) -> QuestionType {
        self.body.question_type()
    }
}

/// Raw authoring payload as it arrives over HTTP.
/// Everything is optional so the validator can report every missing field at once.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateQuestionRequest {
    pub text: Option<String>,
    #[serde(rename = "type")]
    pub question_type: Option<String>,
    /// Numbers or numeric strings are accepted for the bounded fields.
    pub points: Option<Value>,
    pub max_points: Option<Value>,
    pub subject_id: Option<Value>,
    pub grade: Option<Value>,
    pub round: Option<Value>,
    pub is_auto_scored: Option<bool>,
    pub correct_answer: Option<String>,
    pub options: Option<Vec<String>>,
    pub option_images: Option<Vec<String>>,
    pub pairs: Option<Vec<RawPair>>,
    pub left_side: Option<Vec<MatchItem>>,
    pub right_side: Option<Vec<MatchItem>>,
    pub sub_questions: Option<Vec<RawSubQuestion>>,
    pub answer_template: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPair {
    pub left: Option<String>,
    pub right: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSubQuestion {
    pub text: Option<String>,
    #[serde(rename = "type")]
    pub question_type: Option<String>,
    pub points: Option<Value>,
    pub is_auto_scored: Option<bool>,
    pub options: Option<Vec<String>>,
    pub correct_answer: Option<String>,
}

/// DTO for sending a question to students (no answer keys).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: i64,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub subject_id: String,
    pub points: i32,
    pub grade: i32,
    pub round: i32,
    pub body: PublicBody,
}

#[derive(Debug, Serialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum PublicBody {
    ClosedEnded {
        options: ChoiceOptions,
    },
    Matching {
        left: Vec<LabelledItem>,
        right: Vec<NumberedItem>,
    },
    TextAnalysis {
        sub_questions: Vec<PublicSubQuestion>,
    },
    MapAnalysis {
        sub_questions: Vec<PublicSubQuestion>,
    },
    OpenEnded,
}

#[derive(Debug, Serialize)]
pub struct LabelledItem {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A right-column MATCHING item as students see it. `ordinal` is the value a
/// matching answer uses to name this item.
#[derive(Debug, Serialize)]
pub struct NumberedItem {
    pub ordinal: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl NumberedItem {
    pub fn key(&self) -> Option<&str> {
        non_blank(self.text.as_deref()).or_else(|| non_blank(self.image.as_deref()))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSubQuestion {
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub points: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

/// Query filters for the staff question list.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionListParams {
    pub status: Option<QuestionStatus>,
    #[serde(rename = "type")]
    pub question_type: Option<QuestionType>,
    pub subject_id: Option<String>,
    pub grade: Option<i32>,
    pub round: Option<i32>,
}

/// DTO for an administrator's approve/reject decision.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQuestionRequest {
    pub status: QuestionStatus,
    pub comment: Option<String>,
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_roll_over_like_spreadsheet_columns() {
        assert_eq!(item_label(0), "A");
        assert_eq!(item_label(25), "Z");
        assert_eq!(item_label(26), "AA");
        assert_eq!(item_label(27), "AB");
    }

    #[test]
    fn review_transitions() {
        use QuestionStatus::*;
        assert_eq!(Pending.review(Active), Ok(Active));
        assert_eq!(Pending.review(Rejected), Ok(Rejected));
        assert_eq!(Rejected.review(Active), Ok(Active));
        assert_eq!(Active.review(Pending), Err(LifecycleError::BackToPending));
        assert_eq!(Active.review(Active), Err(LifecycleError::Unchanged("ACTIVE")));
    }

    #[test]
    fn initial_status_depends_on_author() {
        assert_eq!(QuestionStatus::initial_for(AuthorKind::Admin), QuestionStatus::Active);
        assert_eq!(QuestionStatus::initial_for(AuthorKind::Teacher), QuestionStatus::Pending);
    }

    #[test]
    fn body_is_tagged_by_type() {
        let body = QuestionBody::ClosedEnded {
            options: ChoiceOptions::Text(vec!["Paris".into(), "Lyon".into()]),
            correct_answer: Some("Paris".into()),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["type"], "CLOSED_ENDED");
        assert_eq!(json["correctAnswer"], "Paris");
        assert_eq!(json["options"]["kind"], "text");

        let back: QuestionBody = serde_json::from_value(json).unwrap();
        assert_eq!(back, body);
    }

    #[test]
    fn sub_question_kind_is_flattened() {
        let json = serde_json::json!({
            "text": "Which river?",
            "points": 2,
            "isAutoScored": true,
            "type": "CLOSED_ENDED",
            "options": ["Seine", "Loire"],
            "correctAnswer": "Seine"
        });
        let sub: SubQuestion = serde_json::from_value(json).unwrap();
        assert!(matches!(sub.kind, SubQuestionKind::ClosedEnded { .. }));
    }

    #[test]
    fn public_matching_view_hides_pairing() {
        let body = QuestionBody::Matching {
            left: vec![
                MatchItem { text: Some("France".into()), image: None },
                MatchItem { text: Some("Spain".into()), image: None },
            ],
            right: vec![
                MatchItem { text: Some("Paris".into()), image: None },
                MatchItem { text: Some("Madrid".into()), image: None },
            ],
            correct_answer: MatchingKey::default(),
        };
        let PublicBody::Matching { left, right } = body.to_public() else {
            panic!("expected matching view");
        };
        assert_eq!(left[1].label, "B");
        assert_eq!(right[0].text.as_deref(), Some("Madrid"));
        assert_eq!(right[0].ordinal, 2);
        assert_eq!(right[1].ordinal, 1);

        let json = serde_json::to_value(body.to_public()).unwrap();
        assert_eq!(json["right"][0], serde_json::json!({ "ordinal": 2, "text": "Madrid" }));
    }

    #[test]
    fn matching_key_display() {
        let key = MatchingKey(BTreeMap::from([("A".to_string(), 2), ("B".to_string(), 1)]));
        assert_eq!(key.to_string(), "A-2, B-1");
    }
}
