// src/models/student_answer.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use utoipa::ToSchema;
use validator::Validate;

use crate::assessment::{Score, grading::AnswerGrade};

/// Represents the 'student_answers' table in the database.
/// One row per (student, question).
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAnswer {
    pub id: i64,
    pub student_id: i64,
    pub question_id: i64,

    /// Raw submission as sent by the client.
    pub answer: serde_json::Value,

    /// `None` until a score is known.
    pub is_correct: Option<bool>,

    /// `None` until a score is known; multi-part answers hold the running sum.
    pub points: Option<i32>,

    /// Per sub-question points for multi-part questions.
    pub part_points: Option<Json<Vec<Option<i32>>>>,

    pub needs_review: bool,

    pub graded_by: Option<i64>,

    pub answered_at: chrono::DateTime<chrono::Utc>,

    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl StudentAnswer {
    pub fn grade(&self) -> AnswerGrade {
        AnswerGrade {
            is_correct: self.is_correct,
            points: self.points,
            part_points: self.part_points.as_ref().map(|p| p.0.clone()),
            needs_review: self.needs_review,
        }
    }
}

/// A scored submission ready to persist.
#[derive(Debug, Clone)]
pub struct NewStudentAnswer {
    pub student_id: i64,
    pub question_id: i64,
    pub answer: serde_json::Value,
    pub grade: AnswerGrade,
}

/// DTO for submitting answers.
#[derive(Debug, Deserialize)]
pub struct SubmitAnswersRequest {
    /// Key: Question ID
    /// Value: the raw answer (string, matching map, or list of sub-answers)
    pub answers: HashMap<i64, serde_json::Value>,
}

/// Per-question outcome of a submission batch.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub question_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionSummary {
    pub results: Vec<SubmissionResult>,
    /// Points already known (auto-scored answers and auto-scored parts).
    pub total_points: i32,
    pub pending_review: usize,
}

/// DTO for a teacher/admin grade.
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GradeAnswerRequest {
    #[validate(range(min = 0, max = 10, message = "Points must be between 0 and 10."))]
    pub points: i32,
    /// 1-based sub-question index for TEXT_ANALYSIS / MAP_ANALYSIS answers.
    #[validate(range(min = 1, message = "Sub-question index starts at 1."))]
    pub sub_question: Option<usize>,
    pub is_correct: Option<bool>,
}
