// src/submission.rs

use std::collections::HashMap;

use serde_json::Value;

use crate::{
    assessment::{
        grading::{AnswerGrade, GradeMode, ManualGrade, apply_grade},
        score,
    },
    error::AppError,
    models::{
        question::QuestionStatus,
        student_answer::{NewStudentAnswer, StudentAnswer, SubmissionResult, SubmissionSummary},
    },
    store::QuestionStore,
};

/// Scores and stores a batch of answers for one student.
///
/// Each question is handled on its own: an unknown, inactive or already
/// answered question is reported in its result entry and does not stop the rest.
pub async fn submit_answers<S>(
    store: &S,
    student_id: i64,
    answers: HashMap<i64, Value>,
) -> Result<SubmissionSummary, AppError>
where
    S: QuestionStore + ?Sized,
{
    let mut answers: Vec<(i64, Value)> = answers.into_iter().collect();
    answers.sort_by_key(|(id, _)| *id);

    let mut results = Vec::with_capacity(answers.len());
    let mut total_points = 0;
    let mut pending_review = 0;

    for (question_id, raw) in answers {
        let rejected = |reason: &str| SubmissionResult {
            question_id,
            answer_id: None,
            score: None,
            error: Some(reason.to_string()),
        };

        let Some(question) = store.load_question(question_id).await? else {
            results.push(rejected("question not found"));
            continue;
        };
        if question.status != QuestionStatus::Active {
            results.push(rejected("question is not open for answers"));
            continue;
        }

        let scored = score(&question, &raw);
        let grade = AnswerGrade::from_scored(&scored);
        let new_answer = NewStudentAnswer {
            student_id,
            question_id,
            answer: raw,
            grade,
        };

        let Some(saved) = store.save_answer(&new_answer).await? else {
            results.push(rejected("question already answered"));
            continue;
        };

        total_points += scored.score.points().unwrap_or(0);
        if scored.score.needs_review() {
            pending_review += 1;
        }
        results.push(SubmissionResult {
            question_id,
            answer_id: Some(saved.id),
            score: Some(scored.score),
            error: None,
        });
    }

    tracing::info!(
        student_id,
        answered = results.iter().filter(|r| r.answer_id.is_some()).count(),
        total_points,
        pending_review,
        "Answers submitted"
    );

    Ok(SubmissionSummary {
        results,
        total_points,
        pending_review,
    })
}

/// Grade writes that lose a race with another grader are retried this often.
const GRADE_ATTEMPTS: usize = 3;

/// Applies a teacher's or admin's grade to a stored answer.
///
/// The write only lands on the grade it was computed from. When another
/// grader got there first, the answer is re-read and the grade re-applied,
/// so grades for different parts of one answer never overwrite each other.
pub async fn grade_answer<S>(
    store: &S,
    answer_id: i64,
    grader_id: i64,
    grade: ManualGrade,
    mode: GradeMode,
) -> Result<StudentAnswer, AppError>
where
    S: QuestionStore + ?Sized,
{
    for attempt in 1..=GRADE_ATTEMPTS {
        let answer = store
            .load_answer(answer_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Answer not found".to_string()))?;

        let question = store
            .load_question(answer.question_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;

        let previous = answer.grade();
        let updated = apply_grade((&question).into(), &previous, &grade, mode)?;

        if let Some(saved) = store
            .record_grade(answer_id, &previous, &updated, grader_id)
            .await?
        {
            tracing::info!(answer_id, grader_id, points = ?saved.points, ?mode, "Answer graded");
            return Ok(saved);
        }
        tracing::debug!(answer_id, attempt, "Answer changed while grading");
    }

    tracing::warn!(answer_id, grader_id, "Giving up on a contended grade");
    Err(AppError::Conflict(
        "Answer is being graded by someone else, try again".to_string(),
    ))
}
