// src/handlers/answer.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::PgPool;
use validator::Validate;

use crate::{
    assessment::grading::{GradeMode, ManualGrade},
    error::AppError,
    models::{
        student_answer::{GradeAnswerRequest, StudentAnswer, SubmitAnswersRequest},
        user::Role,
    },
    store::ANSWER_COLUMNS,
    submission,
    utils::jwt::Claims,
};

/// Submits a batch of answers.
///
/// Every answer is scored immediately when its question allows it; the rest
/// are queued for a teacher. Results are reported per question.
pub async fn submit_answers(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitAnswersRequest>,
) -> Result<impl IntoResponse, AppError> {
    if claims.role()? != Role::Student {
        return Err(AppError::Forbidden("Only students can submit answers".to_string()));
    }
    if payload.answers.is_empty() {
        return Err(AppError::BadRequest("No answers submitted".to_string()));
    }

    let summary = submission::submit_answers(&pool, claims.user_id()?, payload.answers).await?;
    Ok((StatusCode::CREATED, Json(summary)))
}

/// The caller's own answers, newest first.
pub async fn my_answers(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let sql = format!(
        "SELECT {ANSWER_COLUMNS} FROM student_answers WHERE student_id = $1 ORDER BY answered_at DESC"
    );
    let answers = sqlx::query_as::<_, StudentAnswer>(&sql)
        .bind(claims.user_id()?)
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch answers: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(answers))
}

/// Answers waiting for a human grade, oldest first.
/// Staff only.
pub async fn review_queue(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let sql = format!(
        "SELECT {ANSWER_COLUMNS} FROM student_answers WHERE needs_review ORDER BY answered_at ASC LIMIT 200"
    );
    let answers = sqlx::query_as::<_, StudentAnswer>(&sql)
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch review queue: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(answers))
}

/// Grades an answer that is still awaiting review.
#[utoipa::path(
    put,
    path = "/api/answers/{id}/grade",
    params(("id" = i64, Path, description = "Answer ID")),
    request_body = GradeAnswerRequest,
    responses(
        (status = 200, description = "Answer graded"),
        (status = 400, description = "Points out of range or wrong part"),
        (status = 404, description = "Answer not found"),
        (status = 409, description = "Answer already has a final score")
    )
)]
pub async fn grade_answer(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<GradeAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    grade(&pool, &claims, id, payload, GradeMode::Initial).await
}

/// Overwrites the grade of an answer, final or not.
#[utoipa::path(
    put,
    path = "/api/answers/{id}/regrade",
    params(("id" = i64, Path, description = "Answer ID")),
    request_body = GradeAnswerRequest,
    responses(
        (status = 200, description = "Answer re-graded"),
        (status = 400, description = "Points out of range or wrong part"),
        (status = 404, description = "Answer not found")
    )
)]
pub async fn regrade_answer(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<GradeAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    grade(&pool, &claims, id, payload, GradeMode::Regrade).await
}

async fn grade(
    pool: &PgPool,
    claims: &Claims,
    answer_id: i64,
    payload: GradeAnswerRequest,
    mode: GradeMode,
) -> Result<Json<StudentAnswer>, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let manual = ManualGrade {
        points: payload.points,
        part: payload.sub_question,
        is_correct: payload.is_correct,
    };
    let answer = submission::grade_answer(pool, answer_id, claims.user_id()?, manual, mode).await?;
    Ok(Json(answer))
}
