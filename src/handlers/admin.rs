// src/handlers/admin.rs

use axum::{
    Json,
    extract::{Extension, Path, State},
    response::IntoResponse,
};
use sqlx::PgPool;

use crate::{
    error::AppError,
    models::{
        question::{Question, ReviewQuestionRequest},
        user::{Role, User, VerifyTeacherRequest},
    },
    store::{QUESTION_COLUMNS, QuestionStore},
    utils::{html::clean_html, jwt::Claims},
};

/// Approves or rejects a question.
/// Admin only.
#[utoipa::path(
    put,
    path = "/api/admin/questions/{id}/review",
    params(("id" = i64, Path, description = "Question ID")),
    request_body = ReviewQuestionRequest,
    responses(
        (status = 200, description = "Status changed"),
        (status = 400, description = "Target status not allowed"),
        (status = 404, description = "Question not found"),
        (status = 409, description = "Question already has that status")
    )
)]
pub async fn review_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<ReviewQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let question = pool
        .load_question(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;

    let status = question.status.review(payload.status)?;
    let comment = payload
        .comment
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(clean_html);

    let sql = format!(
        r#"
        UPDATE questions
        SET status = $2, review_comment = $3, updated_at = NOW()
        WHERE id = $1
        RETURNING {QUESTION_COLUMNS}
        "#
    );
    let updated = sqlx::query_as::<_, Question>(&sql)
        .bind(id)
        .bind(status)
        .bind(comment)
        .fetch_optional(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to review question {}: {:?}", id, e);
            AppError::InternalServerError(e.to_string())
        })?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;

    tracing::info!(
        question_id = id,
        from = question.status.as_str(),
        to = status.as_str(),
        reviewer = %claims.sub,
        "Question reviewed"
    );
    Ok(Json(updated))
}

/// Verifies (or revokes) a teacher account.
/// Admin only.
pub async fn set_teacher_verification(
    State(pool): State<PgPool>,
    Path(id): Path<i64>,
    Json(payload): Json<VerifyTeacherRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET is_verified = $2
        WHERE id = $1 AND role = $3
        RETURNING id, username, password, role, is_verified, created_at
        "#,
    )
    .bind(id)
    .bind(payload.verified)
    .bind(Role::Teacher.as_str())
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to update teacher {}: {:?}", id, e);
        AppError::InternalServerError(e.to_string())
    })?
    .ok_or_else(|| AppError::NotFound("Teacher not found".to_string()))?;

    tracing::info!(teacher_id = id, verified = payload.verified, "Teacher verification changed");
    Ok(Json(user))
}

/// Lists teacher accounts, unverified first.
/// Admin only.
pub async fn list_teachers(State(pool): State<PgPool>) -> Result<impl IntoResponse, AppError> {
    let teachers = sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, password, role, is_verified, created_at
        FROM users
        WHERE role = $1
        ORDER BY is_verified ASC, id DESC
        "#,
    )
    .bind(Role::Teacher.as_str())
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list teachers: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(teachers))
}
