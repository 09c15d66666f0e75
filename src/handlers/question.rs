// src/handlers/question.rs

use axum::{
    Json,
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json as SqlJson};

use crate::{
    assessment::{registry, validate},
    error::{AppError, is_foreign_key_violation},
    models::{
        question::{
            Author, AuthorKind, CreateQuestionRequest, Question, QuestionListParams,
            QuestionStatus,
        },
        user::Role,
    },
    store::{QUESTION_COLUMNS, QuestionStore},
    utils::jwt::Claims,
};

/// Describes every question type: required fields, auto-scoring support.
/// Public endpoint, used by authoring forms.
#[utoipa::path(
    get,
    path = "/api/question-types",
    responses((status = 200, description = "Registered question types"))
)]
pub async fn list_question_types() -> impl IntoResponse {
    Json(registry::describe_all())
}

/// Lists questions with optional filters.
/// Staff only.
pub async fn list_questions(
    State(pool): State<PgPool>,
    Query(params): Query<QuestionListParams>,
) -> Result<impl IntoResponse, AppError> {
    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new(format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE TRUE"));

    if let Some(status) = params.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(question_type) = params.question_type {
        builder.push(" AND type = ").push_bind(question_type);
    }
    if let Some(subject_id) = params.subject_id {
        builder.push(" AND subject_id = ").push_bind(subject_id);
    }
    if let Some(grade) = params.grade {
        builder.push(" AND grade = ").push_bind(grade);
    }
    if let Some(round) = params.round {
        builder.push(" AND round = ").push_bind(round);
    }
    builder.push(" ORDER BY id DESC");

    let questions = builder
        .build_query_as::<Question>()
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list questions: {:?}", e);
            AppError::InternalServerError(e.to_string())
        })?;

    Ok(Json(questions))
}

/// Fetches a single question.
///
/// Staff receive the full record including answer keys; students only see
/// the public view of ACTIVE questions.
pub async fn get_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let question = pool
        .load_question(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;

    if claims.role()?.is_staff() {
        return Ok(Json(serde_json::to_value(&question)?));
    }

    if question.status != QuestionStatus::Active {
        return Err(AppError::NotFound("Question not found".to_string()));
    }
    Ok(Json(serde_json::to_value(question.to_public())?))
}

/// Creates a question.
///
/// The payload runs through the full validator; every violation is reported.
/// Admin questions go live at once, teacher questions wait for review.
pub async fn create_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let author = author_of(&pool, &claims).await?;
    let new_question = validate(&payload)?;

    let question = pool.save_question(author, &new_question).await.map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    tracing::info!(
        question_id = question.id,
        question_type = question.question_type.as_str(),
        status = question.status.as_str(),
        author_id = author.user_id,
        "Question created"
    );

    Ok((StatusCode::CREATED, Json(question)))
}

/// Replaces a question with a newly validated version.
///
/// Teachers may only edit their own questions, and an edit sends the question
/// back to PENDING. Questions that already have answers are frozen.
pub async fn update_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let author = author_of(&pool, &claims).await?;
    let existing = load_owned(&pool, id, author).await?;

    if has_answers(&pool, id).await? {
        return Err(AppError::Conflict(
            "Question already has answers and cannot be changed".to_string(),
        ));
    }

    let new_question = validate(&payload)?;
    let status = match author.kind {
        AuthorKind::Admin => existing.status,
        AuthorKind::Teacher => QuestionStatus::Pending,
    };

    let mut tx = pool.begin().await.map_err(|e| {
        tracing::error!("Failed to begin transaction: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    // The row lock holds back new answers, whose foreign key check needs a
    // share lock on the question, until the edit is committed.
    sqlx::query("SELECT id FROM questions WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;

    let sql = format!(
        r#"
        UPDATE questions
        SET text = $2, type = $3, subject_id = $4, points = $5, max_points = $6,
            grade = $7, round = $8, is_auto_scored = $9, body = $10, status = $11,
            review_comment = NULL, updated_at = NOW()
        WHERE id = $1
          AND NOT EXISTS (SELECT 1 FROM student_answers WHERE question_id = $1)
        RETURNING {QUESTION_COLUMNS}
        "#
    );

    let question = sqlx::query_as::<_, Question>(&sql)
        .bind(id)
        .bind(&new_question.text)
        .bind(new_question.question_type())
        .bind(&new_question.subject_id)
        .bind(new_question.points)
        .bind(new_question.max_points)
        .bind(new_question.grade)
        .bind(new_question.round)
        .bind(new_question.is_auto_scored)
        .bind(SqlJson(&new_question.body))
        .bind(status)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update question {}: {:?}", id, e);
            AppError::InternalServerError(e.to_string())
        })?
        .ok_or_else(|| {
            AppError::Conflict("Question already has answers and cannot be changed".to_string())
        })?;

    tx.commit().await?;

    tracing::info!(question_id = id, status = status.as_str(), "Question updated");
    Ok(Json(question))
}

/// Deletes a question. Refused while answers reference it.
pub async fn delete_question(
    State(pool): State<PgPool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let author = author_of(&pool, &claims).await?;
    load_owned(&pool, id, author).await?;

    if has_answers(&pool, id).await? {
        return Err(AppError::Conflict(
            "Question has answers and cannot be deleted".to_string(),
        ));
    }

    let result = sqlx::query("DELETE FROM questions WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                AppError::Conflict("Question is still referenced".to_string())
            } else {
                tracing::error!("Failed to delete question {}: {:?}", id, e);
                AppError::InternalServerError(e.to_string())
            }
        })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    tracing::info!(question_id = id, "Question deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Resolves the caller as a question author. Teachers need a verified account.
async fn author_of(pool: &PgPool, claims: &Claims) -> Result<Author, AppError> {
    let user_id = claims.user_id()?;
    let role = claims.role()?;
    let kind = role
        .author_kind()
        .ok_or_else(|| AppError::Forbidden("Only staff can author questions".to_string()))?;

    if role == Role::Teacher {
        let verified: Option<bool> =
            sqlx::query_scalar("SELECT is_verified FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(pool)
                .await?;
        if verified != Some(true) {
            return Err(AppError::Forbidden(
                "Teacher account is not verified yet".to_string(),
            ));
        }
    }

    Ok(Author { kind, user_id })
}

async fn load_owned(pool: &PgPool, id: i64, author: Author) -> Result<Question, AppError> {
    let question = pool
        .load_question(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;

    if author.kind == AuthorKind::Teacher && question.author_id != author.user_id {
        return Err(AppError::Forbidden(
            "Teachers can only change their own questions".to_string(),
        ));
    }
    Ok(question)
}

async fn has_answers(pool: &PgPool, question_id: i64) -> Result<bool, AppError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM student_answers WHERE question_id = $1)",
    )
    .bind(question_id)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}
